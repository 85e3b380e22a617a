//! FFI bindings for the context engine
//!
//! C-compatible functions for driving a detector from a mobile host. Strings
//! returned by these functions are allocated here and must be freed by the
//! caller with `ctx_free_string`.

use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::ptr;

use crate::detector::ContextDetector;
use crate::providers::{SharedViewport, StaticPermissions};
use crate::types::{Axes, LocationFix, Permission, SensorKind};

/// `kind` value for accelerometer samples
pub const CTX_SENSOR_ACCELEROMETER: c_int = 0;
/// `kind` value for gyroscope samples
pub const CTX_SENSOR_GYROSCOPE: c_int = 1;
/// `kind` value for magnetometer samples
pub const CTX_SENSOR_MAGNETOMETER: c_int = 2;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn sensor_kind(kind: c_int) -> Option<SensorKind> {
    match kind {
        CTX_SENSOR_ACCELEROMETER => Some(SensorKind::Accelerometer),
        CTX_SENSOR_GYROSCOPE => Some(SensorKind::Gyroscope),
        CTX_SENSOR_MAGNETOMETER => Some(SensorKind::Magnetometer),
        _ => None,
    }
}

/// Opaque handle to a detector and the viewport it reads orientation from
pub struct ContextDetectorHandle {
    detector: ContextDetector,
    viewport: SharedViewport,
}

/// Create a detector with default thresholds and the given viewport size.
///
/// # Safety
/// - Returns a pointer to a newly allocated detector.
/// - Must be freed with `ctx_detector_free`.
#[no_mangle]
pub unsafe extern "C" fn ctx_detector_new(
    viewport_width: f64,
    viewport_height: f64,
) -> *mut ContextDetectorHandle {
    clear_last_error();

    let viewport = SharedViewport::new(viewport_width, viewport_height);
    let detector = ContextDetector::with_defaults().with_orientation(viewport.clone());
    Box::into_raw(Box::new(ContextDetectorHandle { detector, viewport }))
}

/// Free a detector.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `ctx_detector_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn ctx_detector_free(handle: *mut ContextDetectorHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Start a session with the permission results the host obtained.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `ctx_detector_new`.
/// - Returns 0 on success, -1 on error; call `ctx_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn ctx_detector_initialize(
    handle: *mut ContextDetectorHandle,
    location_granted: bool,
    motion_granted: bool,
) -> c_int {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null detector pointer");
        return -1;
    }
    let handle = &mut *handle;

    let mut denied = Vec::new();
    if !location_granted {
        denied.push(Permission::Location);
    }
    if !motion_granted {
        denied.push(Permission::Motion);
    }

    match handle
        .detector
        .initialize(&mut StaticPermissions::denying(denied))
    {
        Ok(_) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Ingest one motion sample (`kind` is one of the `CTX_SENSOR_*` constants).
///
/// # Safety
/// - `handle` must be a valid pointer returned by `ctx_detector_new`.
/// - Returns 0 on success, -1 on error; call `ctx_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn ctx_detector_ingest_motion(
    handle: *mut ContextDetectorHandle,
    kind: c_int,
    x: f64,
    y: f64,
    z: f64,
) -> c_int {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null detector pointer");
        return -1;
    }
    let handle = &mut *handle;

    let Some(kind) = sensor_kind(kind) else {
        set_last_error("Unknown sensor kind");
        return -1;
    };

    match handle.detector.ingest_motion_sample(Axes::new(x, y, z), kind) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Store a location fix. A negative `speed` means the provider reported none.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `ctx_detector_new`.
/// - Returns 1 if the fix was stored, 0 if dropped, -1 on error (including
///   out-of-range coordinates or a non-finite accuracy or speed).
#[no_mangle]
pub unsafe extern "C" fn ctx_detector_ingest_location(
    handle: *mut ContextDetectorHandle,
    latitude: f64,
    longitude: f64,
    accuracy: f64,
    speed: f64,
) -> c_int {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null detector pointer");
        return -1;
    }
    let handle = &mut *handle;

    let mut fix = LocationFix::new(latitude, longitude, accuracy);
    if speed >= 0.0 || speed.is_nan() {
        fix = fix.with_speed(speed);
    }

    match handle.detector.ingest_location_fix(fix) {
        Ok(stored) => c_int::from(stored),
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Update the viewport used to derive orientation.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `ctx_detector_new`.
#[no_mangle]
pub unsafe extern "C" fn ctx_detector_set_viewport(
    handle: *mut ContextDetectorHandle,
    width: f64,
    height: f64,
) {
    if !handle.is_null() {
        (*handle).viewport.set(width, height);
    }
}

/// Current context snapshot as JSON.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `ctx_detector_new`.
/// - Returns a newly allocated string that must be freed with `ctx_free_string`.
/// - Returns NULL on error; call `ctx_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn ctx_detector_snapshot_json(
    handle: *const ContextDetectorHandle,
) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null detector pointer");
        return ptr::null_mut();
    }
    let handle = &*handle;

    match serde_json::to_string(&handle.detector.get_current_context()) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Stop the session. The last snapshot stays readable.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `ctx_detector_new`.
#[no_mangle]
pub unsafe extern "C" fn ctx_detector_stop(handle: *mut ContextDetectorHandle) {
    if !handle.is_null() {
        (*handle).detector.stop_monitoring();
    }
}

/// Whether a session is active.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `ctx_detector_new` or NULL.
#[no_mangle]
pub unsafe extern "C" fn ctx_detector_is_active(handle: *const ContextDetectorHandle) -> bool {
    !handle.is_null() && (*handle).detector.is_active()
}

/// Free a string returned by this library.
///
/// # Safety
/// - `s` must be a pointer returned by a `ctx_*` function, or NULL.
#[no_mangle]
pub unsafe extern "C" fn ctx_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Get the last error message for the calling thread.
///
/// # Safety
/// - Returns a pointer valid until the next `ctx_*` call on this thread.
/// - Do NOT free this pointer.
/// - Returns NULL if there was no error.
#[no_mangle]
pub unsafe extern "C" fn ctx_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    unsafe fn snapshot(handle: *const ContextDetectorHandle) -> serde_json::Value {
        let raw = ctx_detector_snapshot_json(handle);
        assert!(!raw.is_null());
        let json = CStr::from_ptr(raw).to_str().unwrap().to_string();
        ctx_free_string(raw);
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_ffi_session() {
        unsafe {
            let handle = ctx_detector_new(390.0, 844.0);
            assert!(!handle.is_null());
            assert_eq!(ctx_detector_initialize(handle, true, true), 0);
            assert!(ctx_detector_is_active(handle));

            let offset = 2.5_f64.sqrt();
            for i in 0..50 {
                let z = if i < 25 { 9.8 + offset } else { 9.8 - offset };
                assert_eq!(
                    ctx_detector_ingest_motion(handle, CTX_SENSOR_ACCELEROMETER, 0.0, 0.0, z),
                    0
                );
            }
            assert_eq!(
                ctx_detector_ingest_location(handle, 34.05, -118.24, 6.0, -1.0),
                1
            );
            ctx_detector_set_viewport(handle, 844.0, 390.0);

            let value = snapshot(handle);
            assert_eq!(value["activity"], "LIFTING");
            assert_eq!(value["orientation"], "LANDSCAPE_LEFT");
            assert_eq!(value["location"]["lat"], 34.05);
            assert!(value["nearestBeacon"].is_null());

            ctx_detector_stop(handle);
            assert!(!ctx_detector_is_active(handle));
            ctx_detector_free(handle);
        }
    }

    #[test]
    fn test_ffi_permission_denied() {
        unsafe {
            let handle = ctx_detector_new(390.0, 844.0);
            assert_eq!(ctx_detector_initialize(handle, false, true), -1);

            let err = CStr::from_ptr(ctx_last_error()).to_str().unwrap();
            assert!(err.contains("location"));
            assert!(!ctx_detector_is_active(handle));
            ctx_detector_free(handle);
        }
    }

    #[test]
    fn test_ffi_rejects_bad_input() {
        unsafe {
            let handle = ctx_detector_new(390.0, 844.0);
            ctx_detector_initialize(handle, true, true);

            assert_eq!(ctx_detector_ingest_motion(handle, 9, 0.0, 0.0, 9.8), -1);
            assert_eq!(
                ctx_detector_ingest_motion(handle, CTX_SENSOR_GYROSCOPE, f64::NAN, 0.0, 0.0),
                -1
            );
            assert!(!ctx_last_error().is_null());

            assert_eq!(
                ctx_detector_ingest_motion(ptr::null_mut(), CTX_SENSOR_GYROSCOPE, 0.0, 0.0, 0.0),
                -1
            );
            assert!(ctx_detector_snapshot_json(ptr::null()).is_null());

            assert_eq!(
                ctx_detector_ingest_location(handle, f64::NAN, -118.24, 6.0, -1.0),
                -1
            );
            assert_eq!(
                ctx_detector_ingest_location(handle, 34.05, -118.24, 6.0, f64::NAN),
                -1
            );
            let err = CStr::from_ptr(ctx_last_error()).to_str().unwrap();
            assert!(err.contains("Speed"));
            assert!(snapshot(handle)["location"].is_null());
            ctx_detector_free(handle);
        }
    }
}
