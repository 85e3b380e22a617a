//! Bounded sample windows
//!
//! A window is the detector's working memory: a FIFO of scalar magnitudes
//! that evicts its oldest entry once full, so it never holds more than its
//! capacity.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Fixed-capacity FIFO of scalar sensor magnitudes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl SampleWindow {
    /// Create an empty window. A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value, evicting the oldest entry when at capacity
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Values in arrival order, oldest first
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_push_below_capacity() {
        let mut window = SampleWindow::new(4);
        window.push(1.0);
        window.push(2.0);

        assert_eq!(window.len(), 2);
        assert!(!window.is_full());
        assert_eq!(window.to_vec(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut window = SampleWindow::new(3);
        for v in 1..=5 {
            window.push(v as f64);
        }

        assert_eq!(window.len(), 3);
        assert!(window.is_full());
        assert_eq!(window.to_vec(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_zero_capacity_holds_latest() {
        let mut window = SampleWindow::new(0);
        window.push(1.0);
        window.push(2.0);

        assert_eq!(window.capacity(), 1);
        assert_eq!(window.to_vec(), vec![2.0]);
    }

    #[test]
    fn test_clear() {
        let mut window = SampleWindow::new(3);
        window.push(1.0);
        window.clear();
        assert!(window.is_empty());
    }
}
