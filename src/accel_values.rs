// Acceleration measurement records
//
// This file may be distributed under the terms of the GNU GPLv3 license.

use serde::{Deserialize, Serialize};

/// Fixed-length record of accelerometer samples: timestamps plus
/// tri-axis acceleration in mm/s^2.  Filled by a sensor driver and
/// consumed by the resonance tuning UI.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AccelValues {
    pub t: Vec<f64>,
    pub ax: Vec<f64>,
    pub ay: Vec<f64>,
    pub az: Vec<f64>,
}

impl AccelValues {
    /// Zero-filled record for `n` samples.
    pub fn new(n: usize) -> AccelValues {
        AccelValues {
            t: vec![0.0; n],
            ax: vec![0.0; n],
            ay: vec![0.0; n],
            az: vec![0.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_zero_filled() {
        let acc = AccelValues::new(16);
        assert_eq!(acc.len(), 16);
        assert!(acc.ax.iter().all(|&v| v == 0.0));
    }
}
