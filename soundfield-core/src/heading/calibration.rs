//! Session-local calibration of sensor headings.
//!
//! The first sample after a (re)start becomes the baseline and is not shown as
//! a heading. Later samples are reported relative to it, wrapped into
//! `[0, 360)`, so whatever direction the device faced when listening began
//! reads as 0°.

use crate::math::wrap_degrees;

/// Heading of `raw` relative to `baseline`, in `[0, 360)`.
pub fn normalize(raw: f32, baseline: f32) -> f32 {
    wrap_degrees(raw - baseline)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationState {
    /// Waiting for the first sample of the session
    Uncalibrated,
    /// Baseline captured
    Calibrated { offset: f32 },
}

/// What the filter did with one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOutput {
    /// Sample captured as the session baseline; no heading emitted
    Baseline(f32),
    /// Calibrated heading in `[0, 360)`
    Heading(f32),
    /// Non-finite sample dropped
    Rejected,
}

impl FilterOutput {
    pub fn heading(self) -> Option<f32> {
        match self {
            Self::Heading(angle) => Some(angle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CalibrationFilter {
    offset: Option<f32>,
}

impl CalibrationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CalibrationState {
        match self.offset {
            Some(offset) => CalibrationState::Calibrated { offset },
            None => CalibrationState::Uncalibrated,
        }
    }

    /// Forgets the baseline; the next sample is captured as the new one.
    pub fn reset(&mut self) {
        self.offset = None;
    }

    pub fn accept(&mut self, raw: f32) -> FilterOutput {
        if !raw.is_finite() {
            log::debug!("Dropping non-finite sensor sample: {}", raw);
            return FilterOutput::Rejected;
        }

        match self.offset {
            None => {
                log::debug!("Heading baseline captured at {:.2}", raw);
                self.offset = Some(raw);
                FilterOutput::Baseline(raw)
            }
            Some(offset) => FilterOutput::Heading(normalize(raw, offset)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_calibration_sequence() {
        let mut filter = CalibrationFilter::new();
        assert_eq!(filter.state(), CalibrationState::Uncalibrated);

        assert_eq!(filter.accept(40.0), FilterOutput::Baseline(40.0));
        assert_eq!(filter.state(), CalibrationState::Calibrated { offset: 40.0 });
        assert_relative_eq!(filter.accept(50.0).heading().unwrap(), 10.0);
        assert_relative_eq!(filter.accept(30.0).heading().unwrap(), 350.0);
    }

    #[test]
    fn test_baseline_reads_zero() {
        for baseline in [0.0, 12.5, 180.0, 359.9] {
            assert_eq!(normalize(baseline, baseline), 0.0);
        }
    }

    #[test]
    fn test_normalize_range() {
        let mut raw = 0.0f32;
        while raw < 360.0 {
            let mut baseline = 0.0f32;
            while baseline < 360.0 {
                let angle = normalize(raw, baseline);
                assert!((0.0..360.0).contains(&angle));
                if raw < baseline {
                    assert_relative_eq!(angle, raw - baseline + 360.0, epsilon = 1e-3);
                }
                baseline += 17.3;
            }
            raw += 11.1;
        }
    }

    #[test]
    fn test_reset_recaptures_baseline() {
        let mut filter = CalibrationFilter::new();
        filter.accept(100.0);
        filter.reset();
        assert_eq!(filter.state(), CalibrationState::Uncalibrated);
        assert_eq!(filter.accept(200.0), FilterOutput::Baseline(200.0));
        assert_relative_eq!(filter.accept(210.0).heading().unwrap(), 10.0);
    }

    #[test]
    fn test_non_finite_samples_are_rejected() {
        let mut filter = CalibrationFilter::new();
        assert_eq!(filter.accept(f32::NAN), FilterOutput::Rejected);
        assert_eq!(filter.state(), CalibrationState::Uncalibrated);
        filter.accept(10.0);
        assert_eq!(filter.accept(f32::INFINITY), FilterOutput::Rejected);
        assert_eq!(filter.state(), CalibrationState::Calibrated { offset: 10.0 });
    }
}
