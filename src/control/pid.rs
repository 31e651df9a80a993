//! Discrete PID controller
//!
//! The error is `setpoint - input`. The derivative acts on the measurement
//! rather than the error, and the integral is clamped to the output limits.
//! The caller supplies the time step.

use crate::config::PidConfig;
use crate::{Result, SurfError};

/// Smallest time step used when the caller passes zero or less
const MIN_DT: f64 = 1e-16;

/// Proportional, integral and derivative gains
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// PID controller state and tuning
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    setpoint: f64,
    output_limits: (f64, f64),

    proportional: f64,
    integral: f64,
    derivative: f64,
    last_input: Option<f64>,
    last_error: Option<f64>,
    last_output: Option<f64>,
}

impl PidController {
    /// Fails unless `output_limits` is an ordered pair of non-NaN bounds
    pub fn new(gains: PidGains, setpoint: f64, output_limits: (f64, f64)) -> Result<Self> {
        let (min, max) = output_limits;
        if !(min < max) {
            return Err(SurfError::Config(format!(
                "pid output limits must satisfy min < max, got [{}, {}]",
                min, max
            )));
        }
        Ok(Self::with_checked_limits(gains, setpoint, output_limits))
    }

    fn with_checked_limits(gains: PidGains, setpoint: f64, output_limits: (f64, f64)) -> Self {
        Self {
            gains,
            setpoint,
            output_limits,
            proportional: 0.0,
            integral: 0.0,
            derivative: 0.0,
            last_input: None,
            last_error: None,
            last_output: None,
        }
    }

    pub fn from_config(config: &PidConfig) -> Result<Self> {
        Self::new(
            PidGains {
                kp: config.kp,
                ki: config.ki,
                kd: config.kd,
            },
            config.setpoint,
            (config.output_min, config.output_max),
        )
    }

    fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.output_limits.0, self.output_limits.1)
    }

    /// Advance one step with measurement `input` after `dt` seconds
    pub fn update(&mut self, input: f64, dt: f64) -> f64 {
        let dt = if dt > 0.0 { dt } else { MIN_DT };

        let error = self.setpoint - input;
        let d_input = input - self.last_input.unwrap_or(input);

        self.proportional = self.gains.kp * error;
        self.integral = self.clamp(self.integral + self.gains.ki * error * dt);
        self.derivative = -self.gains.kd * d_input / dt;

        let output = self.clamp(self.proportional + self.integral + self.derivative);

        self.last_input = Some(input);
        self.last_error = Some(error);
        self.last_output = Some(output);
        output
    }

    /// Forget all error history; tuning is kept
    pub fn reset(&mut self) {
        self.proportional = 0.0;
        self.integral = 0.0;
        self.derivative = 0.0;
        self.last_input = None;
        self.last_error = None;
        self.last_output = None;
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn output_limits(&self) -> (f64, f64) {
        self.output_limits
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn last_error(&self) -> Option<f64> {
        self.last_error
    }

    pub fn last_output(&self) -> Option<f64> {
        self.last_output
    }

    /// Current (P, I, D) terms
    pub fn components(&self) -> (f64, f64, f64) {
        (self.proportional, self.integral, self.derivative)
    }
}

impl Default for PidController {
    fn default() -> Self {
        let config = PidConfig::default();
        Self::with_checked_limits(
            PidGains {
                kp: config.kp,
                ki: config.ki,
                kd: config.kd,
            },
            config.setpoint,
            (config.output_min, config.output_max),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> PidController {
        PidController::new(
            PidGains {
                kp: 0.5,
                ki: 0.1,
                kd: 0.2,
            },
            0.0,
            (-100.0, 100.0),
        )
        .unwrap()
    }

    #[test]
    fn test_first_step_has_no_derivative() {
        let mut pid = controller();
        let out = pid.update(10.0, 1.0);
        // P = -5, I = -1, D = 0
        assert!((out - -6.0).abs() < 1e-12);
        assert_eq!(pid.components().2, 0.0);
    }

    #[test]
    fn test_derivative_on_measurement() {
        let mut pid = controller();
        pid.update(10.0, 1.0);
        let out = pid.update(14.0, 2.0);
        // P = -7, I = -1 + -2.8, D = -0.2 * 4 / 2
        assert!((out - (-7.0 - 3.8 - 0.4)).abs() < 1e-12);
    }

    #[test]
    fn test_output_is_clamped() {
        let mut pid = controller();
        assert_eq!(pid.update(1000.0, 1.0), -100.0);
        assert_eq!(pid.update(-1000.0, 1.0), 100.0);
    }

    #[test]
    fn test_integral_is_clamped() {
        let mut pid = controller();
        for _ in 0..100 {
            pid.update(500.0, 1.0);
        }
        assert_eq!(pid.integral(), -100.0);
    }

    #[test]
    fn test_reset_matches_fresh_controller() {
        let mut used = controller();
        for input in [300.0, -40.0, 12.5, 999.0] {
            used.update(input, 0.05);
        }
        used.reset();

        for input in [-300.0, 0.0, 1.0, 250.0] {
            let mut a = used.clone();
            let mut b = controller();
            assert_eq!(a.update(input, 0.05), b.update(input, 0.05));
        }
    }

    #[test]
    fn test_reset_keeps_tuning() {
        let mut pid = PidController::default();
        pid.update(300.0, 0.1);
        pid.reset();
        assert_eq!(pid.gains(), PidGains { kp: 0.001, ki: 0.001, kd: 0.05 });
        assert_eq!(pid.setpoint(), 1.0);
        assert_eq!(pid.output_limits(), (-100.0, 100.0));
        assert_eq!(pid.last_output(), None);
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn test_rejects_unordered_limits() {
        let gains = PidGains {
            kp: 1.0,
            ki: 0.0,
            kd: 0.0,
        };
        assert!(PidController::new(gains, 0.0, (10.0, -10.0)).is_err());
        assert!(PidController::new(gains, 0.0, (5.0, 5.0)).is_err());
        assert!(PidController::new(gains, 0.0, (f64::NAN, 1.0)).is_err());
        assert!(PidController::new(gains, 0.0, (-1.0, f64::NAN)).is_err());
        assert!(PidController::new(gains, 0.0, (f64::NEG_INFINITY, f64::INFINITY)).is_ok());

        let config = PidConfig {
            output_min: 1.0,
            output_max: 0.0,
            ..PidConfig::default()
        };
        assert!(PidController::from_config(&config).unwrap_err().is_config_error());
    }

    #[test]
    fn test_short_steps_still_update() {
        let mut pid = controller();
        let first = pid.update(10.0, 1e-3);
        let second = pid.update(20.0, 1e-3);
        // P = -10, I = -0.001 - 0.002, D = -0.2 * 10 / 0.001 = -2000 -> clamped
        assert!((first - -5.001).abs() < 1e-9);
        assert_eq!(second, -100.0);
        assert_eq!(pid.last_error(), Some(-20.0));
    }

    #[test]
    fn test_non_positive_dt() {
        let mut pid = controller();
        let out = pid.update(2.0, 0.0);
        assert!(out.is_finite());
        assert!((out - -1.0).abs() < 1e-9);
    }

    #[test]
    fn test_positive_delta_drives_negative_output() {
        let mut pid = PidController::default();
        assert!(pid.update(300.0, 0.1) < 0.0);
        let mut pid = PidController::default();
        assert!(pid.update(-300.0, 0.1) > 0.0);
    }
}
