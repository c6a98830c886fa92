// Single-input/single-output PID with output clamping and anti-windup
//
// Stateful across calls: integral and derivative memory survive between
// samples, so the owner must reset() on mode or target changes.

use std::time::Instant;

/// Elapsed time below this short-circuits to proportional-only output, so a
/// burst of samples cannot blow up the derivative term.
const MIN_DT_SECS: f32 = 0.001;

#[derive(Debug)]
pub struct PidController {
    kp: f32,
    ki: f32,
    kd: f32,
    setpoint: f32,
    prev_input: f32,
    integral: f32,
    out_min: f32,
    out_max: f32,
    last_time: Instant,
}

impl PidController {
    pub fn new(kp: f32, ki: f32, kd: f32, out_min: f32, out_max: f32) -> Self {
        Self {
            kp,
            ki,
            kd,
            setpoint: 0.0,
            prev_input: 0.0,
            integral: 0.0,
            out_min,
            out_max,
            last_time: Instant::now(),
        }
    }

    pub fn set_target(&mut self, target: f32) {
        self.setpoint = target;
    }

    pub fn set_tunings(&mut self, kp: f32, ki: f32, kd: f32) {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
    }

    /// Clear integral and derivative memory. A controller right after reset
    /// behaves like a freshly constructed one.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_input = 0.0;
        self.last_time = Instant::now();
    }

    pub fn compute(&mut self, input: f32) -> f32 {
        self.compute_at(input, Instant::now())
    }

    /// Compute the clamped correction for one sample, with an injectable
    /// clock for deterministic tests.
    pub fn compute_at(&mut self, input: f32, now: Instant) -> f32 {
        let dt = now.saturating_duration_since(self.last_time).as_secs_f32();
        let error = self.setpoint - input;

        if dt <= MIN_DT_SECS {
            return (self.kp * error).clamp(self.out_min, self.out_max);
        }
        self.last_time = now;

        let p_out = self.kp * error;

        let mut i_out = 0.0;
        if self.ki != 0.0 {
            self.integral += error * dt;
            // anti-windup: bound the integral by what can still influence the
            // clamped output. With negative gains the bounds swap sides.
            let a = self.out_min / self.ki;
            let b = self.out_max / self.ki;
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            self.integral = self.integral.clamp(lo, hi);
            i_out = self.ki * self.integral;
        }

        // derivative on measurement, immune to setpoint steps
        let derivative = (input - self.prev_input) / dt;
        let d_out = -self.kd * derivative;
        self.prev_input = input;

        (p_out + i_out + d_out).clamp(self.out_min, self.out_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn heading_pid() -> PidController {
        PidController::new(-0.8, -0.015, -0.03, -0.5, 0.5)
    }

    #[test]
    fn near_zero_dt_is_proportional_only() {
        let now = Instant::now();
        let mut pid = heading_pid();
        pid.set_target(10.0);
        // `now` is not after construction, so elapsed time saturates to zero
        let out = pid.compute_at(11.0, now);
        assert!((out - (-0.8_f32 * (10.0 - 11.0)).clamp(-0.5, 0.5)).abs() < 1e-6);
    }

    #[test]
    fn output_is_clamped() {
        let mut pid = heading_pid();
        pid.set_target(0.0);
        let now = Instant::now() + Duration::from_millis(100);
        assert_eq!(pid.compute_at(-100.0, now), -0.5);

        let mut pid = heading_pid();
        pid.set_target(0.0);
        let now = Instant::now() + Duration::from_millis(100);
        assert_eq!(pid.compute_at(100.0, now), 0.5);
    }

    #[test]
    fn integral_is_bounded() {
        let mut pid = heading_pid();
        pid.set_target(0.0);
        let mut now = Instant::now();
        // hammer a constant large error; the integral clamp keeps the output
        // inside the band instead of winding up past it
        for _ in 0..1000 {
            now += Duration::from_millis(50);
            let out = pid.compute_at(50.0, now);
            assert!((-0.5..=0.5).contains(&out));
        }
        // and recovery does not need to unwind an unbounded sum
        now += Duration::from_millis(50);
        let out = pid.compute_at(0.0, now);
        assert!((-0.5..=0.5).contains(&out));
    }

    #[test]
    fn reset_matches_fresh_controller() {
        let mut used = heading_pid();
        used.set_target(30.0);
        let mut now = Instant::now();
        for _ in 0..10 {
            now += Duration::from_millis(100);
            used.compute_at(45.0, now);
        }
        // captured before reset/construction, so elapsed time saturates to
        // zero and both controllers take the fast path
        let now = Instant::now();
        used.reset();

        let mut fresh = heading_pid();
        fresh.set_target(30.0);
        assert_eq!(used.compute_at(45.0, now), fresh.compute_at(45.0, now));
    }

    #[test]
    fn negative_gains_steer_against_the_error() {
        let mut pid = heading_pid();
        pid.set_target(10.0);
        let now = Instant::now() + Duration::from_millis(100);
        // drifted clockwise past the target: correction must be positive
        let out = pid.compute_at(20.0, now);
        assert!(out > 0.0, "got {}", out);
    }
}
