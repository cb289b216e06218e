// S-curve polynomial evaluation and integration helpers
//
// This file may be distributed under the terms of the GNU GPLv3 license.

/// Scalar move progress as a polynomial of move-local time:
/// `s(t) = c1*t + c2*t^2 + ... + c6*t^6`, valid for `t` in `[0, move_t]`.
///
/// There is intentionally no constant term; a move's absolute position is
/// `start_pos + axes_r * s(t)`.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct SCurve {
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
    pub c4: f64,
    pub c5: f64,
    pub c6: f64,
}

impl SCurve {
    /// Segment of a trapezoidal velocity group.  `offset_t` is how far
    /// into the accelerating group this segment starts, so the returned
    /// polynomial is expressed in segment-local time.
    pub fn trapezoid(start_v: f64, accel: f64, offset_t: f64) -> SCurve {
        SCurve {
            c1: start_v + accel * offset_t,
            c2: 0.5 * accel,
            ..SCurve::default()
        }
    }

    /// Progress at local time t.
    pub fn eval(&self, t: f64) -> f64 {
        let mut v = self.c6 * t + self.c5;
        v = v * t + self.c4;
        v = v * t + self.c3;
        v = v * t + self.c2;
        v = v * t + self.c1;
        v * t
    }

    /// First derivative (instantaneous velocity) at local time t.
    pub fn velocity(&self, t: f64) -> f64 {
        let mut v = 6. * self.c6 * t + 5. * self.c5;
        v = v * t + 4. * self.c4;
        v = v * t + 3. * self.c3;
        v = v * t + 2. * self.c2;
        v * t + self.c1
    }

    /// s(end) - s(start)
    pub fn diff(&self, start: f64, end: f64) -> f64 {
        self.eval(end) - self.eval(start)
    }

    /// Shift the time origin: replace s(t) with s(t + offset).  The
    /// constant term s(offset) is dropped; callers fold it into the
    /// position themselves.
    pub fn offset(&mut self, offset: f64) {
        let SCurve { c1, c2, c3, c4, c5, c6 } = *self;
        let d = offset;
        self.c1 = c1 + d * (2. * c2 + d * (3. * c3 + d * (4. * c4 + d * (5. * c5 + d * 6. * c6))));
        self.c2 = c2 + d * (3. * c3 + d * (6. * c4 + d * (10. * c5 + d * 15. * c6)));
        self.c3 = c3 + d * (4. * c4 + d * (10. * c5 + d * 20. * c6));
        self.c4 = c4 + d * (5. * c5 + d * 15. * c6);
        self.c5 = c5 + d * 6. * c6;
    }

    /// Scaled copy with every coefficient multiplied by r (axis
    /// projection through the move's direction ratio).
    pub fn copy_scaled(&self, r: f64) -> SCurve {
        SCurve {
            c1: r * self.c1,
            c2: r * self.c2,
            c3: r * self.c3,
            c4: r * self.c4,
            c5: r * self.c5,
            c6: r * self.c6,
        }
    }

    /// Antiderivative of t^n * s(t), evaluated at t.  Supports any n >= 0.
    pub fn tn_antiderivative(&self, n: u32, t: f64) -> f64 {
        let nf = n as f64;
        let mut v = self.c6 / (nf + 7.) * t + self.c5 / (nf + 6.);
        v = v * t + self.c4 / (nf + 5.);
        v = v * t + self.c3 / (nf + 4.);
        v = v * t + self.c2 / (nf + 3.);
        v = v * t + self.c1 / (nf + 2.);
        v * t * t * t.powi(n as i32)
    }

    /// Definitive integral of s over [start, end].
    pub fn integrate(&self, start: f64, end: f64) -> f64 {
        self.tn_antiderivative(0, end) - self.tn_antiderivative(0, start)
    }

    /// Definitive integral of t * s(t) over [start, end].
    pub fn integrate_t(&self, start: f64, end: f64) -> f64 {
        self.tn_antiderivative(1, end) - self.tn_antiderivative(1, start)
    }

    /// Definitive integral of t * s'(t) over [start, end].
    pub fn deriv_t_integrate(&self, start: f64, end: f64) -> f64 {
        let term = |t: f64| {
            let mut v = 6. / 7. * self.c6 * t + 5. / 6. * self.c5;
            v = v * t + 4. / 5. * self.c4;
            v = v * t + 3. / 4. * self.c3;
            v = v * t + 2. / 3. * self.c2;
            v = v * t + 0.5 * self.c1;
            v * t * t
        };
        term(end) - term(start)
    }

    pub fn is_null(&self) -> bool {
        self.c1 == 0.
            && self.c2 == 0.
            && self.c3 == 0.
            && self.c4 == 0.
            && self.c5 == 0.
            && self.c6 == 0.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn sample() -> SCurve {
        SCurve {
            c1: 2.0,
            c2: -1.5,
            c3: 0.25,
            c4: -0.125,
            c5: 0.0625,
            c6: -0.03125,
        }
    }

    fn eval_direct(s: &SCurve, t: f64) -> f64 {
        s.c1 * t
            + s.c2 * t.powi(2)
            + s.c3 * t.powi(3)
            + s.c4 * t.powi(4)
            + s.c5 * t.powi(5)
            + s.c6 * t.powi(6)
    }

    #[test]
    fn eval_matches_direct_expansion() {
        let s = sample();
        for &t in &[0.0, 0.1, 0.5, 1.0, 2.0] {
            assert_approx_eq!(f64, s.eval(t), eval_direct(&s, t), epsilon = 1e-12);
        }
    }

    #[test]
    fn velocity_matches_finite_difference() {
        let s = sample();
        let dt = 1e-6;
        for &t in &[0.1, 0.5, 1.3] {
            let fd = (s.eval(t + dt) - s.eval(t - dt)) / (2. * dt);
            assert!((s.velocity(t) - fd).abs() < 1e-6);
        }
    }

    #[test]
    fn offset_shifts_origin() {
        let s = sample();
        let d = 0.37;
        let mut shifted = s;
        shifted.offset(d);
        // s(t + d) = s(d) + shifted(t)
        for &t in &[0.0, 0.2, 0.9] {
            assert_approx_eq!(
                f64,
                s.eval(t + d),
                s.eval(d) + shifted.eval(t),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn integrate_matches_simpson() {
        let s = sample();
        let (a, b) = (0.1, 0.8);
        let n = 10_000;
        let h = (b - a) / n as f64;
        let mut acc = s.eval(a) + s.eval(b);
        for i in 1..n {
            let t = a + i as f64 * h;
            acc += if i % 2 == 1 { 4. } else { 2. } * s.eval(t);
        }
        let simpson = acc * h / 3.;
        assert_approx_eq!(f64, s.integrate(a, b), simpson, epsilon = 1e-10);
    }

    #[test]
    fn integrate_t_matches_simpson() {
        let s = sample();
        let (a, b) = (0.0, 1.2);
        let n = 10_000;
        let h = (b - a) / n as f64;
        let f = |t: f64| t * s.eval(t);
        let mut acc = f(a) + f(b);
        for i in 1..n {
            let t = a + i as f64 * h;
            acc += if i % 2 == 1 { 4. } else { 2. } * f(t);
        }
        let simpson = acc * h / 3.;
        assert_approx_eq!(f64, s.integrate_t(a, b), simpson, epsilon = 1e-10);
    }

    #[test]
    fn deriv_t_integrate_by_parts() {
        // int t*s'(t) = [t*s(t)] - int s(t)
        let s = sample();
        let (a, b) = (0.2, 1.1);
        let expected = b * s.eval(b) - a * s.eval(a) - s.integrate(a, b);
        assert_approx_eq!(f64, s.deriv_t_integrate(a, b), expected, epsilon = 1e-12);
    }

    #[test]
    fn trapezoid_segment_matches_kinematics() {
        // Segment starting 0.5s into a group accelerating from 10mm/s at
        // 100mm/s^2: local velocity starts at 60mm/s.
        let s = SCurve::trapezoid(10.0, 100.0, 0.5);
        assert_approx_eq!(f64, s.velocity(0.0), 60.0);
        assert_approx_eq!(f64, s.eval(0.1), 60.0 * 0.1 + 0.5 * 100.0 * 0.01);
    }

    #[test]
    fn scaled_copy() {
        let s = sample().copy_scaled(-2.0);
        assert_approx_eq!(f64, s.eval(0.7), -2.0 * sample().eval(0.7), epsilon = 1e-12);
    }
}
