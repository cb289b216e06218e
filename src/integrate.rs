// Smoothing weight functions and their definitive integrals
//
// This file may be distributed under the terms of the GNU GPLv3 license.

use crate::scurve::SCurve;
use crate::KinError;

/// Closed catalog of smoother kernels.  Each kernel is an even polynomial
/// of bounded support [-hst, hst] whose Fourier transform has a deep null
/// at the target frequency, so convolving the toolhead trajectory with it
/// suppresses a resonance at that frequency.  `Damped2` additionally
/// carries an odd term scaled by the damping ratio and is the one family
/// that integrates full s-curve polynomials.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SmootherType {
    /// Shortest 2nd-order kernel zeroing vibrations at the target
    /// frequency without exciting higher frequencies.
    Shortest2,
    /// 2nd-order kernel zeroing vibrations at the target frequency.
    AllPass2,
    /// Damping-aware 2nd-order kernel.
    Damped2,
    /// SI-type kernel, 5% vibration tolerance, full period duration.
    Sifp05,
    /// 4th-order positive kernel suppressing all vibrations above the
    /// target frequency by at least 95%.
    Siaf05,
    /// Acceleration displacement-free kernel, 5% tolerance, suppressing
    /// vibrations near the target frequency.
    Dfsf05,
    /// Acceleration displacement-free kernel suppressing all vibrations
    /// above the target frequency by at least 95%.
    Dfaf05,
    /// Acceleration displacement-free kernel, 2% tolerance.
    Dfaf02,
    /// Acceleration displacement-free kernel, 1% tolerance.
    Dfaf01,
}

impl SmootherType {
    /// Look up a kernel by its configuration name.  Unknown names yield
    /// `None`; callers treat that as "smoothing disabled".
    pub fn from_name(name: &str) -> Option<SmootherType> {
        match name {
            "2ord_shortest" => Some(SmootherType::Shortest2),
            "2ord_allp" => Some(SmootherType::AllPass2),
            "2ord_damped" => Some(SmootherType::Damped2),
            "sifp_05" => Some(SmootherType::Sifp05),
            "siaf_05" => Some(SmootherType::Siaf05),
            "dfsf_05" => Some(SmootherType::Dfsf05),
            "dfaf_05" => Some(SmootherType::Dfaf05),
            "dfaf_02" => Some(SmootherType::Dfaf02),
            "dfaf_01" => Some(SmootherType::Dfaf01),
            _ => None,
        }
    }

    /// Like [`SmootherType::from_name`], but surfaces the unknown name
    /// as an error for configuration handling.
    pub fn resolve(name: &str) -> Result<SmootherType, KinError> {
        SmootherType::from_name(name).ok_or_else(|| KinError::UnknownSmoother(name.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            SmootherType::Shortest2 => "2ord_shortest",
            SmootherType::AllPass2 => "2ord_allp",
            SmootherType::Damped2 => "2ord_damped",
            SmootherType::Sifp05 => "sifp_05",
            SmootherType::Siaf05 => "siaf_05",
            SmootherType::Dfsf05 => "dfsf_05",
            SmootherType::Dfaf05 => "dfaf_05",
            SmootherType::Dfaf02 => "dfaf_02",
            SmootherType::Dfaf01 => "dfaf_01",
        }
    }
}

/// A constructed smoothing kernel
/// `w(t) = c0 + c1*t + c2*t^2 + c4*t^4 + c6*t^6` on [-hst, hst],
/// normalized so that the convolution of a constant yields that constant.
/// Frozen after construction.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Smoother {
    pub typ: SmootherType,
    pub hst: f64,
    pub hst2: f64,
    pub c0: f64,
    pub c1: f64,
    pub c2: f64,
    pub c4: f64,
    pub c6: f64,
}

impl Smoother {
    /// Build the kernel for `typ` tuned to `target_freq` (Hz).  Only
    /// `Damped2` uses `damping_ratio`; the other families accept and
    /// ignore it.  `target_freq` must be positive.
    pub fn new(typ: SmootherType, target_freq: f64, damping_ratio: f64) -> Smoother {
        let mut sm = Smoother {
            typ,
            hst: 0.,
            hst2: 0.,
            c0: 0.,
            c1: 0.,
            c2: 0.,
            c4: 0.,
            c6: 0.,
        };
        match typ {
            SmootherType::Shortest2 => {
                let hst = 0.29630246 / target_freq;
                sm.set_hst(hst);
                let mut v = 1. / hst;
                let inv_hst2 = v * v;
                // The constant term is negative: the normalization
                // c0*hst + c2*hst^3/3 == 1/2 holds exactly with c0 < 0.
                sm.c0 = -0.2183076974181258 * v;
                v *= inv_hst2;
                sm.c2 = 2.154923092254376 * v;
            }
            SmootherType::AllPass2 => {
                let hst = 0.331293106 / target_freq;
                sm.set_hst(hst);
                let v = 1. / hst;
                let inv_hst2 = v * v;
                sm.c0 = 0.;
                sm.c2 = 1.5 * v * inv_hst2;
            }
            SmootherType::Damped2 => {
                let dr2 = damping_ratio * damping_ratio;
                let hst = 0.5 * (0.662586 - 0.0945695 * dr2) / target_freq;
                sm.set_hst(hst);
                let v = 1. / hst;
                let inv_hst2 = v * v;
                sm.c0 = 0.;
                sm.c1 = (1.681147871689192 - 1.318310718147036 * dr2) * damping_ratio * inv_hst2;
                sm.c2 = 1.5 * v * inv_hst2;
            }
            SmootherType::Sifp05 => {
                let hst = 0.5 / target_freq;
                sm.set_hst(hst);
                let mut v = 1. / hst;
                let inv_hst2 = v * v;
                sm.c0 = 1.226407107944368 * v;
                v *= inv_hst2;
                sm.c2 = -9.681726703406114 * v;
                v *= inv_hst2;
                sm.c4 = 12.50417563262201 * v;
            }
            SmootherType::Siaf05 => {
                let hst = 0.682156695 / target_freq;
                sm.set_hst(hst);
                let mut v = 1. / hst;
                let inv_hst2 = v * v;
                sm.c0 = 0.7264076297522936 * v;
                v *= inv_hst2;
                sm.c2 = -1.00906293169719 * v;
                v *= inv_hst2;
                sm.c4 = 0.5497334040671973 * v;
            }
            SmootherType::Dfsf05 => {
                let hst = 0.879442505 / target_freq;
                sm.set_hst(hst);
                let mut v = 1. / hst;
                let inv_hst2 = v * v;
                sm.c0 = 1.693005551405153 * v;
                v *= inv_hst2;
                sm.c2 = -18.8720117988809 * v;
                v *= inv_hst2;
                sm.c4 = 59.4391940955727 * v;
                v *= inv_hst2;
                sm.c6 = -47.53121639625473 * v;
            }
            SmootherType::Dfaf05 => {
                let hst = 1.089438525 / target_freq;
                sm.set_hst(hst);
                let mut v = 1. / hst;
                let inv_hst2 = v * v;
                sm.c0 = 1.42427487336909 * v;
                v *= inv_hst2;
                sm.c2 = -5.783771970272312 * v;
                v *= inv_hst2;
                sm.c4 = 7.766315293352271 * v;
                v *= inv_hst2;
                sm.c6 = -3.847297593641651 * v;
            }
            SmootherType::Dfaf02 => {
                let hst = 1.282011392 / target_freq;
                sm.set_hst(hst);
                let mut v = 1. / hst;
                let inv_hst2 = v * v;
                sm.c0 = 1.57525352661564 * v;
                v *= inv_hst2;
                sm.c2 = -7.728603566914598 * v;
                v *= inv_hst2;
                sm.c4 = 11.55794321405673 * v;
                v *= inv_hst2;
                sm.c6 = -5.674486863182988 * v;
            }
            SmootherType::Dfaf01 => {
                let hst = 1.727828982 / target_freq;
                sm.set_hst(hst);
                let mut v = 1. / hst;
                let inv_hst2 = v * v;
                sm.c0 = 1.561217589994576 * v;
                v *= inv_hst2;
                sm.c2 = -7.310414825115637 * v;
                v *= inv_hst2;
                sm.c4 = 10.09765353406272 * v;
                v *= inv_hst2;
                sm.c6 = -4.507603485713351 * v;
            }
        }
        sm
    }

    fn set_hst(&mut self, hst: f64) {
        self.hst = hst;
        self.hst2 = hst * hst;
    }

    /// Integrate `(pos + start_v*t + half_accel*t^2) * w(t + toff)` over
    /// `[start, end]` in move-local time.  The time offset is folded into
    /// the quadratic so all weight evaluations happen in window-local
    /// coordinates, where the Horner antiderivatives are well
    /// conditioned.
    pub fn integrate_weighted(
        &self,
        mut pos: f64,
        mut start_v: f64,
        half_accel: f64,
        mut start: f64,
        mut end: f64,
        toff: f64,
    ) -> f64 {
        if self.typ == SmootherType::Damped2 {
            let s = SCurve {
                c1: start_v,
                c2: half_accel,
                ..SCurve::default()
            };
            return self.integrate_weighted_scurve(pos, &s, start, end, toff);
        }
        // Substitute tnew = t + toff to simplify the integrals
        pos += (half_accel * toff - start_v) * toff;
        start_v -= 2. * half_accel * toff;
        start += toff;
        end += toff;
        match self.typ {
            SmootherType::Shortest2 | SmootherType::AllPass2 => {
                self.integrate_2nd_order(start, end, pos, start_v, half_accel)
            }
            SmootherType::Sifp05 | SmootherType::Siaf05 => {
                self.integrate_4th_order(start, end, pos, start_v, half_accel)
            }
            _ => self.integrate_6th_order(start, end, pos, start_v, half_accel),
        }
    }

    /// Integrate `(pos + s(t)) * w(t + toff)` over `[start, end]` for an
    /// arbitrary s-curve polynomial (only meaningful for the `Damped2`
    /// family; even families read the quadratic part of the s-curve).
    ///
    /// Two algebraically equivalent expansions are used.  When the window
    /// lies within or near the move (toff^2 <= hst^2) the weight is
    /// expanded around the move and integrated against t^n*s(t)
    /// antiderivatives; otherwise the s-curve is re-expanded around the
    /// window center.  Each expansion is numerically unstable on the
    /// other side of the split.
    pub fn integrate_weighted_scurve(
        &self,
        mut pos: f64,
        s: &SCurve,
        start: f64,
        end: f64,
        toff: f64,
    ) -> f64 {
        if self.typ != SmootherType::Damped2 {
            return self.integrate_weighted(pos, s.c1, s.c2, start, end, toff);
        }
        if toff * toff <= self.hst2 {
            let mut res = self.c2 * (s.tn_antiderivative(2, end) - s.tn_antiderivative(2, start));
            res += (2. * self.c2 * toff + self.c1)
                * (s.tn_antiderivative(1, end) - s.tn_antiderivative(1, start));
            res += (self.c0 + (self.c2 * toff + self.c1) * toff)
                * (s.tn_antiderivative(0, end) - s.tn_antiderivative(0, start));
            res + pos * (self.iwtn(0, end + toff) - self.iwtn(0, start + toff))
        } else {
            let mut s = *s;
            pos += s.eval(-toff);
            s.offset(-toff);
            let (ws, we) = (start + toff, end + toff);
            let mut res = pos * (self.iwtn(0, we) - self.iwtn(0, ws));
            res += s.c1 * (self.iwtn(1, we) - self.iwtn(1, ws));
            res += s.c2 * (self.iwtn(2, we) - self.iwtn(2, ws));
            res += s.c3 * (self.iwtn(3, we) - self.iwtn(3, ws));
            res += s.c4 * (self.iwtn(4, we) - self.iwtn(4, ws));
            res += s.c5 * (self.iwtn(5, we) - self.iwtn(5, ws));
            res += s.c6 * (self.iwtn(6, we) - self.iwtn(6, ws));
            res
        }
    }

    // Antiderivative of t^n * w(t) for the 2nd-order weight shape.
    fn iwtn(&self, n: u32, t: f64) -> f64 {
        let nf = n as f64;
        let mut v = self.c2 / (nf + 3.) * t + self.c1 / (nf + 2.);
        v = v * t + self.c0 / (nf + 1.);
        v * t * t.powi(n as i32)
    }

    // Integrate t^0 * w, with 2nd order w
    fn i2wt0(&self, t: f64) -> f64 {
        let t2 = t * t;
        let v = (1. / 3.) * self.c2;
        (self.c0 + v * t2) * t
    }

    // Integrate t^1 * w, with 2nd order w
    fn i2wt1(&self, t: f64) -> f64 {
        let t2 = t * t;
        let v = (1. / 4.) * self.c2;
        ((1. / 2.) * self.c0 + v * t2) * t2
    }

    // Integrate t^2 * w, with 2nd order w
    fn i2wt2(&self, t: f64) -> f64 {
        let t2 = t * t;
        let v = (1. / 5.) * self.c2;
        ((1. / 3.) * self.c0 + v * t2) * t2 * t
    }

    fn integrate_2nd_order(&self, start: f64, end: f64, a0: f64, a1: f64, a2: f64) -> f64 {
        let mut res = a2 * (self.i2wt2(end) - self.i2wt2(start));
        res += a1 * (self.i2wt1(end) - self.i2wt1(start));
        res + a0 * (self.i2wt0(end) - self.i2wt0(start))
    }

    // Integrate t^0 * w, with 4th order w
    fn i4wt0(&self, t: f64) -> f64 {
        let t2 = t * t;
        let mut v = (1. / 5.) * self.c4;
        v = (1. / 3.) * self.c2 + v * t2;
        (self.c0 + v * t2) * t
    }

    // Integrate t^1 * w, with 4th order w
    fn i4wt1(&self, t: f64) -> f64 {
        let t2 = t * t;
        let mut v = (1. / 6.) * self.c4;
        v = (1. / 4.) * self.c2 + v * t2;
        ((1. / 2.) * self.c0 + v * t2) * t2
    }

    // Integrate t^2 * w, with 4th order w
    fn i4wt2(&self, t: f64) -> f64 {
        let t2 = t * t;
        let mut v = (1. / 7.) * self.c4;
        v = (1. / 5.) * self.c2 + v * t2;
        ((1. / 3.) * self.c0 + v * t2) * t2 * t
    }

    fn integrate_4th_order(&self, start: f64, end: f64, a0: f64, a1: f64, a2: f64) -> f64 {
        let mut res = a2 * (self.i4wt2(end) - self.i4wt2(start));
        res += a1 * (self.i4wt1(end) - self.i4wt1(start));
        res + a0 * (self.i4wt0(end) - self.i4wt0(start))
    }

    // Integrate t^0 * w, with 6th order w
    fn i6wt0(&self, t: f64) -> f64 {
        let t2 = t * t;
        let mut v = (1. / 7.) * self.c6;
        v = (1. / 5.) * self.c4 + v * t2;
        v = (1. / 3.) * self.c2 + v * t2;
        (self.c0 + v * t2) * t
    }

    // Integrate t^1 * w, with 6th order w
    fn i6wt1(&self, t: f64) -> f64 {
        let t2 = t * t;
        let mut v = (1. / 8.) * self.c6;
        v = (1. / 6.) * self.c4 + v * t2;
        v = (1. / 4.) * self.c2 + v * t2;
        ((1. / 2.) * self.c0 + v * t2) * t2
    }

    // Integrate t^2 * w, with 6th order w
    fn i6wt2(&self, t: f64) -> f64 {
        let t2 = t * t;
        let mut v = (1. / 9.) * self.c6;
        v = (1. / 7.) * self.c4 + v * t2;
        v = (1. / 5.) * self.c2 + v * t2;
        ((1. / 3.) * self.c0 + v * t2) * t2 * t
    }

    fn integrate_6th_order(&self, start: f64, end: f64, a0: f64, a1: f64, a2: f64) -> f64 {
        let mut res = a2 * (self.i6wt2(end) - self.i6wt2(start));
        res += a1 * (self.i6wt1(end) - self.i6wt1(start));
        res + a0 * (self.i6wt0(end) - self.i6wt0(start))
    }
}

pub const ALL_SMOOTHERS: [SmootherType; 9] = [
    SmootherType::Shortest2,
    SmootherType::AllPass2,
    SmootherType::Damped2,
    SmootherType::Sifp05,
    SmootherType::Siaf05,
    SmootherType::Dfsf05,
    SmootherType::Dfaf05,
    SmootherType::Dfaf02,
    SmootherType::Dfaf01,
];
