//! Linear gain ramp for click-free muting.
//!
//! # Example
//!
//! ```
//! use microloop_core::SmoothedValue;
//!
//! // 3 ms ramp at 44.1 kHz
//! let mut gain = SmoothedValue::new(1.0, 132);
//! gain.set_target(0.0);
//!
//! let mut left = [1000i16; 128];
//! let mut right = [1000i16; 128];
//! gain.apply_gain_i16(&mut left, &mut right);
//! assert!(gain.is_smoothing());
//! assert!(left[127] < left[0]);
//! ```

/// Gain that moves linearly toward its target over a fixed number of samples.
///
/// Retargeting mid-ramp restarts the ramp from the current value, so a
/// choke released half way fades back up from where it was. The value is
/// always kept inside `[0, 1]`.
#[derive(Debug, Clone)]
pub struct SmoothedValue {
    current: f32,
    target: f32,
    step: f32,
    samples_remaining: u32,
    ramp_samples: u32,
}

impl SmoothedValue {
    pub fn new(initial: f32, ramp_samples: u32) -> Self {
        let initial = initial.clamp(0.0, 1.0);
        Self {
            current: initial,
            target: initial,
            step: 0.0,
            samples_remaining: 0,
            ramp_samples: ramp_samples.max(1),
        }
    }

    #[inline]
    pub fn set_target(&mut self, target: f32) {
        let target = target.clamp(0.0, 1.0);
        let delta = target - self.target;
        if delta < f32::EPSILON && delta > -f32::EPSILON {
            return;
        }

        self.target = target;
        self.samples_remaining = self.ramp_samples;
        self.step = (self.target - self.current) / self.ramp_samples as f32;
    }

    /// Call once per sample frame.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if self.samples_remaining > 0 {
            self.current = (self.current + self.step).clamp(0.0, 1.0);
            self.samples_remaining -= 1;

            if self.samples_remaining == 0 {
                self.current = self.target;
            }
        }

        self.current
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn is_smoothing(&self) -> bool {
        self.samples_remaining > 0
    }

    /// Scale a stereo pair of 16-bit blocks, one gain step per frame,
    /// saturating to the 16-bit range.
    #[inline]
    pub fn apply_gain_i16(&mut self, left: &mut [i16], right: &mut [i16]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let gain = self.next_sample();
            *l = scale_i16(*l, gain);
            *r = scale_i16(*r, gain);
        }
    }
}

#[inline]
fn scale_i16(sample: i16, gain: f32) -> i16 {
    let scaled = (sample as f32 * gain) as i32;
    scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
