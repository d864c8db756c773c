//! RBJ-cookbook biquad filter with lazy coefficient recomputation.
//!
//! Topology is Direct Form II Transposed: two state variables (`z1`,
//! `z2`), numerically stable at the cutoffs/Qs this engine uses.
//! Coefficients are cached and only recomputed when a parameter write
//! sets the dirty flag, since the filter envelope writes cutoff every
//! sample while moving and recomputing unconditionally would be wasted
//! work for voices whose filter envelope has settled.

use std::f32::consts::PI;

const MIN_CUTOFF_HZ: f32 = 20.0;
const MIN_Q: f32 = 0.1;
const MAX_Q: f32 = 20.0;
/// Values smaller than this in the feedback path are flushed to zero
/// to avoid the CPU's subnormal path at steady low-level state.
const DENORMAL_FLOOR: f32 = 1.0e-20;

/// Filter response mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
    Allpass,
}

impl FilterMode {
    /// Integer encoding used by the persisted program format
    /// (0..4 for LP/HP/BP/Notch/AP).
    pub fn to_index(self) -> u8 {
        match self {
            Self::Lowpass => 0,
            Self::Highpass => 1,
            Self::Bandpass => 2,
            Self::Notch => 3,
            Self::Allpass => 4,
        }
    }

    /// Inverse of [`Self::to_index`]; out-of-range indices default to
    /// `Lowpass`.
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => Self::Highpass,
            2 => Self::Bandpass,
            3 => Self::Notch,
            4 => Self::Allpass,
            _ => Self::Lowpass,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Coefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

/// A 2nd-order IIR filter, Direct Form II Transposed.
#[derive(Debug, Clone)]
pub struct Biquad {
    sample_rate: f32,
    mode: FilterMode,
    cutoff_hz: f32,
    q: f32,
    coeffs: Coefficients,
    z1: f32,
    z2: f32,
    dirty: bool,
}

impl Biquad {
    pub fn new(sample_rate: f32) -> Self {
        let mut f = Self {
            sample_rate,
            mode: FilterMode::Lowpass,
            cutoff_hz: 1000.0,
            q: std::f32::consts::FRAC_1_SQRT_2,
            coeffs: Coefficients::default(),
            z1: 0.0,
            z2: 0.0,
            dirty: true,
        };
        f.recompute_if_dirty();
        f
    }

    fn nyquist(&self) -> f32 {
        self.sample_rate * 0.5
    }

    /// Set filter mode; marks coefficients dirty.
    pub fn set_mode(&mut self, mode: FilterMode) {
        if mode != self.mode {
            self.mode = mode;
            self.dirty = true;
        }
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Set cutoff in Hz, clamped to `[20 Hz, 0.99*Nyquist]`.
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        let clamped = cutoff_hz.clamp(MIN_CUTOFF_HZ, 0.99 * self.nyquist());
        if clamped != self.cutoff_hz {
            self.cutoff_hz = clamped;
            self.dirty = true;
        }
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff_hz
    }

    /// Set resonance, clamped to `[0.1, 20]`.
    pub fn set_q(&mut self, q: f32) {
        let clamped = q.clamp(MIN_Q, MAX_Q);
        if clamped != self.q {
            self.q = clamped;
            self.dirty = true;
        }
    }

    pub fn q(&self) -> f32 {
        self.q
    }

    /// Zero the delay line; call on note trigger to avoid clicks from
    /// stale state.
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    fn recompute_if_dirty(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;

        let omega = 2.0 * PI * self.cutoff_hz / self.sample_rate;
        let (sin_omega, cos_omega) = omega.sin_cos();
        let alpha = sin_omega / (2.0 * self.q);

        let (b0, b1, b2, a0, a1, a2) = match self.mode {
            FilterMode::Lowpass => {
                let b1 = 1.0 - cos_omega;
                let b0 = b1 / 2.0;
                (b0, b1, b0, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
            }
            FilterMode::Highpass => {
                let b1 = -(1.0 + cos_omega);
                let b0 = -b1 / 2.0;
                (b0, b1, b0, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
            }
            FilterMode::Bandpass => {
                let b0 = alpha;
                (b0, 0.0, -b0, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
            }
            FilterMode::Notch => {
                let b0 = 1.0;
                let b1 = -2.0 * cos_omega;
                (b0, b1, b0, 1.0 + alpha, b1, 1.0 - alpha)
            }
            FilterMode::Allpass => {
                let b0 = 1.0 - alpha;
                let b1 = -2.0 * cos_omega;
                let b2 = 1.0 + alpha;
                (b0, b1, b2, b2, b1, b0)
            }
        };

        self.coeffs = Coefficients {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        };
    }

    /// Filter one sample. Recomputes coefficients first if dirty.
    #[inline]
    pub fn process_sample(&mut self, x: f32) -> f32 {
        self.recompute_if_dirty();

        let c = self.coeffs;
        let y = c.b0 * x + self.z1;
        self.z1 = c.b1 * x - c.a1 * y + self.z2;
        self.z2 = c.b2 * x - c.a2 * y;

        if self.z1.abs() < DENORMAL_FLOOR {
            self.z1 = 0.0;
        }
        if self.z2.abs() < DENORMAL_FLOOR {
            self.z2 = 0.0;
        }

        y
    }
}
