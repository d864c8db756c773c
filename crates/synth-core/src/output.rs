//! Mix and output stage (C7): sum active voices, shape, post-filter,
//! and write interleaved stereo.

use crate::allocator::VoiceAllocator;
use crate::dsp::{Biquad, WavetableBuffer};

const POST_FILTER_CUTOFF_HZ: f32 = 10_000.0;
const POST_FILTER_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;
const WAVESHAPER_SOFTNESS: f32 = 3.0;

/// Memoryless nonlinearity applied to the mono mix before the
/// post-filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveshaper {
    #[default]
    TanhSoftClip,
    HardWaveFolder,
    SoftWaveFolder,
}

/// Folds `x` into a triangle wave over `±1`.
#[inline]
fn fold(x: f32) -> f32 {
    let mut u = (x / 2.0 + 0.5).rem_euclid(1.0);
    if u > 0.5 {
        u = 1.0 - u;
    }
    2.0 * u - 1.0
}

/// Sums active voices, applies a waveshaper and a post low-pass,
/// and writes interleaved stereo output.
#[derive(Clone)]
pub struct OutputStage {
    waveshaper: Waveshaper,
    drive: f32,
    post_filter: Biquad,
}

impl OutputStage {
    pub fn new(sample_rate: f32) -> Self {
        let mut post_filter = Biquad::new(sample_rate);
        post_filter.set_cutoff(POST_FILTER_CUTOFF_HZ);
        post_filter.set_q(POST_FILTER_Q);
        Self { waveshaper: Waveshaper::default(), drive: 0.5, post_filter }
    }

    /// Switching waveshaper resets the post-filter delay lines, so a
    /// transient from incompatible stored state never leaks through.
    pub fn set_waveshaper(&mut self, waveshaper: Waveshaper) {
        if waveshaper != self.waveshaper {
            self.waveshaper = waveshaper;
            self.post_filter.reset();
        }
    }

    pub fn waveshaper(&self) -> Waveshaper {
        self.waveshaper
    }

    /// Set drive, clamped to `0.0..=1.0`; maps exponentially to gain
    /// in `[0.1, 10]` (`0.5` is unity gain).
    pub fn set_drive(&mut self, drive01: f32) {
        self.drive = drive01.clamp(0.0, 1.0);
    }

    pub fn drive(&self) -> f32 {
        self.drive
    }

    fn gain(&self) -> f32 {
        0.1 * 100f32.powf(self.drive)
    }

    #[inline]
    fn shape_sample(&self, x: f32) -> f32 {
        let driven = x * self.gain();
        match self.waveshaper {
            Waveshaper::TanhSoftClip => driven.tanh(),
            Waveshaper::HardWaveFolder => fold(driven),
            Waveshaper::SoftWaveFolder => {
                let folded = fold(driven);
                (WAVESHAPER_SOFTNESS * folded).tanh() / WAVESHAPER_SOFTNESS.tanh()
            }
        }
    }

    /// Render one block: sum every voice's contribution into
    /// `mono_scratch`, shape and post-filter it in place, then
    /// duplicate into `stereo_out` (must be exactly twice as long).
    pub fn render_block(
        &mut self,
        allocator: &mut VoiceAllocator,
        table: &WavetableBuffer,
        mono_scratch: &mut [f32],
        stereo_out: &mut [f32],
    ) {
        assert_eq!(stereo_out.len(), mono_scratch.len() * 2);

        for s in mono_scratch.iter_mut() {
            *s = 0.0;
        }
        allocator.for_each(|voice| {
            for s in mono_scratch.iter_mut() {
                *s += voice.next_sample(table);
            }
        });

        for s in mono_scratch.iter_mut() {
            let shaped = self.shape_sample(*s);
            *s = self.post_filter.process_sample(shaped);
        }

        for (i, &s) in mono_scratch.iter().enumerate() {
            stereo_out[2 * i] = s;
            stereo_out[2 * i + 1] = s;
        }
    }
}
