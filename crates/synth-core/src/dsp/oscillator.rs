//! Morphable wavetable oscillator.
//!
//! The table is precomputed once per timbre change so the hot
//! per-sample path is one modulo, one table read, and one lerp, with
//! no transcendentals on the audio thread.

/// Number of entries in the wavetable.
pub const TABLE_SIZE: usize = 256;

/// A single-cycle waveform table, regenerated on timbre change and
/// otherwise read-only during rendering.
#[derive(Debug, Clone)]
pub struct WavetableBuffer {
    table: [f32; TABLE_SIZE],
}

impl WavetableBuffer {
    /// Build a table blending saw/triangle/square by `shape` (clamped
    /// to 0.0..=1.0): saw->triangle for shape<0.5, triangle->square
    /// otherwise.
    pub fn new(shape: f32) -> Self {
        let mut buf = Self { table: [0.0; TABLE_SIZE] };
        buf.regenerate(shape);
        buf
    }

    /// Regenerate the table in place for a new `shape` value.
    pub fn regenerate(&mut self, shape: f32) {
        let shape = shape.clamp(0.0, 1.0);
        for (i, slot) in self.table.iter_mut().enumerate() {
            let t = i as f32 / TABLE_SIZE as f32;
            let saw = 2.0 * t - 1.0;
            let triangle = if t < 0.5 { 4.0 * t - 1.0 } else { 3.0 - 4.0 * t };
            let square = if t < 0.5 { 1.0 } else { -1.0 };

            *slot = if shape < 0.5 {
                let alpha = 2.0 * shape;
                saw + (triangle - saw) * alpha
            } else {
                let alpha = 2.0 * (shape - 0.5);
                triangle + (square - triangle) * alpha
            };
        }
    }

    /// Linearly interpolated read at phase `phi` (expected in 0.0..1.0;
    /// values outside are wrapped as if fractional).
    #[inline]
    fn sample_at(&self, phi: f32) -> f32 {
        let scaled = phi * TABLE_SIZE as f32;
        let idx = scaled as usize % TABLE_SIZE;
        let next = (idx + 1) % TABLE_SIZE;
        let frac = scaled - scaled.floor();
        self.table[idx] + (self.table[next] - self.table[idx]) * frac
    }
}

/// Phase-accumulator oscillator reading through a [`WavetableBuffer`].
#[derive(Debug, Clone, Copy)]
pub struct Oscillator {
    phase: f32,
    sample_rate: f32,
}

impl Oscillator {
    pub fn new(sample_rate: f32) -> Self {
        Self { phase: 0.0, sample_rate }
    }

    /// Reset phase to 0; call on note trigger.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Produce one sample at `freq_hz`, advancing and wrapping phase.
    #[inline]
    pub fn next_sample(&mut self, table: &WavetableBuffer, freq_hz: f32) -> f32 {
        let out = table.sample_at(self.phase);
        self.phase += freq_hz / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_zero_is_pure_sawtooth() {
        let table = WavetableBuffer::new(0.0);
        assert!((table.sample_at(0.0) - (-1.0)).abs() < 1e-6);
        assert!((table.sample_at(0.5) - 0.0).abs() < 0.05);
    }

    #[test]
    fn shape_is_clamped() {
        let a = WavetableBuffer::new(-1.0);
        let b = WavetableBuffer::new(0.0);
        assert!((a.sample_at(0.1) - b.sample_at(0.1)).abs() < 1e-6);

        let c = WavetableBuffer::new(5.0);
        let d = WavetableBuffer::new(1.0);
        assert!((c.sample_at(0.1) - d.sample_at(0.1)).abs() < 1e-6);
    }

    #[test]
    fn phase_wraps_modulo_one() {
        let table = WavetableBuffer::new(0.0);
        let mut osc = Oscillator::new(4.0); // 4 samples/sec
        // freq == sample_rate -> phase advances by 1.0 every sample, wraps every time
        let mut phases = Vec::new();
        for _ in 0..8 {
            phases.push(osc.next_sample(&table, 4.0));
        }
        assert!(phases.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn reset_sets_phase_to_zero() {
        let table = WavetableBuffer::new(0.3);
        let mut osc = Oscillator::new(44_100.0);
        for _ in 0..100 {
            osc.next_sample(&table, 440.0);
        }
        osc.reset();
        assert_eq!(osc.phase, 0.0);
    }
}
