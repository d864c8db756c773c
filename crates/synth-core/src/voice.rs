//! A monophonic playable unit composing oscillator + filter + two
//! envelopes.
//!
//! All per-voice parameters are held as plain (`Copy`) fields, no
//! dispatch per sample inside the voice body, and coefficient
//! recomputation happens inside [`Biquad::process_sample`] only when
//! dirty.

use crate::dsp::{Biquad, Envelope, EnvelopePhase, FilterMode, Oscillator, WavetableBuffer};

/// Default pitch bend range, in semitones, applied until
/// [`Voice::set_pitch_bend_range`] is called.
pub const DEFAULT_PITCH_BEND_RANGE_SEMITONES: f32 = 2.0;

/// Upward-only filter envelope modulation headroom: at full envelope
/// level and full `filter_env_amount`, cutoff reaches 10x its base
/// value.
const FILTER_ENV_MOD_FACTOR: f32 = 9.0;

/// A single synthesizer voice.
#[derive(Clone)]
pub struct Voice {
    oscillator: Oscillator,
    filter: Biquad,
    amp_envelope: Envelope,
    filter_envelope: Envelope,

    base_frequency: f32,
    volume: f32,
    pitch_bend: f32,
    pitch_bend_range_semitones: f32,
    base_cutoff: f32,
    filter_env_amount: f32,
}

impl Voice {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            oscillator: Oscillator::new(sample_rate),
            filter: Biquad::new(sample_rate),
            amp_envelope: Envelope::new(sample_rate),
            filter_envelope: Envelope::new(sample_rate),
            base_frequency: 440.0,
            volume: 0.0,
            pitch_bend: 0.0,
            pitch_bend_range_semitones: DEFAULT_PITCH_BEND_RANGE_SEMITONES,
            base_cutoff: 1000.0,
            filter_env_amount: 0.0,
        }
    }

    /// Trigger a new note: reset oscillator phase and filter state,
    /// hard-restart both envelopes.
    pub fn trigger(&mut self, freq_hz: f32, volume: f32) {
        self.base_frequency = freq_hz;
        self.volume = volume;
        self.oscillator.reset();
        self.filter.reset();
        self.amp_envelope.trigger();
        self.filter_envelope.trigger();
    }

    /// Release both envelopes.
    pub fn release(&mut self) {
        self.amp_envelope.release();
        self.filter_envelope.release();
    }

    /// Active as long as the amplitude envelope is non-Idle.
    pub fn is_active(&self) -> bool {
        self.amp_envelope.is_active()
    }

    /// Current phase of the amplitude envelope, for diagnostics/tests.
    pub fn amp_envelope_phase(&self) -> EnvelopePhase {
        self.amp_envelope.phase()
    }

    pub fn base_cutoff(&self) -> f32 {
        self.base_cutoff
    }

    pub fn pitch_bend(&self) -> f32 {
        self.pitch_bend
    }

    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.base_frequency = freq_hz;
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    /// Set normalized pitch bend, clamped to -1.0..=1.0.
    pub fn set_pitch_bend(&mut self, bend: f32) {
        self.pitch_bend = bend.clamp(-1.0, 1.0);
    }

    pub fn set_pitch_bend_range(&mut self, semitones: f32) {
        self.pitch_bend_range_semitones = semitones;
    }

    pub fn set_filter_mode(&mut self, mode: FilterMode) {
        self.filter.set_mode(mode);
    }

    pub fn set_base_cutoff(&mut self, cutoff_hz: f32) {
        self.base_cutoff = cutoff_hz;
    }

    pub fn set_filter_q(&mut self, q: f32) {
        self.filter.set_q(q);
    }

    /// Set filter envelope modulation depth, clamped to 0.0..=1.0.
    pub fn set_filter_env_amount(&mut self, amount: f32) {
        self.filter_env_amount = amount.clamp(0.0, 1.0);
    }

    pub fn set_filter_envelope(&mut self, attack_secs: f32, decay_secs: f32, sustain: f32, release_secs: f32) {
        self.filter_envelope.set_params(attack_secs, decay_secs, sustain, release_secs);
    }

    pub fn set_amp_envelope(&mut self, attack_secs: f32, decay_secs: f32, sustain: f32, release_secs: f32) {
        self.amp_envelope.set_params(attack_secs, decay_secs, sustain, release_secs);
    }

    /// Produce one sample, reading the shared wavetable `table`.
    ///
    /// Returns 0.0 immediately (skipping oscillator/filter/envelope
    /// work) when the amplitude envelope is Idle.
    #[inline]
    pub fn next_sample(&mut self, table: &WavetableBuffer) -> f32 {
        if !self.amp_envelope.is_active() {
            return 0.0;
        }

        let semitone_shift = self.pitch_bend * self.pitch_bend_range_semitones;
        let frequency = self.base_frequency * 2f32.powf(semitone_shift / 12.0);
        let x = self.oscillator.next_sample(table, frequency);

        let filter_env_level = self.filter_envelope.next_sample();
        let modulated_cutoff =
            self.base_cutoff * (1.0 + filter_env_level * self.filter_env_amount * FILTER_ENV_MOD_FACTOR);
        self.filter.set_cutoff(modulated_cutoff);
        let y = self.filter.process_sample(x);

        let amp_level = self.amp_envelope.next_sample();
        y * amp_level * self.volume
    }
}
