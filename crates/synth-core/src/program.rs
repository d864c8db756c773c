//! In-memory timbre parameter set, applied to every voice on program
//! change or load.

use crate::dsp::FilterMode;

/// Default oscillator shape: pure sawtooth.
pub const DEFAULT_WAVEFORM_SHAPE: f32 = 0.0;
/// Default filter cutoff, Hz.
pub const DEFAULT_BASE_CUTOFF: f32 = 1000.0;
/// Default filter resonance.
pub const DEFAULT_FILTER_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;
/// Default filter envelope modulation depth: none.
pub const DEFAULT_FILTER_ENV_AMOUNT: f32 = 0.0;
pub const DEFAULT_FILTER_ENV_ATTACK: f32 = 0.01;
pub const DEFAULT_FILTER_ENV_DECAY: f32 = 0.2;
pub const DEFAULT_FILTER_ENV_SUSTAIN: f32 = 1.0;
pub const DEFAULT_FILTER_ENV_RELEASE: f32 = 0.2;

/// A complete timbre, as persisted by `synth-storage` and applied to
/// every voice in the pool on program-change or load.
///
/// Amplitude envelope (attack/decay/sustain/release for loudness, as
/// opposed to cutoff modulation) is deliberately not a `Program` field:
/// it is not part of the persisted key set and lives instead on
/// [`crate::engine::EngineConfig`], applied once at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Program {
    pub waveform_shape: f32,
    pub base_cutoff: f32,
    pub filter_q: f32,
    pub filter_mode: FilterMode,
    pub filter_env_amount: f32,
    pub filter_env_attack: f32,
    pub filter_env_decay: f32,
    pub filter_env_sustain: f32,
    pub filter_env_release: f32,
}

impl Default for Program {
    fn default() -> Self {
        Self {
            waveform_shape: DEFAULT_WAVEFORM_SHAPE,
            base_cutoff: DEFAULT_BASE_CUTOFF,
            filter_q: DEFAULT_FILTER_Q,
            filter_mode: FilterMode::Lowpass,
            filter_env_amount: DEFAULT_FILTER_ENV_AMOUNT,
            filter_env_attack: DEFAULT_FILTER_ENV_ATTACK,
            filter_env_decay: DEFAULT_FILTER_ENV_DECAY,
            filter_env_sustain: DEFAULT_FILTER_ENV_SUSTAIN,
            filter_env_release: DEFAULT_FILTER_ENV_RELEASE,
        }
    }
}
