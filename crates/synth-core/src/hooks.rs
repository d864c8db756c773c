//! Application-supplied translation from MIDI CC/aftertouch/program
//! numbers to synth-parameter writes.
//!
//! The core decoder stays mapping-free (there is no standard meaning
//! for most CC numbers); the default CC mapping lives here as a
//! zero-allocation static table built with a const-fn builder.
//! Anything the table doesn't cover, or an embedder wants to override
//! entirely, goes through a boxed closure instead.

use crate::allocator::VoiceAllocator;
use crate::midi::{MidiChannel, MidiNote};
use crate::voice::Voice;

/// One entry of the default CC mapping table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CcAction {
    /// CC number has no default mapping.
    None,
    /// Regenerate the shared wavetable with this normalized shape.
    WaveformShape,
    /// Broadcast a new base cutoff, scaled exponentially over `[lo, hi]` Hz.
    FilterCutoffExp { lo_hz: f32, hi_hz: f32 },
    /// Broadcast a new filter Q, scaled linearly over `[lo, hi]`.
    FilterQLinear { lo: f32, hi: f32 },
    /// Broadcast a new filter envelope sustain level (linear 0..1).
    FilterEnvSustain,
    /// Broadcast a new filter envelope attack time, linear over `[lo, hi]` seconds.
    FilterEnvAttackLinear { lo_secs: f32, hi_secs: f32 },
    /// Broadcast a new filter envelope decay time, linear over `[lo, hi]` seconds.
    FilterEnvDecayLinear { lo_secs: f32, hi_secs: f32 },
    /// Broadcast a new filter envelope release time, linear over `[lo, hi]` seconds.
    FilterEnvReleaseLinear { lo_secs: f32, hi_secs: f32 },
    /// Set the output stage's drive parameter (linear 0..1).
    OutputDrive,
    /// On a rising edge (value > 63), advance to the next filter mode.
    CycleFilterMode,
    /// On a rising edge (value > 63), advance to the next waveshaper.
    CycleWaveshaper,
}

/// Recommended CC mapping table (CC 0..127), indexed by raw CC number.
/// Matches the table in the external interface documentation exactly;
/// every entry is individually replaceable by an embedder through a
/// custom CC hook.
pub const DEFAULT_CC_TABLE: [CcAction; 128] = build_default_table();

const fn build_default_table() -> [CcAction; 128] {
    let mut table = [CcAction::None; 128];
    table[1] = CcAction::WaveformShape;
    table[20] = CcAction::FilterCutoffExp { lo_hz: 100.0, hi_hz: 10_000.0 };
    table[21] = CcAction::FilterQLinear { lo: 0.1, hi: 20.0 };
    table[25] = CcAction::FilterEnvSustain;
    table[71] = CcAction::FilterEnvAttackLinear { lo_secs: 0.001, hi_secs: 2.0 };
    table[72] = CcAction::FilterEnvDecayLinear { lo_secs: 0.01, hi_secs: 5.0 };
    table[73] = CcAction::FilterEnvReleaseLinear { lo_secs: 0.01, hi_secs: 5.0 };
    table[74] = CcAction::OutputDrive;
    table[96] = CcAction::CycleFilterMode;
    table[102] = CcAction::CycleWaveshaper;
    table
}

/// Linear scaling of a normalized `0.0..=1.0` CC value into `[lo, hi]`.
#[inline]
pub fn scale_linear(value01: f32, lo: f32, hi: f32) -> f32 {
    lo + (hi - lo) * value01.clamp(0.0, 1.0)
}

/// Exponential scaling of a normalized `0.0..=1.0` CC value into
/// `[lo, hi]`, matching the drive/cutoff mapping `lo * (hi/lo)^value`.
#[inline]
pub fn scale_exponential(value01: f32, lo: f32, hi: f32) -> f32 {
    let v = value01.clamp(0.0, 1.0);
    lo * (hi / lo).powf(v)
}

/// A user-supplied override for CC handling, given a reference to the
/// allocator so it may broadcast via `for_each`. Stored as an owned
/// boxed closure because there is no way to know its concrete type at
/// compile time; invoking it does not allocate.
pub type CcHook = Box<dyn FnMut(MidiChannel, u8, f32, &mut VoiceAllocator) + Send>;

/// A user-supplied handler for polyphonic aftertouch. The default is a
/// no-op.
pub type AftertouchHook = Box<dyn FnMut(MidiChannel, MidiNote, f32, &mut Voice) + Send>;

/// A user-supplied handler for program-change messages, typically
/// wired to a `ProgramStorage` implementation by the embedder.
pub type ProgramChangeHook = Box<dyn FnMut(MidiChannel, u8, &mut VoiceAllocator) + Send>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_documented_mapping() {
        assert_eq!(DEFAULT_CC_TABLE[1], CcAction::WaveformShape);
        assert_eq!(
            DEFAULT_CC_TABLE[20],
            CcAction::FilterCutoffExp { lo_hz: 100.0, hi_hz: 10_000.0 }
        );
        assert_eq!(DEFAULT_CC_TABLE[74], CcAction::OutputDrive);
        assert_eq!(DEFAULT_CC_TABLE[96], CcAction::CycleFilterMode);
        assert_eq!(DEFAULT_CC_TABLE[0], CcAction::None);
    }

    #[test]
    fn cutoff_cc_127_reaches_exactly_10khz() {
        let v = scale_exponential(127.0 / 127.0, 100.0, 10_000.0);
        assert!((v - 10_000.0).abs() < 1e-2);
    }

    #[test]
    fn linear_scaling_is_clamped() {
        assert_eq!(scale_linear(-1.0, 0.1, 20.0), 0.1);
        assert_eq!(scale_linear(2.0, 0.1, 20.0), 20.0);
    }
}
