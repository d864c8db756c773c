//! Real-time core of a polyphonic subtractive synthesizer: MIDI
//! decoding, voice allocation with stealing, per-voice DSP (wavetable
//! oscillator, biquad filter, dual ADSR), and the mix/output stage.
//!
//! Everything in this crate that runs on the audio render thread
//! (`Decoder::process`, `VoiceAllocator::allocate`/`for_each`,
//! `Voice::next_sample`, `OutputStage::render_block`, `Engine::*`)
//! performs no heap allocation, no locking, and no system calls after
//! construction. Platform MIDI sources, audio sinks, and program
//! persistence are deliberately left outside this crate; see
//! `synth-storage` for the one persistence collaborator this engine
//! names in its external interface.

pub mod allocator;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod midi;
pub mod output;
pub mod program;
pub mod voice;

pub use allocator::VoiceAllocator;
pub use engine::{Engine, EngineConfig};
pub use error::{EngineError, EngineResult};
pub use output::{OutputStage, Waveshaper};
pub use program::Program;
pub use voice::Voice;
