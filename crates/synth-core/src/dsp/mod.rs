//! DSP building blocks: oscillator, filter, envelope.

pub mod biquad;
pub mod envelope;
pub mod oscillator;

pub use biquad::{Biquad, FilterMode};
pub use envelope::{Envelope, EnvelopePhase};
pub use oscillator::{Oscillator, WavetableBuffer, TABLE_SIZE};
