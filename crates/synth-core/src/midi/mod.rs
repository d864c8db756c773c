//! MIDI byte decoding: event types and the running-status state machine.

pub mod decoder;
pub mod event;

pub use decoder::Decoder;
pub use event::{
    normalize_pitch_bend, ChannelPressure, ControlChange, MidiChannel, MidiEvent, MidiNote,
    NoteOff, NoteOn, PitchBend, PolyAftertouch, ProgramChange,
};
