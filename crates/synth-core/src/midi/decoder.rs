//! Byte-level MIDI decoder: a state machine honoring running status and
//! real-time interleaving.
//!
//! [`Decoder::process`] is the only entry point. It consumes one raw
//! MIDI octet and returns at most one fully decoded [`MidiEvent`]. It
//! never allocates and never blocks, so it is safe to call from the
//! audio thread once bytes have been funneled there.

use super::event::{
    normalize_pitch_bend, ChannelPressure, ControlChange, MidiChannel, MidiEvent, NoteOff, NoteOn,
    PitchBend, PolyAftertouch, ProgramChange,
};

/// Upper nibble of a channel-voice status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    NoteOff,
    NoteOn,
    PolyAftertouch,
    ControlChange,
    ProgramChange,
    ChannelPressure,
    PitchBend,
}

impl Command {
    /// Classify a channel-voice status byte's upper nibble (0x8..0xE).
    /// Returns `None` for anything outside the channel-voice range.
    fn from_nibble(nibble: u8) -> Option<Self> {
        match nibble {
            0x8 => Some(Self::NoteOff),
            0x9 => Some(Self::NoteOn),
            0xA => Some(Self::PolyAftertouch),
            0xB => Some(Self::ControlChange),
            0xC => Some(Self::ProgramChange),
            0xD => Some(Self::ChannelPressure),
            0xE => Some(Self::PitchBend),
            _ => None,
        }
    }

    /// Number of data bytes a complete message of this command needs.
    fn data_byte_count(self) -> u8 {
        match self {
            Self::ProgramChange | Self::ChannelPressure => 1,
            _ => 2,
        }
    }
}

/// Running-status + partial-message state of the decoder.
///
/// Invariant: when `data_so_far == 0` the decoder is between messages;
/// `running_status` may still be set (channel-voice only) so a further
/// data byte re-applies it.
struct DecoderState {
    running_status: Option<(Command, MidiChannel)>,
    data_so_far: u8,
    first_data_byte: u8,
}

impl DecoderState {
    fn new() -> Self {
        Self { running_status: None, data_so_far: 0, first_data_byte: 0 }
    }

    fn clear(&mut self) {
        self.running_status = None;
        self.data_so_far = 0;
    }
}

/// Stateful byte processor for a single MIDI input channel.
pub struct Decoder {
    state: DecoderState,
    listen_channel: MidiChannel,
}

impl Decoder {
    /// Create a decoder that acts only on channel-voice messages
    /// addressed to `listen_channel` (0..15).
    pub fn new(listen_channel: MidiChannel) -> Self {
        Self { state: DecoderState::new(), listen_channel: listen_channel & 0x0F }
    }

    /// The channel this decoder is configured to listen on.
    pub fn listen_channel(&self) -> MidiChannel {
        self.listen_channel
    }

    /// Feed one raw MIDI byte into the decoder.
    ///
    /// Returns `Some(event)` the instant a complete message has been
    /// decoded, `None` otherwise (system real-time bytes, status bytes
    /// awaiting data, data bytes still being accumulated, or anything
    /// tolerated but otherwise ignored).
    pub fn process(&mut self, byte: u8) -> Option<MidiEvent> {
        // System real-time (0xF8..0xFF): passes through untouched, may
        // appear anywhere, including mid-message.
        if byte >= 0xF8 {
            return None;
        }

        // Status byte (bit 7 set).
        if byte & 0x80 != 0 {
            // System common/exclusive (0xF0..0xF7): clears running status.
            if byte >= 0xF0 {
                self.state.clear();
                return None;
            }

            let nibble = byte >> 4;
            let channel = byte & 0x0F;
            match Command::from_nibble(nibble) {
                Some(command) if channel == self.listen_channel => {
                    self.state.running_status = Some((command, channel));
                    self.state.data_so_far = 0;
                    None
                }
                _ => {
                    // Wrong channel, or (unreachably, given nibble range)
                    // not a channel-voice status: abandon running status.
                    self.state.clear();
                    None
                }
            }
        } else {
            // Data byte.
            let Some((command, channel)) = self.state.running_status else {
                // No status in effect yet: ignore stray data byte.
                return None;
            };

            if self.state.data_so_far == 0 {
                self.state.first_data_byte = byte;
                self.state.data_so_far = 1;
                if command.data_byte_count() == 1 {
                    self.state.data_so_far = 0;
                    return Some(Self::build_event(command, channel, byte, 0));
                }
                None
            } else {
                self.state.data_so_far = 0;
                Some(Self::build_event(command, channel, self.state.first_data_byte, byte))
            }
        }
    }

    fn build_event(command: Command, channel: MidiChannel, d1: u8, d2: u8) -> MidiEvent {
        match command {
            Command::NoteOff => MidiEvent::NoteOff(NoteOff {
                channel,
                note: d1,
                velocity: d2 as f32 / 127.0,
            }),
            Command::NoteOn => MidiEvent::NoteOn(NoteOn {
                channel,
                note: d1,
                velocity: d2 as f32 / 127.0,
            }),
            Command::PolyAftertouch => MidiEvent::PolyAftertouch(PolyAftertouch {
                channel,
                note: d1,
                pressure: d2 as f32 / 127.0,
            }),
            Command::ControlChange if d1 >= 120 => {
                MidiEvent::ChannelMode { channel, controller: d1, value: d2 }
            }
            Command::ControlChange => MidiEvent::ControlChange(ControlChange {
                channel,
                controller: d1,
                value: d2 as f32 / 127.0,
            }),
            Command::ProgramChange => {
                MidiEvent::ProgramChange(ProgramChange { channel, program: d1 })
            }
            Command::ChannelPressure => MidiEvent::ChannelPressure(ChannelPressure {
                channel,
                pressure: d1 as f32 / 127.0,
            }),
            Command::PitchBend => MidiEvent::PitchBend(PitchBend {
                channel,
                value: normalize_pitch_bend(d1, d2),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_on(d: &mut Decoder, status: u8, note: u8, vel: u8) -> Option<MidiEvent> {
        d.process(status);
        d.process(note);
        d.process(vel)
    }

    #[test]
    fn decodes_note_on() {
        let mut d = Decoder::new(0);
        let evt = note_on(&mut d, 0x90, 60, 100);
        assert_eq!(
            evt,
            Some(MidiEvent::NoteOn(NoteOn { channel: 0, note: 60, velocity: 100.0 / 127.0 }))
        );
    }

    #[test]
    fn running_status_produces_two_note_ons() {
        // 0x90, 60, 100, 64, 100 -> two NoteOn events (notes 60 and 64).
        let mut d = Decoder::new(0);
        assert_eq!(d.process(0x90), None);
        assert_eq!(d.process(60), None);
        let first = d.process(100);
        assert_eq!(
            first,
            Some(MidiEvent::NoteOn(NoteOn { channel: 0, note: 60, velocity: 100.0 / 127.0 }))
        );
        assert_eq!(d.process(64), None);
        let second = d.process(100);
        assert_eq!(
            second,
            Some(MidiEvent::NoteOn(NoteOn { channel: 0, note: 64, velocity: 100.0 / 127.0 }))
        );
    }

    #[test]
    fn real_time_byte_mid_message_is_transparent() {
        // 0x90, 60, 0xF8, 100 -> one NoteOn(60, 100); 0xF8 passes through.
        let mut d = Decoder::new(0);
        assert_eq!(d.process(0x90), None);
        assert_eq!(d.process(60), None);
        assert_eq!(d.process(0xF8), None);
        let evt = d.process(100);
        assert_eq!(
            evt,
            Some(MidiEvent::NoteOn(NoteOn { channel: 0, note: 60, velocity: 100.0 / 127.0 }))
        );
    }

    #[test]
    fn wrong_channel_discards_running_status() {
        let mut d = Decoder::new(0);
        assert_eq!(d.process(0x91), None); // NoteOn on channel 1, we listen on 0
        assert_eq!(d.process(60), None);
        assert_eq!(d.process(100), None);
    }

    #[test]
    fn system_exclusive_bytes_are_tolerated_and_clear_running_status() {
        let mut d = Decoder::new(0);
        d.process(0x90);
        d.process(60);
        d.process(100);
        // Running status persists after a full message; 0xF0 clears it.
        assert_eq!(d.process(0xF0), None);
        assert_eq!(d.process(60), None); // stray data byte now, no status
        assert_eq!(d.process(100), None);
    }

    #[test]
    fn program_change_is_single_data_byte() {
        let mut d = Decoder::new(0);
        assert_eq!(d.process(0xC0), None);
        let evt = d.process(5);
        assert_eq!(
            evt,
            Some(MidiEvent::ProgramChange(ProgramChange { channel: 0, program: 5 }))
        );
    }

    #[test]
    fn channel_pressure_is_single_data_byte() {
        let mut d = Decoder::new(0);
        assert_eq!(d.process(0xD0), None);
        let evt = d.process(100);
        assert_eq!(
            evt,
            Some(MidiEvent::ChannelPressure(ChannelPressure { channel: 0, pressure: 100.0 / 127.0 }))
        );
    }

    #[test]
    fn pitch_bend_center_is_zero() {
        let mut d = Decoder::new(0);
        d.process(0xE0);
        let evt = d.process(0);
        assert_eq!(evt, None);
        let evt = d.process(64);
        assert_eq!(evt, Some(MidiEvent::PitchBend(PitchBend { channel: 0, value: 0.0 })));
    }

    #[test]
    fn velocity_zero_note_on_is_decoded_as_note_on_event() {
        // The decoder itself does not rewrite NoteOn(vel=0) into NoteOff;
        // that translation is the engine's responsibility.
        let mut d = Decoder::new(0);
        let evt = note_on(&mut d, 0x90, 60, 0);
        assert_eq!(
            evt,
            Some(MidiEvent::NoteOn(NoteOn { channel: 0, note: 60, velocity: 0.0 }))
        );
    }

    #[test]
    fn high_cc_is_channel_mode() {
        let mut d = Decoder::new(0);
        d.process(0xB0);
        d.process(123);
        let evt = d.process(0);
        assert_eq!(evt, Some(MidiEvent::ChannelMode { channel: 0, controller: 123, value: 0 }));
    }
}
