//! Top-level wiring: decoder + allocator + output stage behind one
//! entry point, plus the default CC mapping and the hook overrides an
//! embedder may install.

use crate::allocator::VoiceAllocator;
use crate::dsp::{FilterMode, WavetableBuffer};
use crate::error::{EngineError, EngineResult};
use crate::hooks::{
    scale_exponential, scale_linear, AftertouchHook, CcAction, CcHook, ProgramChangeHook,
    DEFAULT_CC_TABLE,
};
use crate::midi::{
    ChannelPressure, ControlChange, Decoder, MidiChannel, MidiEvent, NoteOff, NoteOn,
    PolyAftertouch, ProgramChange,
};
use crate::output::{OutputStage, Waveshaper};
use crate::program::Program;
use crate::voice::Voice;

/// A CC value above this normalized threshold (raw byte > 63) counts
/// as a "rising edge" for the cycle-filter-mode/cycle-waveshaper
/// mappings.
const CC_GATE_THRESHOLD: f32 = 63.0 / 127.0;

fn note_to_freq_hz(note: u8) -> f32 {
    440.0 * 2f32.powf((note as f32 - 69.0) / 12.0)
}

/// Construction-time configuration. All runtime configuration is a
/// constructor argument; there is no config file, environment
/// variable, or CLI flag read by this crate.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub sample_rate: f32,
    pub max_voices: usize,
    pub listen_channel: u8,
    /// Amplitude envelope attack/decay/sustain/release, applied to
    /// every voice at construction. Not part of the persisted
    /// [`Program`]; that format only covers the filter envelope.
    pub amp_env_attack: f32,
    pub amp_env_decay: f32,
    pub amp_env_sustain: f32,
    pub amp_env_release: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            max_voices: 8,
            listen_channel: 0,
            amp_env_attack: 0.005,
            amp_env_decay: 0.1,
            amp_env_sustain: 0.8,
            amp_env_release: 0.3,
        }
    }
}

/// The synthesizer engine: owns every component on the audio render
/// thread's side of the MIDI byte boundary.
pub struct Engine {
    decoder: Decoder,
    allocator: VoiceAllocator,
    table: WavetableBuffer,
    output: OutputStage,
    program: Program,

    cc_hook: Option<CcHook>,
    aftertouch_hook: Option<AftertouchHook>,
    program_change_hook: Option<ProgramChangeHook>,

    filter_mode_gate_high: bool,
    waveshaper_gate_high: bool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        if config.max_voices == 0 {
            return Err(EngineError::Configuration("max_voices must be at least 1".into()));
        }
        if !(config.sample_rate > 0.0) {
            return Err(EngineError::Configuration("sample_rate must be positive".into()));
        }

        let program = Program::default();
        let table = WavetableBuffer::new(program.waveform_shape);
        let sample_rate = config.sample_rate;
        let amp_adsr =
            (config.amp_env_attack, config.amp_env_decay, config.amp_env_sustain, config.amp_env_release);

        let allocator = VoiceAllocator::new(config.max_voices, move || {
            let mut voice = Voice::new(sample_rate);
            voice.set_amp_envelope(amp_adsr.0, amp_adsr.1, amp_adsr.2, amp_adsr.3);
            voice.set_filter_envelope(
                program.filter_env_attack,
                program.filter_env_decay,
                program.filter_env_sustain,
                program.filter_env_release,
            );
            voice.set_base_cutoff(program.base_cutoff);
            voice.set_filter_q(program.filter_q);
            voice.set_filter_mode(program.filter_mode);
            voice.set_filter_env_amount(program.filter_env_amount);
            voice
        });

        log::debug!(
            "engine constructed: sample_rate={} max_voices={} listen_channel={}",
            config.sample_rate,
            config.max_voices,
            config.listen_channel
        );

        Ok(Self {
            decoder: Decoder::new(config.listen_channel),
            allocator,
            table,
            output: OutputStage::new(sample_rate),
            program,
            cc_hook: None,
            aftertouch_hook: None,
            program_change_hook: None,
            filter_mode_gate_high: false,
            waveshaper_gate_high: false,
        })
    }

    /// Install a custom CC hook, taking over entirely from the default
    /// mapping table for every CC number (`None`, the default,
    /// restores table-driven handling).
    pub fn set_cc_hook(&mut self, hook: Option<CcHook>) {
        self.cc_hook = hook;
    }

    pub fn set_aftertouch_hook(&mut self, hook: Option<AftertouchHook>) {
        self.aftertouch_hook = hook;
    }

    pub fn set_program_change_hook(&mut self, hook: Option<ProgramChangeHook>) {
        self.program_change_hook = hook;
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Apply `program` to every voice and regenerate the shared
    /// wavetable. Never call this from the audio thread while program
    /// storage is still loading (see `synth-storage`); building the
    /// `Program` value itself is the embedder's job, off this thread.
    pub fn apply_program(&mut self, program: Program) {
        self.program = program;
        self.table.regenerate(program.waveform_shape);
        self.allocator.for_each(|voice| {
            voice.set_base_cutoff(program.base_cutoff);
            voice.set_filter_q(program.filter_q);
            voice.set_filter_mode(program.filter_mode);
            voice.set_filter_env_amount(program.filter_env_amount);
            voice.set_filter_envelope(
                program.filter_env_attack,
                program.filter_env_decay,
                program.filter_env_sustain,
                program.filter_env_release,
            );
        });
    }

    pub fn allocator(&mut self) -> &mut VoiceAllocator {
        &mut self.allocator
    }

    pub fn output_stage(&mut self) -> &mut OutputStage {
        &mut self.output
    }

    /// Feed one raw MIDI byte through the decoder and dispatch the
    /// resulting event, if any. Safe to call from the audio thread.
    pub fn process_midi_byte(&mut self, byte: u8) {
        if let Some(event) = self.decoder.process(byte) {
            self.dispatch(event);
        }
    }

    fn dispatch(&mut self, event: MidiEvent) {
        match event {
            MidiEvent::NoteOn(NoteOn { note, velocity, .. }) => {
                if velocity <= 0.0 {
                    if let Some(v) = self.allocator.find_allocated(note) {
                        v.release();
                    }
                } else {
                    let freq = note_to_freq_hz(note);
                    self.allocator.allocate(note).trigger(freq, velocity);
                }
            }
            MidiEvent::NoteOff(NoteOff { note, .. }) => {
                if let Some(v) = self.allocator.find_allocated(note) {
                    v.release();
                }
            }
            MidiEvent::PolyAftertouch(PolyAftertouch { channel, note, pressure }) => {
                if let Some(hook) = self.aftertouch_hook.as_mut() {
                    if let Some(v) = self.allocator.find_allocated(note) {
                        hook(channel, note, pressure, v);
                    }
                }
            }
            MidiEvent::ControlChange(ControlChange { channel, controller, value }) => {
                self.handle_cc(channel, controller, value);
            }
            MidiEvent::ProgramChange(ProgramChange { channel, program }) => {
                if let Some(hook) = self.program_change_hook.as_mut() {
                    hook(channel, program, &mut self.allocator);
                }
            }
            MidiEvent::ChannelPressure(ChannelPressure { .. }) => {
                // Decoded but unmapped by default (no default hook).
            }
            MidiEvent::PitchBend(bend) => {
                let value = bend.value;
                self.allocator.for_each(|v| v.set_pitch_bend(value));
            }
            MidiEvent::ChannelMode { .. } => {
                // Channel-mode messages are accepted but not acted on
                // by the default hook.
            }
        }
    }

    fn handle_cc(&mut self, channel: MidiChannel, controller: u8, value: f32) {
        if let Some(hook) = self.cc_hook.as_mut() {
            hook(channel, controller, value, &mut self.allocator);
            return;
        }
        self.apply_default_cc(controller, value);
    }

    fn apply_default_cc(&mut self, controller: u8, value: f32) {
        let action = DEFAULT_CC_TABLE[controller as usize & 0x7F];
        match action {
            CcAction::None => {}
            CcAction::WaveformShape => {
                self.program.waveform_shape = value.clamp(0.0, 1.0);
                self.table.regenerate(self.program.waveform_shape);
            }
            CcAction::FilterCutoffExp { lo_hz, hi_hz } => {
                let hz = scale_exponential(value, lo_hz, hi_hz);
                self.program.base_cutoff = hz;
                self.allocator.for_each(|v| v.set_base_cutoff(hz));
            }
            CcAction::FilterQLinear { lo, hi } => {
                let q = scale_linear(value, lo, hi);
                self.program.filter_q = q;
                self.allocator.for_each(|v| v.set_filter_q(q));
            }
            CcAction::FilterEnvSustain => {
                self.program.filter_env_sustain = value.clamp(0.0, 1.0);
                self.broadcast_filter_envelope();
            }
            CcAction::FilterEnvAttackLinear { lo_secs, hi_secs } => {
                self.program.filter_env_attack = scale_linear(value, lo_secs, hi_secs);
                self.broadcast_filter_envelope();
            }
            CcAction::FilterEnvDecayLinear { lo_secs, hi_secs } => {
                self.program.filter_env_decay = scale_linear(value, lo_secs, hi_secs);
                self.broadcast_filter_envelope();
            }
            CcAction::FilterEnvReleaseLinear { lo_secs, hi_secs } => {
                self.program.filter_env_release = scale_linear(value, lo_secs, hi_secs);
                self.broadcast_filter_envelope();
            }
            CcAction::OutputDrive => {
                self.output.set_drive(value);
            }
            CcAction::CycleFilterMode => {
                if value > CC_GATE_THRESHOLD {
                    if !self.filter_mode_gate_high {
                        self.filter_mode_gate_high = true;
                        self.cycle_filter_mode();
                    }
                } else {
                    self.filter_mode_gate_high = false;
                }
            }
            CcAction::CycleWaveshaper => {
                if value > CC_GATE_THRESHOLD {
                    if !self.waveshaper_gate_high {
                        self.waveshaper_gate_high = true;
                        self.cycle_waveshaper();
                    }
                } else {
                    self.waveshaper_gate_high = false;
                }
            }
        }
    }

    fn broadcast_filter_envelope(&mut self) {
        let (a, d, s, r) = (
            self.program.filter_env_attack,
            self.program.filter_env_decay,
            self.program.filter_env_sustain,
            self.program.filter_env_release,
        );
        self.allocator.for_each(|v| v.set_filter_envelope(a, d, s, r));
    }

    fn cycle_filter_mode(&mut self) {
        const ORDER: [FilterMode; 5] = [
            FilterMode::Lowpass,
            FilterMode::Highpass,
            FilterMode::Bandpass,
            FilterMode::Notch,
            FilterMode::Allpass,
        ];
        let next_index = (self.program.filter_mode.to_index() as usize + 1) % ORDER.len();
        self.program.filter_mode = ORDER[next_index];
        let mode = self.program.filter_mode;
        self.allocator.for_each(|v| v.set_filter_mode(mode));
    }

    fn cycle_waveshaper(&mut self) {
        let next = match self.output.waveshaper() {
            Waveshaper::TanhSoftClip => Waveshaper::HardWaveFolder,
            Waveshaper::HardWaveFolder => Waveshaper::SoftWaveFolder,
            Waveshaper::SoftWaveFolder => Waveshaper::TanhSoftClip,
        };
        self.output.set_waveshaper(next);
    }

    /// Render one block of audio: sum active voices, shape, post-filter,
    /// and write interleaved stereo into `stereo_out`. `mono_scratch`
    /// must be exactly half the length of `stereo_out`.
    pub fn render_block(&mut self, mono_scratch: &mut [f32], stereo_out: &mut [f32]) {
        self.output.render_block(&mut self.allocator, &self.table, mono_scratch, stereo_out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::EnvelopePhase;

    fn test_engine(max_voices: usize, listen_channel: u8) -> Engine {
        Engine::new(EngineConfig { max_voices, listen_channel, ..EngineConfig::default() }).unwrap()
    }

    #[test]
    fn zero_voices_is_a_configuration_error() {
        let result = Engine::new(EngineConfig { max_voices: 0, ..EngineConfig::default() });
        assert!(result.is_err());
    }

    #[test]
    fn scenario_note_on_then_off_cycles_through_envelope_phases() {
        let mut engine = test_engine(8, 0);
        for &b in &[0x90u8, 60, 100] {
            engine.process_midi_byte(b);
        }
        {
            let v = engine.allocator().find_allocated(60).unwrap();
            assert!((v.amp_envelope_phase() != EnvelopePhase::Idle));
        }
        for &b in &[0x80u8, 60, 0] {
            engine.process_midi_byte(b);
        }
        assert!(engine.allocator().find_allocated(60).is_some());

        let mut mono = vec![0.0; 16];
        let mut stereo = vec![0.0; 32];
        let mut saw_release = false;
        for _ in 0..20_000 {
            engine.render_block(&mut mono, &mut stereo);
            let phase = engine.allocator().find_allocated(60).unwrap().amp_envelope_phase();
            if phase == EnvelopePhase::Release {
                saw_release = true;
            }
            if phase == EnvelopePhase::Idle && saw_release {
                break;
            }
        }
        assert!(saw_release);
        assert_eq!(
            engine.allocator().find_allocated(60).unwrap().amp_envelope_phase(),
            EnvelopePhase::Idle
        );
    }

    #[test]
    fn scenario_three_distinct_notes_allocate_three_voices_from_a_pool_of_eight() {
        let mut engine = test_engine(8, 0);
        for bytes in [[0x90u8, 60, 100], [0x90, 64, 100], [0x90, 67, 100]] {
            for b in bytes {
                engine.process_midi_byte(b);
            }
        }
        assert!(engine.allocator().find_allocated(60).is_some());
        assert!(engine.allocator().find_allocated(64).is_some());
        assert!(engine.allocator().find_allocated(67).is_some());

        let mut visited = 0;
        engine.allocator().for_each(|_| visited += 1);
        assert_eq!(visited, 8);
    }

    #[test]
    fn scenario_stealing_with_two_voice_pool() {
        let mut engine = test_engine(2, 0);
        for bytes in [[0x90u8, 60, 100], [0x90, 64, 100], [0x90, 67, 100]] {
            for b in bytes {
                engine.process_midi_byte(b);
            }
        }
        let remaining =
            [60u8, 64].iter().filter(|&&n| engine.allocator().find_allocated(n).is_some()).count();
        assert_eq!(remaining, 1);
        assert!(engine.allocator().find_allocated(67).is_some());
    }

    #[test]
    fn scenario_wrong_channel_status_produces_no_allocation() {
        let mut engine = test_engine(8, 0);
        for &b in &[0x91u8, 60, 100] {
            engine.process_midi_byte(b);
        }
        assert!(engine.allocator().find_allocated(60).is_none());
    }

    #[test]
    fn scenario_pitch_bend_center_is_broadcast_to_every_voice() {
        let mut engine = test_engine(8, 0);
        for &b in &[0xE0u8, 0, 64] {
            engine.process_midi_byte(b);
        }
        let mut all_zero = true;
        engine.allocator().for_each(|v| {
            if v.pitch_bend() != 0.0 {
                all_zero = false;
            }
        });
        assert!(all_zero);
    }

    #[test]
    fn scenario_default_cc_cutoff_mapping_reaches_10khz() {
        let mut engine = test_engine(8, 0);
        for &b in &[0xB0u8, 20, 127] {
            engine.process_midi_byte(b);
        }
        let mut voice_count = 0;
        engine.allocator().for_each(|v| {
            assert!((v.base_cutoff() - 10_000.0).abs() < 1.0);
            voice_count += 1;
        });
        assert_eq!(voice_count, 8);
    }

    #[test]
    fn running_status_produces_two_note_ons() {
        let mut engine = test_engine(8, 0);
        for &b in &[0x90u8, 60, 100, 64, 100] {
            engine.process_midi_byte(b);
        }
        assert!(engine.allocator().find_allocated(60).is_some());
        assert!(engine.allocator().find_allocated(64).is_some());
    }

    #[test]
    fn note_on_velocity_zero_is_equivalent_to_note_off() {
        let mut engine = test_engine(8, 0);
        for &b in &[0x90u8, 60, 100] {
            engine.process_midi_byte(b);
        }
        assert!(engine.allocator().find_allocated(60).unwrap().is_active());
        for &b in &[0x90u8, 60, 0] {
            engine.process_midi_byte(b);
        }
        // Released, not removed from the slot.
        let v = engine.allocator().find_allocated(60).unwrap();
        assert_eq!(v.amp_envelope_phase(), EnvelopePhase::Release);
    }

    #[test]
    fn custom_cc_hook_overrides_the_default_table() {
        let mut engine = test_engine(8, 0);
        let seen = std::sync::Arc::new(std::sync::Mutex::new(None));
        let seen_clone = seen.clone();
        engine.set_cc_hook(Some(Box::new(move |_ch, cc, val, _alloc| {
            *seen_clone.lock().unwrap() = Some((cc, val));
        })));
        for &b in &[0xB0u8, 20, 127] {
            engine.process_midi_byte(b);
        }
        assert_eq!(*seen.lock().unwrap(), Some((20, 1.0)));
        // Default table's cutoff broadcast never ran.
        engine.allocator().for_each(|v| assert_eq!(v.base_cutoff(), 1000.0));
    }

    #[test]
    fn aftertouch_hook_fires_for_an_allocated_note() {
        let mut engine = test_engine(8, 0);
        for &b in &[0x90u8, 60, 100] {
            engine.process_midi_byte(b);
        }
        let seen = std::sync::Arc::new(std::sync::Mutex::new(None));
        let seen_clone = seen.clone();
        engine.set_aftertouch_hook(Some(Box::new(move |channel, note, pressure, _voice| {
            *seen_clone.lock().unwrap() = Some((channel, note, pressure));
        })));
        for &b in &[0xA0u8, 60, 80] {
            engine.process_midi_byte(b);
        }
        assert_eq!(*seen.lock().unwrap(), Some((0, 60, 80.0 / 127.0)));
    }

    #[test]
    fn aftertouch_hook_does_not_fire_for_an_unallocated_note() {
        let mut engine = test_engine(8, 0);
        let fired = std::sync::Arc::new(std::sync::Mutex::new(false));
        let fired_clone = fired.clone();
        engine.set_aftertouch_hook(Some(Box::new(move |_ch, _note, _pressure, _voice| {
            *fired_clone.lock().unwrap() = true;
        })));
        for &b in &[0xA0u8, 60, 80] {
            engine.process_midi_byte(b);
        }
        assert!(!*fired.lock().unwrap());
    }

    #[test]
    fn program_change_hook_fires_with_channel_and_program_number() {
        let mut engine = test_engine(8, 0);
        let seen = std::sync::Arc::new(std::sync::Mutex::new(None));
        let seen_clone = seen.clone();
        engine.set_program_change_hook(Some(Box::new(move |channel, program, _alloc| {
            *seen_clone.lock().unwrap() = Some((channel, program));
        })));
        for &b in &[0xC0u8, 5] {
            engine.process_midi_byte(b);
        }
        assert_eq!(*seen.lock().unwrap(), Some((0, 5)));
    }

    #[test]
    fn apply_program_updates_every_voice_and_the_shared_wavetable() {
        let mut engine = test_engine(4, 0);
        let mut program = Program::default();
        program.base_cutoff = 2000.0;
        program.filter_mode = FilterMode::Highpass;
        engine.apply_program(program);
        engine.allocator().for_each(|v| {
            assert_eq!(v.base_cutoff(), 2000.0);
        });
    }
}
