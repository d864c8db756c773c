//! Desktop demo: drains a MIDI input port through a lock-free ring
//! buffer into the audio callback, which feeds `synth-core` and
//! renders straight to the output device.
//!
//! This is the "pull model" topology: the audio callback drains a
//! non-blocking MIDI source, feeds every byte into the decoder, then
//! renders one block. It exists only to demonstrate wiring; none of
//! this binary is part of the engine itself.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use midir::{Ignore, MidiInput};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;

use synth_core::{Engine, EngineConfig};
use synth_storage::{FilesystemProgramStorage, ProgramStorage};

const MIDI_QUEUE_CAPACITY: usize = 4096;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow::anyhow!("no default audio output device"))?;
    let config = device.default_output_config()?;
    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;

    log::info!("output device: {:?}, sample_rate={}, channels={}", device.name(), sample_rate, channels);

    let midi_queue = HeapRb::<u8>::new(MIDI_QUEUE_CAPACITY);
    let (mut midi_producer, mut midi_consumer) = midi_queue.split();

    let mut midi_in = MidiInput::new("synth-core desktop host")?;
    midi_in.ignore(Ignore::None);
    let in_ports = midi_in.ports();
    let _midi_connection = match in_ports.first() {
        Some(port) => {
            let port_name = midi_in.port_name(port)?;
            log::info!("listening on MIDI input: {}", port_name);
            Some(midi_in.connect(
                port,
                "synth-core-input",
                move |_stamp, message, _| {
                    for &byte in message {
                        // Non-blocking: a full queue drops the byte rather
                        // than blocking this (non-audio) callback thread.
                        let _ = midi_producer.try_push(byte);
                    }
                },
                (),
            ))
        }
        None => {
            log::warn!("no MIDI input ports found; running with no note input");
            None
        }
    };

    let mut engine = Engine::new(EngineConfig { sample_rate, ..EngineConfig::default() })?;

    let program_storage = FilesystemProgramStorage::new("programs");
    match program_storage.load(0) {
        Ok(program) => {
            log::info!("loaded program 0 from ./programs");
            engine.apply_program(program);
        }
        Err(e) => log::warn!("no saved program 0, using defaults: {}", e),
    }

    let mut mono_scratch: Vec<f32> = Vec::new();
    let mut stereo_scratch: Vec<f32> = Vec::new();

    let stream_config: cpal::StreamConfig = config.into();
    let stream = device.build_output_stream(
        &stream_config,
        move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
            while let Some(byte) = midi_consumer.try_pop() {
                engine.process_midi_byte(byte);
            }

            let frames = data.len() / channels;
            mono_scratch.resize(frames, 0.0);
            stereo_scratch.resize(frames * 2, 0.0);
            engine.render_block(&mut mono_scratch, &mut stereo_scratch);

            for (frame_idx, frame) in data.chunks_mut(channels).enumerate() {
                let left = stereo_scratch[frame_idx * 2];
                let right = stereo_scratch[frame_idx * 2 + 1];
                for (ch, sample) in frame.iter_mut().enumerate() {
                    *sample = if ch % 2 == 0 { left } else { right };
                }
            }
        },
        move |err| log::error!("audio stream error: {}", err),
        None,
    )?;

    stream.play()?;
    log::info!("synth running; press enter to quit");
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    Ok(())
}
