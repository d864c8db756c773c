//! Human-readable `key=value` encoding of a [`Program`].
//!
//! A plain text encoding, one `key=value` line per field, rather than
//! a binary `[path_len][path][value]` scheme.
//! Unknown keys are skipped for forward compatibility; missing keys
//! fall back to [`Program::default`].

use synth_core::dsp::FilterMode;
use synth_core::program::Program;

/// Serialize `program` as `key=value` lines, one field per line.
pub fn serialize(program: &Program) -> String {
    let mut out = String::new();
    out.push_str(&format!("waveformShape={}\n", program.waveform_shape));
    out.push_str(&format!("baseCutoff={}\n", program.base_cutoff));
    out.push_str(&format!("filterQ={}\n", program.filter_q));
    out.push_str(&format!("filterMode={}\n", program.filter_mode.to_index()));
    out.push_str(&format!("filterEnvAmount={}\n", program.filter_env_amount));
    out.push_str(&format!("filterEnvAttack={}\n", program.filter_env_attack));
    out.push_str(&format!("filterEnvDecay={}\n", program.filter_env_decay));
    out.push_str(&format!("filterEnvSustain={}\n", program.filter_env_sustain));
    out.push_str(&format!("filterEnvRelease={}\n", program.filter_env_release));
    out
}

/// Parse `text` into a `Program`, starting from defaults and
/// overwriting whichever recognized keys are present. Lines that are
/// blank, don't parse as `key=value`, or whose value doesn't parse as
/// the expected type are skipped rather than rejecting the whole file.
pub fn deserialize(text: &str) -> Program {
    let mut program = Program::default();

    for line in text.lines() {
        let line = line.trim();
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "waveformShape" => assign_f32(&mut program.waveform_shape, value),
            "baseCutoff" => assign_f32(&mut program.base_cutoff, value),
            "filterQ" => assign_f32(&mut program.filter_q, value),
            "filterMode" => {
                if let Ok(index) = value.parse::<u8>() {
                    program.filter_mode = FilterMode::from_index(index);
                }
            }
            "filterEnvAmount" => assign_f32(&mut program.filter_env_amount, value),
            "filterEnvAttack" => assign_f32(&mut program.filter_env_attack, value),
            "filterEnvDecay" => assign_f32(&mut program.filter_env_decay, value),
            "filterEnvSustain" => assign_f32(&mut program.filter_env_sustain, value),
            "filterEnvRelease" => assign_f32(&mut program.filter_env_release, value),
            _ => {} // unknown key, ignored for forward compatibility
        }
    }

    program
}

fn assign_f32(field: &mut f32, raw: &str) {
    if let Ok(v) = raw.parse::<f32>() {
        *field = v;
    }
}
