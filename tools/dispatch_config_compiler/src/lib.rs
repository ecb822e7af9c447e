//! Compiles `config/dispatch.toml` into the Rust source included by the
//! dispatch crate at build time.

use std::{collections::HashSet, fmt, fmt::Write as _, fs, path::Path};

use serde::Deserialize;

#[derive(Debug)]
pub enum ConfigCompilerError {
    Io(String),
    Parse(String),
    Validation(String),
}

impl fmt::Display for ConfigCompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "io error: {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigCompilerError {}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchFile {
    pub sampling: SamplingSection,
    pub classifier: ClassifierSection,
    pub debounce: DebounceSection,
    pub double_shake: DoubleShakeSection,
    pub countdown: CountdownSection,
    pub bindings: BindingsSection,
    pub haptics: HapticsSection,
    pub incidents: IncidentsSection,
    pub actions: Vec<ActionSection>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplingSection {
    pub interval_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierSection {
    pub shake_threshold: f32,
    pub swipe_threshold: f32,
    #[serde(default)]
    pub swipe_right_legacy_compare: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DebounceSection {
    pub shake_cancel_ms: u64,
    pub swipe_trigger_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DoubleShakeSection {
    pub window_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CountdownSection {
    pub duration_ms: u64,
    pub tick_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingsSection {
    pub refresh_ms: u64,
    pub storage_key: String,
    pub shake_enabled_key: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HapticsSection {
    pub countdown_start_pattern_ms: Vec<u64>,
    pub cancel_pulse_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncidentsSection {
    pub enabled: bool,
    pub status: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionSection {
    pub name: String,
    pub number: String,
    pub incident_type: String,
}

pub fn parse_dispatch_file(path: &Path) -> Result<DispatchFile, ConfigCompilerError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        ConfigCompilerError::Io(format!("failed to read {}: {e}", path.display()))
    })?;
    parse_dispatch_str(&raw)
}

pub fn parse_dispatch_str(raw: &str) -> Result<DispatchFile, ConfigCompilerError> {
    toml::from_str(raw).map_err(|e| ConfigCompilerError::Parse(e.to_string()))
}

fn invalid(msg: impl Into<String>) -> Result<(), ConfigCompilerError> {
    Err(ConfigCompilerError::Validation(msg.into()))
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

pub fn validate_config(file: &DispatchFile) -> Result<(), ConfigCompilerError> {
    if file.sampling.interval_ms == 0 {
        return invalid("sampling.interval_ms must be > 0");
    }

    let classifier = &file.classifier;
    if !is_positive(classifier.shake_threshold) {
        return invalid("classifier.shake_threshold must be a positive number");
    }
    if !is_positive(classifier.swipe_threshold) {
        return invalid("classifier.swipe_threshold must be a positive number");
    }
    if classifier.swipe_threshold >= classifier.shake_threshold {
        return invalid(
            "classifier.swipe_threshold must be < classifier.shake_threshold",
        );
    }

    if file.debounce.shake_cancel_ms == 0 || file.debounce.swipe_trigger_ms == 0 {
        return invalid("debounce intervals must be > 0");
    }
    if file.double_shake.window_ms == 0 {
        return invalid("double_shake.window_ms must be > 0");
    }
    let countdown = &file.countdown;
    if countdown.duration_ms == 0 {
        return invalid("countdown.duration_ms must be > 0");
    }
    if countdown.tick_ms == 0 || countdown.tick_ms > countdown.duration_ms {
        return invalid("countdown.tick_ms must be > 0 and <= countdown.duration_ms");
    }

    let bindings = &file.bindings;
    if bindings.refresh_ms == 0 {
        return invalid("bindings.refresh_ms must be > 0");
    }
    if bindings.storage_key.trim().is_empty() {
        return invalid("bindings.storage_key must not be empty");
    }
    if bindings.shake_enabled_key.trim().is_empty() {
        return invalid("bindings.shake_enabled_key must not be empty");
    }

    if file.haptics.countdown_start_pattern_ms.is_empty() {
        return invalid("haptics.countdown_start_pattern_ms must not be empty");
    }

    if file.incidents.status.trim().is_empty() {
        return invalid("incidents.status must not be empty");
    }

    if file.actions.is_empty() {
        return invalid("actions must contain at least one entry");
    }
    let mut seen = HashSet::new();
    for (idx, action) in file.actions.iter().enumerate() {
        if action.name.trim().is_empty() {
            return invalid(format!("actions[{idx}].name must not be empty"));
        }
        if !seen.insert(action.name.as_str()) {
            return invalid(format!("duplicate action name `{}`", action.name));
        }
        if !is_dialable(&action.number) {
            return invalid(format!(
                "actions[{idx}].number must contain only digits, '+', '*' or '#'"
            ));
        }
        if action.incident_type.trim().is_empty() {
            return invalid(format!("actions[{idx}].incident_type must not be empty"));
        }
    }

    Ok(())
}

fn is_dialable(number: &str) -> bool {
    !number.is_empty()
        && number
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '*' | '#'))
}

fn open_section(out: &mut String, field: &str, ty: &str) {
    let _ = writeln!(out, "    {field}: {ty} {{");
}

fn push_field(out: &mut String, name: &str, value: impl fmt::Display) {
    let _ = writeln!(out, "        {name}: {value},");
}

fn close_section(out: &mut String) {
    out.push_str("    },\n");
}

pub fn render_generated_config(file: &DispatchFile) -> String {
    let mut out = String::new();
    out.push_str("// @generated by dispatch_config_compiler.\n");
    out.push_str("// Do not edit.\n\n");

    let _ = writeln!(
        out,
        "pub static DISPATCH_ACTIONS: [ActionRoute; {}] = [",
        file.actions.len()
    );
    for action in &file.actions {
        out.push_str("    ActionRoute {\n");
        push_field(&mut out, "name", format!("{:?}", action.name));
        push_field(&mut out, "number", format!("{:?}", action.number));
        let incident_type = format!("{:?}", action.incident_type);
        push_field(&mut out, "incident_type", incident_type);
        close_section(&mut out);
    }
    out.push_str("];\n\n");

    let pattern = file
        .haptics
        .countdown_start_pattern_ms
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let classifier = &file.classifier;
    let bindings = &file.bindings;

    out.push_str("pub static DISPATCH_CONFIG: DispatchConfig = ");
    out.push_str("DispatchConfig {\n");

    open_section(&mut out, "sampling", "SamplingConfig");
    push_field(&mut out, "interval_ms", file.sampling.interval_ms);
    close_section(&mut out);

    open_section(&mut out, "classifier", "ClassifierConfig");
    let shake_threshold = format!("{:?}", classifier.shake_threshold);
    push_field(&mut out, "shake_threshold", shake_threshold);
    let swipe_threshold = format!("{:?}", classifier.swipe_threshold);
    push_field(&mut out, "swipe_threshold", swipe_threshold);
    let legacy = classifier.swipe_right_legacy_compare;
    push_field(&mut out, "swipe_right_legacy_compare", legacy);
    close_section(&mut out);

    open_section(&mut out, "debounce", "DebounceConfig");
    push_field(&mut out, "shake_cancel_ms", file.debounce.shake_cancel_ms);
    push_field(&mut out, "swipe_trigger_ms", file.debounce.swipe_trigger_ms);
    close_section(&mut out);

    open_section(&mut out, "double_shake", "DoubleShakeConfig");
    push_field(&mut out, "window_ms", file.double_shake.window_ms);
    close_section(&mut out);

    open_section(&mut out, "countdown", "CountdownConfig");
    push_field(&mut out, "duration_ms", file.countdown.duration_ms);
    push_field(&mut out, "tick_ms", file.countdown.tick_ms);
    close_section(&mut out);

    open_section(&mut out, "bindings", "BindingsConfig");
    push_field(&mut out, "refresh_ms", bindings.refresh_ms);
    let storage_key = format!("{:?}", bindings.storage_key);
    push_field(&mut out, "storage_key", storage_key);
    let shake_key = format!("{:?}", bindings.shake_enabled_key);
    push_field(&mut out, "shake_enabled_key", shake_key);
    close_section(&mut out);

    open_section(&mut out, "haptics", "HapticsConfig");
    let pattern = format!("&[{pattern}]");
    push_field(&mut out, "countdown_start_pattern_ms", pattern);
    push_field(&mut out, "cancel_pulse_ms", file.haptics.cancel_pulse_ms);
    close_section(&mut out);

    open_section(&mut out, "incidents", "IncidentsConfig");
    push_field(&mut out, "enabled", file.incidents.enabled);
    push_field(&mut out, "status", format!("{:?}", file.incidents.status));
    close_section(&mut out);

    out.push_str("    actions: &DISPATCH_ACTIONS,\n");
    out.push_str("};\n");
    out
}

pub fn generate_from_path(path: &Path) -> Result<String, ConfigCompilerError> {
    let file = parse_dispatch_file(path)?;
    validate_config(&file)?;
    Ok(render_generated_config(&file))
}
