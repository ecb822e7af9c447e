use std::{
    fs::{self, File},
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use fernandino::{
    bindings::decode_bindings,
    dispatch::{DispatchAction, DispatchEngine, EngineOutput},
    gesture::MotionSample,
};

// Upper bound on timer deliveries after the last sample.
const MAX_TAIL_POLLS: usize = 64;

#[derive(Debug, Parser)]
#[command(name = "gesture_replay")]
#[command(about = "Replays a motion trace through the dispatch engine")]
struct Cli {
    /// CSV trace with `motion,ms,x,y,z` rows.
    trace: PathBuf,
    /// Stored bindings JSON (`[{"gesture":"Shake","action":"..."}]`).
    #[arg(long)]
    bindings: Option<PathBuf>,
    /// Expected action kinds, one per line.
    #[arg(long)]
    expect: Option<PathBuf>,
    #[arg(long = "shake-disabled")]
    shake_disabled: bool,
}

#[derive(Clone, Debug)]
struct Emitted {
    ms: u64,
    action: DispatchAction,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let samples = parse_trace(&cli.trace)?;
    let emitted = replay(samples, cli.bindings.as_deref(), cli.shake_disabled)?;

    println!("event,ms,kind,action,detail");
    for event in &emitted {
        println!(
            "event,{},{},{},{}",
            event.ms,
            event.action.label(),
            action_name(&event.action),
            detail(&event.action)
        );
    }

    if let Some(expect_path) = &cli.expect {
        let expected = parse_expected_kinds(expect_path)?;
        let actual = kinds(&emitted);
        if actual != expected {
            eprintln!("expected kinds: {}", expected.join(","));
            eprintln!("actual kinds:   {}", actual.join(","));
            bail!("dispatch sequence mismatch");
        }
    }

    Ok(())
}

/// Feeds `samples` through a fresh engine, delivering timers as the trace
/// clock passes them and draining the rest after the last sample.
fn replay(
    samples: Vec<MotionSample>,
    bindings: Option<&Path>,
    shake_disabled: bool,
) -> Result<Vec<Emitted>> {
    let mut engine = DispatchEngine::default();
    if let Some(path) = bindings {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let bindings = decode_bindings(&raw)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        engine.set_bindings(Arc::from(bindings));
    }
    engine.set_shake_enabled(!shake_disabled);
    engine.begin_session();

    let mut emitted = Vec::new();
    for sample in samples {
        drain_due(&mut engine, Some(sample.timestamp_ms), &mut emitted);
        let output = engine.on_sample(sample);
        collect(sample.timestamp_ms, output, &mut emitted);
    }
    drain_due(&mut engine, None, &mut emitted);
    Ok(emitted)
}

fn kinds(emitted: &[Emitted]) -> Vec<&'static str> {
    emitted.iter().map(|event| event.action.label()).collect()
}

/// Delivers every timer due before `until_ms`, or all pending ones when `None`.
fn drain_due(engine: &mut DispatchEngine, until_ms: Option<u64>, out: &mut Vec<Emitted>) {
    for _ in 0..MAX_TAIL_POLLS {
        let Some(deadline_ms) = engine.next_deadline_ms() else {
            return;
        };
        if until_ms.is_some_and(|until| deadline_ms > until) {
            return;
        }
        let output = engine.poll(deadline_ms);
        collect(deadline_ms, output, out);
    }
}

fn collect(ms: u64, output: EngineOutput, out: &mut Vec<Emitted>) {
    for action in output.actions {
        out.push(Emitted { ms, action });
    }
}

fn action_name(action: &DispatchAction) -> &str {
    match action {
        DispatchAction::CountdownStarted { action, .. }
        | DispatchAction::CountdownTick { action, .. }
        | DispatchAction::CountdownCancelled { action, .. }
        | DispatchAction::Execute { action, .. } => action,
    }
}

fn detail(action: &DispatchAction) -> String {
    match action {
        DispatchAction::CountdownStarted {
            gesture,
            duration_ms,
            ..
        } => format!("{gesture}/{duration_ms}ms"),
        DispatchAction::CountdownTick { remaining_secs, .. } => format!("{remaining_secs}s"),
        DispatchAction::CountdownCancelled { reason, .. } => reason.label().to_string(),
        DispatchAction::Execute { gesture, .. } => gesture.to_string(),
    }
}

fn parse_trace(path: &Path) -> Result<Vec<MotionSample>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (line_no, line_result) in reader.lines().enumerate() {
        let line_no = line_no + 1;
        let line =
            line_result.with_context(|| format!("failed to read {}:{line_no}", path.display()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed == "motion,ms,x,y,z" {
            continue;
        }

        let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if parts[0] != "motion" {
            continue;
        }
        if parts.len() < 5 {
            bail!(
                "{}:{line_no} invalid trace line, expected 5 columns",
                path.display()
            );
        }

        let ms: u64 = parse_field(parts[1], path, line_no, "ms")?;
        let x: f32 = parse_field(parts[2], path, line_no, "x")?;
        let y: f32 = parse_field(parts[3], path, line_no, "y")?;
        let z: f32 = parse_field(parts[4], path, line_no, "z")?;
        if out
            .last()
            .is_some_and(|prev: &MotionSample| prev.timestamp_ms > ms)
        {
            bail!("{}:{line_no} timestamps must not decrease", path.display());
        }
        out.push(MotionSample::new(x, y, z, ms));
    }

    Ok(out)
}

fn parse_field<T>(value: &str, path: &Path, line_no: usize, field: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("{}:{line_no} invalid {field}: {value}", path.display()))
}

fn parse_expected_kinds(path: &Path) -> Result<Vec<&'static str>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut kinds = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        let token = line.trim();
        if token.is_empty() || token.starts_with('#') {
            continue;
        }
        let Some(kind) = normalize_kind(token) else {
            bail!(
                "{}:{} invalid expected action kind: {token}",
                path.display(),
                line_no + 1
            );
        };
        kinds.push(kind);
    }
    Ok(kinds)
}

fn normalize_kind(kind: &str) -> Option<&'static str> {
    match kind.to_ascii_lowercase().as_str() {
        "countdown_started" | "started" => Some("countdown_started"),
        "countdown_tick" | "tick" => Some("countdown_tick"),
        "countdown_cancelled" | "cancelled" => Some("countdown_cancelled"),
        "execute" => Some("execute"),
        _ => None,
    }
}
