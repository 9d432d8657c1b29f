use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use multiconfig::{Bounds, MAX_REFRESH_RATE};
use renderer::ClockMode;
use viewport::{FitDirection, FitPolicy, Size};

#[derive(Parser, Debug)]
#[command(
    name = "effectsdemo",
    author,
    version,
    about = "Headless host for stretchable shader effect controls"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print how a source surface is fitted into a viewport.
    Plan(PlanArgs),
    /// Drive the configured effects through a simulated display.
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Viewport the effect is painted into (e.g. `800x450`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub viewport: Size,

    /// Size of the effect's own surface (e.g. `512x512`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub source: Size,

    /// Stretch policy: `none`, `fill`, `uniform`, or `uniform-to-fill`.
    #[arg(long, value_name = "POLICY", value_parser = parse_stretch, default_value = "uniform")]
    pub stretch: FitPolicy,

    /// Stretch direction: `both`, `up-only`, or `down-only`.
    #[arg(long, value_name = "DIRECTION", value_parser = parse_direction, default_value = "both")]
    pub direction: FitDirection,

    /// Emit JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Effects configuration (TOML). Uses a built-in demo when omitted.
    #[arg(long, env = "EFFECTSDEMO_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Simulated wall time to run for (`5s`, `1500ms`, ...).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration, default_value = "5s")]
    pub duration: Duration,

    /// Simulated display refresh rate in Hz; overrides the config.
    #[arg(long, value_name = "HZ", value_parser = parse_rate)]
    pub refresh_rate: Option<f32>,

    /// Frame cap applied by the scheduler (0=uncapped); overrides the config.
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Effect clock: `fixed`, `realtime`, or `still:SECONDS`.
    #[arg(long, value_name = "CLOCK", value_parser = parse_clock, default_value = "fixed")]
    pub clock: ClockChoice,

    /// Write a JSON summary of the run to this path.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

/// Which clock drives each effect's time uniform during `run`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ClockChoice {
    /// One step per painted frame, from the effect's `fps` or the refresh rate.
    #[default]
    Fixed,
    Realtime,
    Still(f32),
}

impl ClockChoice {
    pub fn clock_mode(self, step_fps: f32) -> ClockMode {
        match self {
            ClockChoice::Fixed => ClockMode::FixedStep { fps: step_fps },
            ClockChoice::Realtime => ClockMode::Realtime,
            ClockChoice::Still(time) => ClockMode::Still { time },
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<Size, String> {
    value.parse::<Bounds>().map(Bounds::to_size)
}

pub fn parse_stretch(value: &str) -> Result<FitPolicy, String> {
    value.parse().map_err(|err: viewport::ParseFitError| err.to_string())
}

pub fn parse_direction(value: &str) -> Result<FitDirection, String> {
    value.parse().map_err(|err: viewport::ParseFitError| err.to_string())
}

pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("duration must not be empty".into());
    }
    if let Ok(seconds) = trimmed.parse::<f64>() {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err("duration must be non-negative".into());
        }
        return Duration::try_from_secs_f64(seconds)
            .map_err(|err| format!("invalid duration '{trimmed}': {err}"));
    }
    humantime::parse_duration(trimmed).map_err(|err| format!("invalid duration '{trimmed}': {err}"))
}

pub fn parse_clock(value: &str) -> Result<ClockChoice, String> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "fixed" | "fixed-step" | "step" => return Ok(ClockChoice::Fixed),
        "realtime" | "system" | "wall" => return Ok(ClockChoice::Realtime),
        "still" => return Ok(ClockChoice::Still(0.0)),
        _ => {}
    }
    let Some(seconds) = normalized.strip_prefix("still:") else {
        return Err(format!(
            "invalid clock '{value}'; expected fixed, realtime, or still:SECONDS"
        ));
    };
    let time: f32 = seconds
        .trim()
        .parse()
        .map_err(|_| format!("invalid still time '{seconds}'"))?;
    if !time.is_finite() {
        return Err("still time must be finite".into());
    }
    Ok(ClockChoice::Still(time))
}

pub fn parse_rate(value: &str) -> Result<f32, String> {
    let rate: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid refresh rate '{value}'"))?;
    if !rate.is_finite() || rate <= 0.0 {
        return Err("refresh rate must be greater than zero".into());
    }
    if rate > MAX_REFRESH_RATE {
        return Err(format!("refresh rate must be at most {MAX_REFRESH_RATE} Hz"));
    }
    Ok(rate)
}
