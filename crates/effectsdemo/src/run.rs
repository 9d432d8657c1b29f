use std::collections::VecDeque;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use multiconfig::{LifecycleAction, LifecycleStep, MultiConfig, ResizeStep, MAX_REFRESH_RATE};
use renderer::{time_source_for_clock, EffectHandler, EffectLoader};
use scheduler::{FrameScheduler, SchedulerSettings, TargetId};
use tracing_subscriber::EnvFilter;

use crate::cli::{ClockChoice, RunArgs};
use crate::control::EffectControl;
use crate::defaults::DEFAULT_CONFIG;
use crate::loader::SourceLoader;
use crate::report::{EffectReport, RunReport};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let (config, root) = load_config(args.config.as_deref())?;
    let refresh_rate = args.refresh_rate.unwrap_or_else(|| config.refresh_rate());
    if !(refresh_rate > 0.0 && refresh_rate <= MAX_REFRESH_RATE) {
        bail!("refresh rate must be greater than zero and at most {MAX_REFRESH_RATE} Hz");
    }
    let settings = SchedulerSettings::with_fps(args.fps.or(config.defaults.fps));
    let loader = SourceLoader::new(root);

    let mut host = Host::new(&config, &loader, settings, refresh_rate, args.clock)?;
    tracing::info!(
        effects = host.effects.len(),
        refresh_rate,
        fps = ?settings.fps,
        clock = ?args.clock,
        duration = %humantime::format_duration(args.duration),
        "starting headless effect host"
    );
    let report = host.run(args.duration);
    log_summary(&report);

    if let Some(path) = args.report.as_deref() {
        write_report(path, &report)?;
        tracing::info!(path = %path.display(), "wrote run report");
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<(MultiConfig, PathBuf)> {
    match path {
        Some(path) => {
            let config = MultiConfig::load(path)
                .with_context(|| format!("failed to load effects config {}", path.display()))?;
            let root = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            Ok((config, root))
        }
        None => {
            tracing::debug!("no --config given; using built-in scene");
            let config = MultiConfig::from_toml_str(DEFAULT_CONFIG)
                .context("built-in effects config is invalid")?;
            Ok((config, PathBuf::from(".")))
        }
    }
}

/// One effect control plus everything the host tracks for it.
struct HostedEffect {
    target: TargetId,
    control: EffectControl,
    handler: Arc<EffectHandler>,
    resizes: VecDeque<ResizeStep>,
    lifecycle: VecDeque<LifecycleStep>,
    report: EffectReport,
}

/// Headless stand-in for a compositor: owns the controls, forwards display
/// refreshes from the scheduler to their handlers, and replays scripted
/// layout and lifecycle changes against a simulated clock.
pub struct Host {
    scheduler: FrameScheduler,
    refresh_rate: f32,
    effects: Vec<HostedEffect>,
}

impl Host {
    pub fn new(
        config: &MultiConfig,
        loader: &SourceLoader,
        settings: SchedulerSettings,
        refresh_rate: f32,
        clock: ClockChoice,
    ) -> Result<Self> {
        let mut scheduler = FrameScheduler::new(settings);
        let mut effects = Vec::new();

        for effect in config.resolved_effects() {
            let target = TargetId::new(format!("effect:{}", effect.name));
            let requester = scheduler
                .register(target.clone())
                .with_context(|| format!("failed to register effect '{}'", effect.name))?;

            let step_fps = effect
                .fps
                .filter(|fps| *fps > 0.0)
                .unwrap_or(refresh_rate);
            let time_source = time_source_for_clock(clock.clock_mode(step_fps));
            let handler = Arc::new(EffectHandler::new(effect.name.clone(), time_source, requester));

            let source = loader.source_for(&effect.shader);
            let loaded = loader.load(&source);
            let mut report = EffectReport::new(effect.name.clone(), source.label());
            report.error_text = loaded.error_text.clone();
            handler.install_program(loaded);

            let mut control = EffectControl::new(&effect);
            control.attach(handler.clone());
            tracing::debug!(
                effect = %effect.name,
                source = %source,
                stretch = %effect.stretch,
                direction = %effect.stretch_direction,
                "effect attached"
            );

            effects.push(HostedEffect {
                target,
                control,
                handler,
                resizes: effect.resizes.into(),
                lifecycle: effect.lifecycle.into(),
                report,
            });
        }

        Ok(Self {
            scheduler,
            refresh_rate,
            effects,
        })
    }

    /// Runs the simulated display for `duration`, then detaches every control.
    pub fn run(&mut self, duration: Duration) -> RunReport {
        let rate = f64::from(self.refresh_rate);
        let total_ticks = (duration.as_secs_f64() * rate).floor() as u64;
        let origin = Instant::now();
        let mut ticks = 0;

        for tick in 0..=total_ticks {
            let elapsed = Duration::from_secs_f64(tick as f64 / rate);
            let Some(now) = origin.checked_add(elapsed) else {
                tracing::warn!(tick, "simulated clock out of range; ending run early");
                break;
            };
            ticks += 1;
            self.apply_script(elapsed);
            for target in self.scheduler.tick(now) {
                self.render(&target);
            }
        }

        for effect in &mut self.effects {
            detach_effect(&mut self.scheduler, effect);
        }

        RunReport {
            refresh_rate: self.refresh_rate,
            duration_secs: duration.as_secs_f64(),
            ticks,
            effects: self
                .effects
                .iter()
                .map(|effect| effect.report.clone())
                .collect(),
        }
    }

    fn apply_script(&mut self, elapsed: Duration) {
        for effect in &mut self.effects {
            while let Some(step) = effect.resizes.front() {
                if step.at > elapsed {
                    break;
                }
                let bounds = step.bounds;
                effect.resizes.pop_front();
                tracing::debug!(effect = %effect.control.name(), %bounds, "resize");
                effect.control.resize(bounds.to_size());
            }

            while let Some(step) = effect.lifecycle.front() {
                if step.at > elapsed {
                    break;
                }
                let action = step.action;
                effect.lifecycle.pop_front();
                tracing::debug!(effect = %effect.control.name(), ?action, "lifecycle");
                match action {
                    LifecycleAction::Start => effect.control.start(),
                    LifecycleAction::Stop => effect.control.stop(),
                    LifecycleAction::Detach => detach_effect(&mut self.scheduler, effect),
                }
            }
        }
    }

    fn render(&mut self, target: &TargetId) {
        let Some(effect) = self.effects.iter_mut().find(|effect| &effect.target == target) else {
            return;
        };
        let viewport = effect.control.bounds();
        let report = &mut effect.report;
        let outcome = effect
            .handler
            .apply_and_render(viewport, |args| report.record_frame(args));
        report.record_outcome(outcome);
    }
}

fn detach_effect(scheduler: &mut FrameScheduler, effect: &mut HostedEffect) {
    if effect.control.detach().is_some() {
        scheduler.unregister(&effect.target);
        effect.report.detached = true;
    }
}

fn log_summary(report: &RunReport) {
    for effect in &report.effects {
        tracing::info!(
            effect = %effect.name,
            painted = effect.frames_painted,
            skipped = effect.frames_skipped,
            idle = effect.idle_ticks,
            last_time = ?effect.last_time,
            error = ?effect.error_text,
            "effect summary"
        );
    }
}

fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create report {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("failed to write report {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(toml: &str) -> Host {
        host_with_clock(toml, ClockChoice::Fixed)
    }

    fn host_with_clock(toml: &str, clock: ClockChoice) -> Host {
        let config = MultiConfig::from_toml_str(toml).unwrap();
        let rate = config.refresh_rate();
        Host::new(
            &config,
            &SourceLoader::new("."),
            SchedulerSettings::default(),
            rate,
            clock,
        )
        .unwrap()
    }

    #[test]
    fn default_scene_paints_every_refresh() {
        let mut host = host(DEFAULT_CONFIG);
        let report = host.run(Duration::from_secs(1));
        assert_eq!(report.ticks, 61);
        let plasma = &report.effects[0];
        assert_eq!(plasma.frames_painted, 61);
        assert_eq!(plasma.program.as_deref(), Some("plasma"));
        assert!(plasma.error_text.is_none());
        assert!(plasma.detached);
        let fit = plasma.last_fit.expect("painted");
        assert!((fit.dest.x - 175.0).abs() < 1e-9);
        assert!((fit.dest.width - 450.0).abs() < 1e-9);
        assert!((plasma.last_time.unwrap() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn zero_sized_bounds_skip_until_resized() {
        let mut host = host(
            r#"
version = 1

[effects.a]
shader = "builtin:rings"
bounds = "400x400"

[[effects.a.resizes]]
at = "500ms"
bounds = "0x400"

[[effects.a.resizes]]
at = "1s"
bounds = "200x100"
"#,
        );
        let report = host.run(Duration::from_secs(2));
        let effect = &report.effects[0];
        assert_eq!(effect.frames_skipped, 1);
        assert_eq!(effect.frames_painted, 121 - 30);
        let fit = effect.last_fit.expect("painted");
        assert!((fit.dest.height - 100.0).abs() < 1e-9);
    }

    #[test]
    fn stopped_effects_stop_painting_until_restarted() {
        let mut host = host(
            r#"
version = 1

[effects.a]
shader = "builtin:plasma"

[[effects.a.lifecycle]]
at = "1s"
action = "stop"

[[effects.a.lifecycle]]
at = "2s"
action = "start"
"#,
        );
        let report = host.run(Duration::from_secs(3));
        let effect = &report.effects[0];
        assert_eq!(effect.idle_ticks, 1);
        assert_eq!(effect.frames_painted, 60 + 61);
    }

    #[test]
    fn detached_effects_are_unregistered() {
        let mut host = host(
            r#"
version = 1

[effects.a]
shader = "builtin:plasma"

[[effects.a.lifecycle]]
at = "1s"
action = "detach"

[[effects.a.lifecycle]]
at = "2s"
action = "start"
"#,
        );
        let report = host.run(Duration::from_secs(3));
        let effect = &report.effects[0];
        assert!(effect.detached);
        assert_eq!(effect.frames_painted, 60);
        assert!(!host.scheduler.is_registered(&TargetId::new("effect:a")));
    }

    #[test]
    fn compile_errors_are_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.sksl"), "half4 color() {}").unwrap();
        let config = MultiConfig::from_toml_str(
            r#"
version = 1

[effects.bad]
shader = "bad.sksl"
"#,
        )
        .unwrap();
        let mut host = Host::new(
            &config,
            &SourceLoader::new(dir.path()),
            SchedulerSettings::default(),
            60.0,
            ClockChoice::Fixed,
        )
        .unwrap();
        let report = host.run(Duration::from_millis(100));
        let effect = &report.effects[0];
        assert!(effect.frames_painted > 0);
        assert!(effect.program.is_none());
        assert!(effect.error_text.as_deref().unwrap().contains("entry point"));
    }

    #[test]
    fn still_clock_pins_effect_time() {
        let mut host = host_with_clock(DEFAULT_CONFIG, ClockChoice::Still(2.5));
        let report = host.run(Duration::from_millis(500));
        for effect in &report.effects {
            assert!(effect.frames_painted > 0, "{}", effect.name);
            assert_eq!(effect.last_time, Some(2.5));
        }
    }

    #[test]
    fn realtime_clock_follows_wall_time() {
        let mut host = host_with_clock(DEFAULT_CONFIG, ClockChoice::Realtime);
        let report = host.run(Duration::from_millis(100));
        let plasma = &report.effects[0];
        assert_eq!(plasma.frames_painted, 7);
        let time = plasma.last_time.unwrap();
        assert!(time >= 0.0 && time < 60.0, "{time}");
    }

    #[test]
    fn tiny_refresh_rates_do_not_panic() {
        let config = MultiConfig::from_toml_str(DEFAULT_CONFIG).unwrap();
        let mut host = Host::new(
            &config,
            &SourceLoader::new("."),
            SchedulerSettings::with_fps(Some(1e-30)),
            1e-30,
            ClockChoice::Fixed,
        )
        .unwrap();
        let report = host.run(Duration::from_secs(1));
        assert_eq!(report.ticks, 1);
        assert_eq!(report.effects[0].frames_painted, 1);
        assert_eq!(report.effects[0].last_time, Some(0.0));
    }

    #[test]
    fn huge_simulated_spans_end_without_panicking() {
        let config = MultiConfig::from_toml_str(DEFAULT_CONFIG).unwrap();
        let mut host = Host::new(
            &config,
            &SourceLoader::new("."),
            SchedulerSettings::default(),
            1e-18,
            ClockChoice::Fixed,
        )
        .unwrap();
        let report = host.run(Duration::from_secs(18_000_000_000_000_000_000));
        assert!(report.ticks >= 1 && report.ticks <= 19, "{}", report.ticks);
        assert!(report.effects[0].frames_painted >= 1);
        assert!(report.effects[0].detached);
    }
}
