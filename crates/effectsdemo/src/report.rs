use renderer::{FrameArgs, FrameOutcome};
use serde::Serialize;
use viewport::{FitDirection, FitPolicy, Rect, Size, ViewportFit};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RectSummary {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl From<Rect> for RectSummary {
    fn from(rect: Rect) -> Self {
        Self {
            x: rect.x0,
            y: rect.y0,
            width: rect.width(),
            height: rect.height(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitSummary {
    pub scale: [f64; 2],
    pub scaled_size: [f64; 2],
    pub dest: RectSummary,
    pub source: RectSummary,
    /// Affine coefficients `[a, b, c, d, e, f]`.
    pub transform: [f64; 6],
    pub clipped: bool,
}

impl FitSummary {
    pub fn new(fit: &ViewportFit, source_size: Size) -> Self {
        Self {
            scale: [fit.scale.x, fit.scale.y],
            scaled_size: [fit.scaled_size.width, fit.scaled_size.height],
            dest: fit.dest.into(),
            source: fit.source.into(),
            transform: fit.transform.as_coeffs(),
            clipped: fit.is_clipped(source_size),
        }
    }
}

/// Output of `effectsdemo plan`.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub viewport: [f64; 2],
    pub source: [f64; 2],
    pub stretch: FitPolicy,
    pub stretch_direction: FitDirection,
    pub renderable: bool,
    pub fit: Option<FitSummary>,
}

/// Per-effect counters collected by the recording painter.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EffectReport {
    pub name: String,
    pub shader: String,
    pub program: Option<String>,
    pub error_text: Option<String>,
    pub frames_painted: u64,
    pub frames_skipped: u64,
    pub idle_ticks: u64,
    pub last_time: Option<f32>,
    pub last_source_size: Option<[f64; 2]>,
    pub last_fit: Option<FitSummary>,
    pub detached: bool,
}

impl EffectReport {
    pub fn new(name: impl Into<String>, shader: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shader: shader.into(),
            ..Self::default()
        }
    }

    /// Paint callback body: records what the frame would have drawn.
    pub fn record_frame(&mut self, args: &FrameArgs<'_>) {
        self.program = args.program.map(|program| program.name().to_string());
        self.error_text = args.error_text.map(str::to_string);
        self.last_time = Some(args.uniforms.i_time);
        self.last_source_size = Some([args.source_size.width, args.source_size.height]);
        self.last_fit = Some(FitSummary::new(&args.fit, args.source_size));
    }

    pub fn record_outcome(&mut self, outcome: FrameOutcome) {
        match outcome {
            FrameOutcome::Painted => self.frames_painted += 1,
            FrameOutcome::Skipped => self.frames_skipped += 1,
            FrameOutcome::Idle => self.idle_ticks += 1,
            FrameOutcome::Disposed => {}
        }
    }
}

/// Output of `effectsdemo run`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub refresh_rate: f32,
    pub duration_secs: f64,
    pub ticks: u64,
    pub effects: Vec<EffectReport>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewport::fit_viewport;

    #[test]
    fn fit_summary_captures_clipping() {
        let source = Size::new(512.0, 512.0);
        let fit = fit_viewport(
            Size::new(300.0, 300.0),
            source,
            FitPolicy::None,
            FitDirection::Both,
        )
        .unwrap();
        let summary = FitSummary::new(&fit, source);
        assert!(summary.clipped);
        assert_eq!(summary.dest.width, 300.0);
        assert_eq!(summary.source.x, 106.0);
        assert_eq!(summary.transform[0], 1.0);
    }

    #[test]
    fn outcomes_update_counters() {
        let mut report = EffectReport::new("demo", "inline:demo");
        report.record_outcome(FrameOutcome::Painted);
        report.record_outcome(FrameOutcome::Painted);
        report.record_outcome(FrameOutcome::Skipped);
        report.record_outcome(FrameOutcome::Idle);
        report.record_outcome(FrameOutcome::Disposed);
        assert_eq!(report.frames_painted, 2);
        assert_eq!(report.frames_skipped, 1);
        assert_eq!(report.idle_ticks, 1);
    }

    #[test]
    fn plan_report_serializes_policy_names() {
        let report = PlanReport {
            viewport: [1.0, 1.0],
            source: [0.0, 1.0],
            stretch: FitPolicy::UniformToFill,
            stretch_direction: FitDirection::NoScaleUp,
            renderable: false,
            fit: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stretch"], "uniform-to-fill");
        assert_eq!(json["stretch_direction"], "down-only");
        assert!(json["fit"].is_null());
    }
}
