use anyhow::{Context, Result};
use viewport::fit_viewport;

use crate::cli::PlanArgs;
use crate::report::{FitSummary, PlanReport};

pub fn plan(args: &PlanArgs) -> PlanReport {
    let fit = fit_viewport(args.viewport, args.source, args.stretch, args.direction);
    PlanReport {
        viewport: [args.viewport.width, args.viewport.height],
        source: [args.source.width, args.source.height],
        stretch: args.stretch,
        stretch_direction: args.direction,
        renderable: fit.is_some(),
        fit: fit.map(|fit| FitSummary::new(&fit, args.source)),
    }
}

pub fn run(args: PlanArgs) -> Result<()> {
    let report = plan(&args);
    if args.json {
        let json = serde_json::to_string_pretty(&report).context("failed to encode plan")?;
        println!("{json}");
        return Ok(());
    }

    println!(
        "viewport {}x{}  source {}x{}  stretch={} direction={}",
        report.viewport[0],
        report.viewport[1],
        report.source[0],
        report.source[1],
        report.stretch,
        report.stretch_direction
    );
    let Some(fit) = report.fit else {
        println!("not renderable");
        return Ok(());
    };
    println!("  scale        {:.6} x {:.6}", fit.scale[0], fit.scale[1]);
    println!(
        "  scaled size  {:.3} x {:.3}",
        fit.scaled_size[0], fit.scaled_size[1]
    );
    println!(
        "  dest         ({:.3}, {:.3}) {:.3} x {:.3}",
        fit.dest.x, fit.dest.y, fit.dest.width, fit.dest.height
    );
    println!(
        "  source       ({:.3}, {:.3}) {:.3} x {:.3}{}",
        fit.source.x,
        fit.source.y,
        fit.source.width,
        fit.source.height,
        if fit.clipped { "  (clipped)" } else { "" }
    );
    let [a, b, c, d, e, f] = fit.transform;
    println!("  transform    [{a:.6} {b:.6} {c:.6} {d:.6} {e:.3} {f:.3}]");
    Ok(())
}
