use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use fiberphot::{
    aggregate_groups, discover_sessions, group_epochs, io::write_aggregates_csv,
    summarize_scalars, Anchor, Assignments, EpochParams, PipelineConfig, SessionLayout,
    SessionStore,
};
use ndarray::Array1;

#[derive(Parser)]
#[command(name = "fp-average", about = "Group-averaged zdFF around freezing onsets and offsets")]
struct Args {
    /// Directory with one sub-directory per mouse
    #[arg(long)]
    data_dir: PathBuf,

    /// Mouse → group assignments (JSON)
    #[arg(long)]
    assignments: PathBuf,

    /// Output directory for `{region}_{on|off}.csv`
    #[arg(long)]
    out_dir: PathBuf,

    /// Regions to extract (comma-separated)
    #[arg(long, default_value = "ACC,ADN")]
    regions: String,

    #[arg(long, default_value = "freezing")]
    event: String,

    #[arg(long, default_value_t = 2.0)]
    before: f64,

    #[arg(long, default_value_t = 2.0)]
    after: f64,

    /// Reject close and short events
    #[arg(long)]
    filter: bool,

    /// Pipeline configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let cfg = match &args.config {
        Some(p) => PipelineConfig::from_json_file(p)
            .with_context(|| format!("reading config {}", p.display()))?,
        None => PipelineConfig::default(),
    };
    let assignments = Assignments::load(&args.assignments)
        .with_context(|| format!("reading {}", args.assignments.display()))?;

    let sessions = discover_sessions(&args.data_dir, &SessionLayout::default())?;
    let mut store = SessionStore::new(cfg);
    for s in &sessions {
        if let Err(e) = store.get_or_load(s) {
            eprintln!("Skipping {}: {e}", s.mouse);
        }
    }
    println!("Loaded {} of {} session(s)", store.len(), sessions.len());

    std::fs::create_dir_all(&args.out_dir)?;
    for region in args.regions.split(',').map(str::trim).filter(|r| !r.is_empty()) {
        for (tag, anchor) in [("on", Anchor::On), ("off", Anchor::Off)] {
            let params = EpochParams::new(region, args.before, args.after)
                .with_anchor(anchor)
                .with_filter(args.filter);
            let grouped = group_epochs(store.records(), &assignments, &args.event, None, &params);
            let Some(fps) = grouped.fps else {
                println!("{region} {tag}: no data for the assigned groups");
                continue;
            };

            let stats = aggregate_groups(&grouped.traces)?;
            let before = params.before_frames(fps);
            let time = Array1::from_iter(
                (0..params.window_len(fps)).map(|k| (k as f64 - before as f64) / fps),
            );
            let mut traces: Vec<(String, Option<&_>)> = stats
                .groups
                .iter()
                .map(|(label, agg)| (label.clone(), agg.as_ref()))
                .collect();
            traces.push(("overall".to_string(), stats.overall.as_ref()));

            let path = args.out_dir.join(format!("{region}_{tag}.csv"));
            write_aggregates_csv(&traces, &time, &path)?;
            println!("{region} {tag}: written → {}", path.display());

            // before-vs-after magnitude: per-epoch time means per group
            for (label, s) in summarize_scalars(&grouped.averages) {
                let mean = s.mean.map_or("no data".to_string(), |m| format!("{m:+.3}"));
                println!("  {label:<12} {mean} (n = {})", s.values.len());
            }
        }
    }
    Ok(())
}
