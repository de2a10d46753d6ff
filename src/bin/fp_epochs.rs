use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use fiberphot::{
    aggregate, get_epoch_average, get_epoch_data, get_event_intervals, io::write_epochs_csv,
    process_session, Anchor, EpochParams, PipelineConfig,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AnchorArg {
    On,
    Off,
}

impl From<AnchorArg> for Anchor {
    fn from(a: AnchorArg) -> Self {
        match a {
            AnchorArg::On => Anchor::On,
            AnchorArg::Off => Anchor::Off,
        }
    }
}

#[derive(Parser)]
#[command(name = "fp-epochs", about = "Event-locked zdFF epochs for one recording")]
struct Args {
    /// Photometry CSV
    #[arg(long)]
    photometry: PathBuf,

    /// DeepLabCut tracking CSV
    #[arg(long)]
    behavior: PathBuf,

    /// Epochs CSV output path
    #[arg(long)]
    output: PathBuf,

    /// Region whose zdFF is extracted
    #[arg(long, default_value = "ACC")]
    region: String,

    /// Event column
    #[arg(long, default_value = "freezing")]
    event: String,

    /// Seconds before the anchor
    #[arg(long, default_value_t = 2.0)]
    before: f64,

    /// Seconds after the anchor
    #[arg(long, default_value_t = 2.0)]
    after: f64,

    #[arg(long, value_enum, default_value_t = AnchorArg::On)]
    anchor: AnchorArg,

    /// Reject close and short events
    #[arg(long)]
    filter: bool,

    /// Fuse events separated by less than this many seconds
    #[arg(long)]
    merge_gap: Option<f64>,

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

    let merged = process_session(&args.photometry, &args.behavior, &cfg)
        .with_context(|| format!("processing {}", args.photometry.display()))?;
    let intervals = get_event_intervals(&merged, &args.event, args.merge_gap)?;
    println!("{} '{}' interval(s) in {} rows", intervals.len(), args.event, merged.len());

    let params = EpochParams::new(&args.region, args.before, args.after)
        .with_anchor(args.anchor.into())
        .with_filter(args.filter);
    let extraction = get_epoch_data(&merged, &intervals, &params)?;
    let averages = get_epoch_average(&merged, &intervals, &params)?;
    println!(
        "Kept {} epoch(s); dropped {} too close, {} too short, {} out of bounds",
        extraction.epochs.len(),
        extraction.dropped.too_close,
        extraction.dropped.too_short,
        extraction.dropped.out_of_bounds
    );

    write_epochs_csv(&extraction.epochs, params.before_frames(merged.fps), merged.fps, &args.output)?;
    println!("Written → {}", args.output.display());

    let traces: Vec<_> = extraction.epochs.into_iter().map(|e| e.values).collect();
    match aggregate(&traces)? {
        Some(agg) => {
            let peak = agg.mean.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let trough = agg.mean.iter().cloned().fold(f64::INFINITY, f64::min);
            println!("Mean trace: {} samples, range [{trough:.3}, {peak:.3}]", agg.len());
        }
        None => println!("No epochs: nothing to average"),
    }
    for a in &averages {
        println!("  [{:>6}, {:>6})  mean zdFF {:+.3}", a.bounds.0, a.bounds.1, a.value);
    }
    Ok(())
}
