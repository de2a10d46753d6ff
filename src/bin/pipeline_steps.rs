/// pipeline_steps: run each stage of the single-recording pipeline with
/// timings and write the merged frame to CSV for comparison against other
/// implementations.
///
/// Output columns:
///   Time(s)          seconds on the centisecond grid
///   ttl              binned TTL (min per bin)
///   {Region}.signal  z-scored signal channel
///   {Region}.control z-scored control channel
///   {Region}.zdFF    zdFF
///   velocity         movement velocity
///   {part}_x/_y      tracked coordinates
///   freezing         0 / 1
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use fiberphot::{
    behavior::load_behavior,
    config::PipelineConfig,
    events::get_event_intervals,
    io::write_merged_csv,
    merge::{merge, FREEZING},
    normalize::normalize,
    photometry::load_signal,
};

#[derive(Parser, Debug)]
#[command(name = "pipeline_steps")]
struct Args {
    /// Photometry CSV.
    #[arg(long)]
    photometry: PathBuf,

    /// DeepLabCut tracking CSV.
    #[arg(long)]
    behavior: PathBuf,

    /// Merged CSV output path.
    #[arg(long)]
    output: PathBuf,

    /// Pipeline configuration (JSON); defaults when omitted.
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

    // ── 1. Photometry ──────────────────────────────────────────────────────
    let t_sig = now();
    let signal = load_signal(&args.photometry, &cfg.photometry)
        .with_context(|| format!("loading {}", args.photometry.display()))?;
    let ms_sig = t_sig.elapsed().as_secs_f64() * 1000.0;
    let n_bins = signal.len();

    // ── 2. Normalise ───────────────────────────────────────────────────────
    let t_norm = now();
    let outcome = normalize(signal, &cfg.normalize)?;
    let ms_norm = t_norm.elapsed().as_secs_f64() * 1000.0;

    // ── 3. Behavior ────────────────────────────────────────────────────────
    let t_beh = now();
    let behavior = load_behavior(&args.behavior, &cfg.behavior)
        .with_context(|| format!("loading {}", args.behavior.display()))?;
    let ms_beh = t_beh.elapsed().as_secs_f64() * 1000.0;
    let n_frames = behavior.len();

    // ── 4. Merge ───────────────────────────────────────────────────────────
    let t_merge = now();
    let merged = merge(outcome.frame, behavior, &cfg.merge)?;
    let ms_merge = t_merge.elapsed().as_secs_f64() * 1000.0;

    // ── 5. Events ──────────────────────────────────────────────────────────
    let t_ev = now();
    let bouts = get_event_intervals(&merged, FREEZING, None)?;
    let ms_ev = t_ev.elapsed().as_secs_f64() * 1000.0;

    eprintln!(
        "TIMING signal={ms_sig:.4}ms normalize={ms_norm:.4}ms behavior={ms_beh:.4}ms \
         merge={ms_merge:.4}ms events={ms_ev:.4}ms",
    );
    eprintln!(
        "  {n_bins} bins  {n_frames} frames  {} merged rows @ {} fps  {} freezing bouts  {} failed region(s)",
        merged.len(),
        merged.fps,
        bouts.len(),
        outcome.failed.len()
    );

    // ── 6. Write output ────────────────────────────────────────────────────
    eprintln!("Writing → {}", args.output.display());
    write_merged_csv(&merged, &args.output)?;
    eprintln!("Done.");
    Ok(())
}

#[inline(always)]
fn now() -> std::time::Instant {
    std::time::Instant::now()
}
