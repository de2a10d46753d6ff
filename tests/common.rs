/// Shared helpers: synthetic recordings written to temporary directories.
use fiberphot::MergedRecord;
use ndarray::Array1;
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Raw photometry sample period (200 Hz, two raw rows per 10 ms bin).
#[allow(unused)]
pub const RAW_DT: f64 = 0.005;

/// Tracking frame rate.
#[allow(unused)]
pub const CAMERA_FPS: f64 = 30.0;

/// Frozen frame ranges of the synthetic mouse.
#[allow(unused)]
pub const FREEZES: [(usize, usize); 2] = [(600, 900), (1200, 1500)];

#[allow(unused)]
/// Write a single-header photometry CSV.
pub fn photometry_csv(dir: &Path, name: &str, time: &[f64], columns: &[(&str, Vec<f64>)]) -> PathBuf {
    let mut body = String::from("Time(s)");
    for (c, _) in columns {
        body.push(',');
        body.push_str(c);
    }
    body.push('\n');
    for (i, t) in time.iter().enumerate() {
        write!(body, "{t:.4}").unwrap();
        for (_, v) in columns {
            write!(body, ",{}", v[i]).unwrap();
        }
        body.push('\n');
    }
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

#[allow(unused)]
/// A `secs`-long Doric-layout recording at 200 Hz with two regions and an
/// armed TTL. `sign` flips every optical channel.
pub fn doric_recording(dir: &Path, name: &str, secs: f64, sign: f64) -> PathBuf {
    let n = (secs / RAW_DT) as usize;
    let time: Vec<f64> = (0..n).map(|i| i as f64 * RAW_DT).collect();
    let wave = |amp: f64, f: f64, drift: f64, offset: f64| -> Vec<f64> {
        time.iter()
            .map(|&t| sign * (offset + drift * t + amp * (2.0 * PI * f * t).sin()))
            .collect()
    };
    photometry_csv(
        dir,
        name,
        &time,
        &[
            ("AIn-1 - Dem (AOut-1)", wave(0.05, 0.11, 0.004, 0.5)),
            ("AIn-1 - Dem (AOut-2)", wave(0.20, 0.30, 0.010, 1.0)),
            ("AIn-2 - Dem (AOut-1)", wave(0.04, 0.07, 0.003, 0.4)),
            ("AIn-2 - Dem (AOut-2)", wave(0.15, 0.23, 0.008, 0.9)),
            ("AOut-1", vec![1.0; n]),
        ],
    )
}

#[allow(unused)]
/// Write a DeepLabCut CSV (scorer / bodyparts / coords header rows).
pub fn tracking_csv(dir: &Path, name: &str, parts: &[(&str, Vec<f64>, Vec<f64>)]) -> PathBuf {
    let mut rows = [String::from("scorer"), String::from("bodyparts"), String::from("coords")];
    for (p, _, _) in parts {
        for axis in ["x", "y", "likelihood"] {
            rows[0].push_str(",DLC_resnet50");
            write!(rows[1], ",{p}").unwrap();
            write!(rows[2], ",{axis}").unwrap();
        }
    }
    let mut body = rows.join("\n");
    body.push('\n');
    let n = parts.first().map_or(0, |p| p.1.len());
    for i in 0..n {
        write!(body, "{i}").unwrap();
        for (_, x, y) in parts {
            write!(body, ",{},{},0.99", x[i], y[i]).unwrap();
        }
        body.push('\n');
    }
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

#[allow(unused)]
/// A mouse walking at 2 px/frame along x, standing still during
/// [`FREEZES`].
pub fn walking_mouse(dir: &Path, name: &str, frames: usize) -> PathBuf {
    let mut x = Vec::with_capacity(frames);
    let mut pos = 100.0;
    for i in 0..frames {
        if !FREEZES.iter().any(|&(a, b)| i >= a && i < b) {
            pos += 2.0;
        }
        x.push(pos);
    }
    let y = vec![50.0; frames];
    let tail: Vec<f64> = x.iter().map(|v| v - 30.0).collect();
    let mid: Vec<f64> = x.iter().map(|v| v - 15.0).collect();
    tracking_csv(
        dir,
        name,
        &[
            ("head", x, y.clone()),
            ("middle tail", mid, y.clone()),
            ("base tail", tail, y),
        ],
    )
}

#[allow(unused)]
/// Session directory `{dir}/{mouse}/` with `{mouse}.csv` and
/// `Behavior.csv`.
pub fn session_dir(dir: &Path, mouse: &str, secs: f64, sign: f64) -> PathBuf {
    let d = dir.join(mouse);
    std::fs::create_dir_all(&d).unwrap();
    doric_recording(&d, &format!("{mouse}.csv"), secs, sign);
    walking_mouse(&d, "Behavior.csv", (secs * CAMERA_FPS) as usize);
    d
}

#[allow(unused)]
/// Merged record with a single `ACC.zdFF` column and a `freezing` event.
pub fn record(zdff: Vec<f64>, freezing: Vec<bool>, fps: f64) -> MergedRecord {
    let n = zdff.len();
    let mut columns = BTreeMap::new();
    columns.insert("ACC.zdFF".to_string(), Array1::from(zdff));
    let mut events = BTreeMap::new();
    events.insert("freezing".to_string(), freezing);
    MergedRecord {
        time: Array1::from_iter((0..n).map(|i| i as f64 / fps)),
        ttl: Array1::ones(n),
        columns,
        events,
        fps,
    }
}

#[allow(unused)]
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "length mismatch");
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
}
