use std::hint::black_box;
use criterion::{criterion_group, criterion_main, Criterion};
use fiberphot::{
    aggregate, butter_lowpass, detect_freezing, detect_intervals, filtfilt, get_epoch_data,
    moving_average, BehaviorConfig, EpochParams, MergedRecord,
};
use ndarray::Array1;
use std::collections::BTreeMap;

/// One hour of 100 Hz photometry.
const N_SIGNAL: usize = 360_000;
/// Ten minutes of 30 fps tracking.
const N_FRAMES: usize = 18_000;

fn signal(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64 * 0.01;
            (0.3 * t).sin() + 0.2 * (13.0 * t).sin() + 0.001 * t
        })
        .collect()
}

fn speeds(n: usize) -> Vec<f64> {
    // 20 s walking / 10 s still
    (0..n).map(|i| if (i / 300) % 3 == 2 { 0.5 } else { 15.0 }).collect()
}

fn bench_filtfilt(c: &mut Criterion) {
    let x = signal(N_SIGNAL);
    let coeffs = butter_lowpass(2, 1.7, 100.0).unwrap();
    c.bench_function("filtfilt butter(2, 1.7 Hz) [1 h @ 100 Hz]", |b| {
        b.iter(|| black_box(filtfilt(black_box(&x), &coeffs)).len())
    });
}

fn bench_baseline(c: &mut Criterion) {
    let x = signal(N_SIGNAL);
    c.bench_function("moving_average w=1000 [1 h @ 100 Hz]", |b| {
        b.iter(|| black_box(moving_average(black_box(&x), 1000).unwrap()).len())
    });
}

fn bench_freezing(c: &mut Criterion) {
    let v = speeds(N_FRAMES);
    let cfg = BehaviorConfig::default();
    c.bench_function("detect_freezing [10 min @ 30 fps]", |b| {
        b.iter(|| black_box(detect_freezing(black_box(&v), &cfg)).len())
    });
}

fn bench_epochs(c: &mut Criterion) {
    let freezing = detect_freezing(&speeds(N_FRAMES), &BehaviorConfig::default());
    let intervals = detect_intervals(&freezing);
    let mut columns = BTreeMap::new();
    columns.insert("ACC.zdFF".to_string(), Array1::from(signal(N_FRAMES)));
    let mut events = BTreeMap::new();
    events.insert("freezing".to_string(), freezing);
    let merged = MergedRecord {
        time: Array1::from_iter((0..N_FRAMES).map(|i| i as f64 / 30.0)),
        ttl: Array1::ones(N_FRAMES),
        columns,
        events,
        fps: 30.0,
    };
    let params = EpochParams::new("ACC", 2.0, 2.0);

    c.bench_function("get_epoch_data + aggregate [±2 s]", |b| {
        b.iter(|| {
            let out = get_epoch_data(&merged, black_box(&intervals), &params).unwrap();
            let traces: Vec<Array1<f64>> = out.epochs.into_iter().map(|e| e.values).collect();
            black_box(aggregate(&traces).unwrap().map(|a| a.n_epochs))
        })
    });
}

criterion_group!(benches, bench_filtfilt, bench_baseline, bench_freezing, bench_epochs);
criterion_main!(benches);
