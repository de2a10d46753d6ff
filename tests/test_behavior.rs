mod common;
use common::{tracking_csv, walking_mouse, CAMERA_FPS};
use fiberphot::behavior::{detect_freezing, load_behavior};
use fiberphot::events::detect_intervals;
use fiberphot::{BehaviorConfig, Error};

#[test]
fn square_velocity_dip_is_one_bout() {
    // 1000 samples, velocity far below threshold on 200..400.
    let mut v = vec![20.0; 1000];
    for s in &mut v[200..400] {
        *s = 1.0;
    }
    let freezing = detect_freezing(&v, &BehaviorConfig::default());
    let bouts = detect_intervals(&freezing);
    assert_eq!(bouts.len(), 1, "{bouts:?}");
    let b = bouts[0];
    assert!(b.onset.abs_diff(200) <= 5, "onset {}", b.onset);
    assert!(b.offset.abs_diff(400) <= 5, "offset {}", b.offset);
    assert!(!b.is_truncated());
}

#[test]
fn walking_mouse_freezes_twice() {
    let dir = tempfile::tempdir().unwrap();
    let p = walking_mouse(dir.path(), "Behavior.csv", 1800);
    let frame = load_behavior(&p, &BehaviorConfig::default()).unwrap();

    assert_eq!(frame.len(), 1800);
    assert_eq!(frame.velocity.len(), 1800);
    assert_eq!(frame.freezing.len(), 1800);
    assert!(frame.parts.contains_key("middle tail"));
    approx::assert_abs_diff_eq!(frame.time[30], 1.0, epsilon = 1e-12);
    assert_eq!(frame.fps, CAMERA_FPS);

    let bouts = detect_intervals(&frame.freezing);
    assert_eq!(bouts.len(), 2, "{bouts:?}");
    // The 60-frame position kernel delays onset and advances offset by
    // about half its width.
    assert!(bouts[0].onset >= 600 && bouts[0].onset <= 640, "{bouts:?}");
    assert!(bouts[0].offset >= 860 && bouts[0].offset <= 900, "{bouts:?}");
    assert!(bouts[1].onset >= 1200 && bouts[1].onset <= 1240, "{bouts:?}");
}

#[test]
fn missing_body_part_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let p = tracking_csv(dir.path(), "b.csv", &[("head", vec![1.0, 2.0], vec![1.0, 2.0])]);
    match load_behavior(&p, &BehaviorConfig::default()) {
        Err(Error::MissingColumn { column, .. }) => assert_eq!(column, "base tail"),
        other => panic!("expected MissingColumn, got {other:?}"),
    }
}

#[test]
fn optional_parts_are_configurable() {
    let dir = tempfile::tempdir().unwrap();
    let xs: Vec<f64> = (0..50).map(|i| i as f64).collect();
    let p = tracking_csv(
        dir.path(),
        "b.csv",
        &[("nose", xs.clone(), xs.clone()), ("tailbase", xs.clone(), xs)],
    );
    let cfg = BehaviorConfig {
        head: "nose".into(),
        base: "tailbase".into(),
        extra_parts: vec![],
        ..BehaviorConfig::default()
    };
    let frame = load_behavior(&p, &cfg).unwrap();
    assert_eq!(frame.len(), 50);
}

#[test]
fn header_only_file_is_empty_input() {
    let dir = tempfile::tempdir().unwrap();
    let p = tracking_csv(
        dir.path(),
        "b.csv",
        &[("head", vec![], vec![]), ("base tail", vec![], vec![])],
    );
    assert!(matches!(
        load_behavior(&p, &BehaviorConfig::default()),
        Err(Error::EmptyInput { .. })
    ));
}
