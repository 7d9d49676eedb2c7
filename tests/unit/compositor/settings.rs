use super::*;

#[test]
fn defaults_are_valid() {
    let s = ParallaxSettings::default();
    s.validate().unwrap();
    assert_eq!(s.animation_state(), AnimationState::default());
    assert_eq!(s.video_plan().total_frames(), 8 * 30);
}

#[test]
fn partial_json_fills_defaults() {
    let s = ParallaxSettings::from_json(
        r#"{
            "animation": "vertical_switch",
            "interval_secs": 6.0,
            "blur_intensity": 1.5,
            "depth_convention": "near_is_zero",
            "export_fps": { "num": 24, "den": 1 }
        }"#,
    )
    .unwrap();
    assert_eq!(s.animation, AnimationKind::VerticalSwitch);
    assert_eq!(s.interval_secs, 6.0);
    assert_eq!(s.blur_intensity, 1.5);
    assert_eq!(s.depth_convention, DepthConvention::NearIsZero);
    assert_eq!(s.export_fps.num, 24);
    assert_eq!(s.focal_point, 0.5);
    assert_eq!(s.clear_color, ClearColor::OPAQUE_BLACK);
}

#[test]
fn out_of_range_values_are_rejected() {
    let cases = [
        r#"{ "interval_secs": 0.5 }"#,
        r#"{ "interval_secs": 11 }"#,
        r#"{ "intensity": 0.2 }"#,
        r#"{ "focal_point": -0.1 }"#,
        r#"{ "blur_intensity": 3.5 }"#,
        r#"{ "export_target_secs": 0 }"#,
        r#"{ "clear_color": [0, 0, 2, 1] }"#,
    ];
    for json in cases {
        let err = ParallaxSettings::from_json(json).unwrap_err();
        assert!(
            matches!(err, ParallaxError::Validation(_)),
            "{json}: {err}"
        );
    }
}

#[test]
fn malformed_json_is_a_serde_error() {
    for json in [r#"{ "animation": "spin" }"#, r#"{ "unknown": 1 }"#, "not json"] {
        assert!(matches!(
            ParallaxSettings::from_json(json),
            Err(ParallaxError::Serde(_))
        ));
    }
}

#[test]
fn settings_file_round_trips() {
    let dir = std::env::temp_dir().join(format!("parallaxfx-settings-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("settings.json");

    let s = ParallaxSettings {
        animation: AnimationKind::HorizontalSwitch,
        intensity: 0.08,
        focal_point: 0.25,
        ..ParallaxSettings::default()
    };
    std::fs::write(&path, s.to_json().unwrap()).unwrap();
    assert_eq!(ParallaxSettings::from_path(&path).unwrap(), s);

    let missing = ParallaxSettings::from_path(dir.join("missing.json")).unwrap_err();
    assert!(matches!(missing, ParallaxError::Other(_)));
    let _ = std::fs::remove_dir_all(&dir);
}
