use super::*;

#[test]
fn progress_is_half_at_interval_multiples() {
    let a = AnimationState::default();
    assert_eq!(a.progress_at(0.0), 0.5);
    assert!((a.progress_at(8.0) - 0.5).abs() < 1e-12);
    assert!((a.progress_at(1.0) - 0.75).abs() < 1e-12);
    assert!((a.progress_at(3.0) - 0.25).abs() < 1e-12);
    for i in 0..100 {
        let p = a.progress_at(f64::from(i) * 0.173);
        assert!((0.0..=1.0).contains(&p));
    }
}

#[test]
fn degenerate_interval_holds_progress() {
    let a = AnimationState {
        interval_secs: 0.0,
        ..AnimationState::default()
    };
    assert_eq!(a.progress_at(12.3), 0.5);
}

#[test]
fn pan_scales_and_clamps() {
    let view = Size2::new(300, 600);
    let o = pan_offset(Vec2::new(30.0, -60.0), view);
    assert!((o.x - 0.03).abs() < 1e-12);
    assert!((o.y + 0.03).abs() < 1e-12);
    let far = pan_offset(Vec2::new(3000.0, -6000.0), view);
    assert_eq!(far, Vec2::new(0.06, -0.06));
    assert_eq!(pan_offset(Vec2::new(5.0, 5.0), Size2::new(0, 10)), Vec2::ZERO);
}

#[test]
fn drag_suspends_and_resumes_animation() {
    let mut c = OffsetController::new(AnimationState::default());
    let idle = c.tick(1.0);
    assert!(idle.length() > 0.0);

    assert!(c.pan(PanPhase::Began, Vec2::ZERO, Size2::new(100, 100)));
    assert_eq!(c.state(), OffsetState::UserDragging);
    assert!(c.pan(PanPhase::Changed, Vec2::new(10.0, 0.0), Size2::new(100, 100)));
    let held = c.tick(2.0);
    assert!((held.x - 0.03).abs() < 1e-12);
    assert_eq!(c.tick(3.0), held);

    assert!(c.pan(PanPhase::Ended, Vec2::new(10.0, 0.0), Size2::new(100, 100)));
    assert_eq!(c.state(), OffsetState::IdleAnimating);
    assert!(!c.is_dragging());
    assert_eq!(c.tick(1.0), idle);
}

#[test]
fn pause_freezes_the_offset() {
    let mut c = OffsetController::new(AnimationState::default());
    let before = c.tick(1.0);
    assert!(c.set_paused(true));
    assert!(!c.set_paused(true));
    assert_eq!(c.tick(2.5), before);
    assert!(c.set_paused(false));
    assert_ne!(c.tick(2.5), before);
}

#[test]
fn export_owns_the_offset_until_it_ends() {
    let mut c = OffsetController::new(AnimationState::default());
    assert!(c.begin_export());
    assert!(!c.begin_export());
    assert!(!c.pan(PanPhase::Began, Vec2::new(50.0, 0.0), Size2::new(100, 100)));
    c.set_export_offset(Vec2::new(0.01, 0.02));
    assert_eq!(c.tick(1.0), Vec2::new(0.01, 0.02));
    c.end_export();
    assert_eq!(c.state(), OffsetState::IdleAnimating);
    c.set_export_offset(Vec2::new(0.5, 0.5));
    assert_eq!(c.offset(), Vec2::new(0.01, 0.02));
}

#[test]
fn setters_report_changes() {
    let mut c = OffsetController::new(AnimationState::default());
    assert!(!c.set_kind(AnimationKind::TurnTable));
    assert!(c.set_kind(AnimationKind::VerticalSwitch));
    assert!(!c.set_interval_secs(4.0));
    assert!(c.set_interval_secs(6.0));
    assert!(c.set_intensity(0.08));
    assert_eq!(c.animation().kind, AnimationKind::VerticalSwitch);
}
