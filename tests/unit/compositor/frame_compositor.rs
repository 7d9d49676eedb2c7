use std::sync::Arc;

use image::{Rgba, RgbaImage};
use parking_lot::Mutex;

use super::*;
use crate::{
    assets::parallax_image::{DepthConvention, DepthMap},
    export::{events::ExportEvent, sink::InMemoryExportSink},
};

const COLOR: [u8; 4] = [200, 100, 50, 255];

fn solid_image(size: Size2, depth: f32) -> Arc<ParallaxImage> {
    let diffuse = RgbaImage::from_pixel(size.width, size.height, Rgba(COLOR));
    Arc::new(ParallaxImage::new(diffuse, DepthMap::filled(size, depth).unwrap()).unwrap())
}

fn compositor() -> (FrameCompositor, InMemoryExportSink) {
    let sink = InMemoryExportSink::new();
    let comp =
        FrameCompositor::new(&ParallaxSettings::default(), Box::new(sink.clone())).unwrap();
    (comp, sink)
}

fn ready_compositor(size: Size2) -> (FrameCompositor, InMemoryExportSink) {
    let (mut comp, sink) = compositor();
    comp.set_image(solid_image(size, 0.5)).unwrap();
    comp.resize(size).unwrap();
    (comp, sink)
}

fn assert_solid(frame: &FrameRGBA, px: [u8; 4]) {
    assert!(!frame.is_degenerate());
    for chunk in frame.data.chunks_exact(4) {
        assert_eq!(chunk, px);
    }
}

#[test]
fn frames_are_skipped_until_image_and_size_exist() {
    let (mut comp, _) = compositor();
    assert_eq!(comp.draw(0.0), FrameOutcome::Skipped(SkipReason::NoImage));
    comp.set_image(solid_image(Size2::new(2, 2), 0.5)).unwrap();
    assert_eq!(comp.draw(0.0), FrameOutcome::Skipped(SkipReason::NoSurface));
    comp.resize(Size2::new(2, 2)).unwrap();
    assert_eq!(comp.draw(0.0), FrameOutcome::Presented);
    assert_eq!(comp.frame_index(), 1);
}

#[test]
fn solid_image_renders_unchanged_with_and_without_blur() {
    let (mut comp, _) = ready_compositor(Size2::new(2, 2));
    assert_eq!(comp.draw(0.3), FrameOutcome::Presented);
    assert_solid(&comp.snapshot().unwrap(), COLOR);

    assert!(comp.set_blur_intensity(2.0).unwrap());
    assert_eq!(comp.draw(1.1), FrameOutcome::Presented);
    assert_solid(&comp.snapshot().unwrap(), COLOR);
    assert!(comp.drawable().unwrap().present_count() >= 1);
}

#[test]
fn depth_display_shows_reprojected_depth() {
    let (mut comp, _) = ready_compositor(Size2::new(2, 2));
    assert!(comp.set_show_depth(true));
    comp.draw(0.0);
    assert_solid(&comp.snapshot().unwrap(), [128, 128, 128, 255]);
}

#[test]
fn resize_is_idempotent_and_zero_drops_targets() {
    let (mut comp, _) = ready_compositor(Size2::new(4, 2));
    assert!(!comp.resize(Size2::new(4, 2)).unwrap());
    let before = comp.drawable().unwrap().texture().id();
    assert!(!comp.resize(Size2::new(4, 2)).unwrap());
    assert_eq!(comp.drawable().unwrap().texture().id(), before);

    assert!(comp.resize(Size2::new(0, 0)).unwrap());
    assert!(comp.drawable().is_none());
    assert_eq!(comp.draw(0.0), FrameOutcome::Skipped(SkipReason::NoSurface));

    assert!(comp.resize(Size2::new(6, 4)).unwrap());
    assert_eq!(comp.drawable().unwrap().texture().size(), Size2::new(6, 4));
    assert_eq!(comp.draw(0.0), FrameOutcome::Presented);
}

#[test]
fn resize_to_fill_keeps_the_image_aspect() {
    let (mut comp, _) = compositor();
    assert!(comp.resize_to_fill(Size2::new(10, 10)).is_err());
    comp.set_image(solid_image(Size2::new(4, 2), 0.5)).unwrap();
    assert!(comp.resize_to_fill(Size2::new(10, 10)).unwrap());
    assert_eq!(comp.size(), Size2::new(20, 10));
    assert!(!comp.resize_to_fill(Size2::new(10, 10)).unwrap());
}

#[test]
fn setters_report_changes_once() {
    let (mut comp, _) = compositor();
    assert!(comp.set_focal_point(0.7).unwrap());
    assert!(!comp.set_focal_point(0.7).unwrap());
    assert!(!comp.set_blur_intensity(0.0).unwrap());
    assert!(comp.set_animation_interval(6.0).unwrap());
    assert!(!comp.set_animation_interval(6.0).unwrap());
    assert!(comp.set_animation_kind(AnimationKind::VerticalSwitch));
    assert!(!comp.set_animation_kind(AnimationKind::VerticalSwitch));
    assert!(comp.set_paused(true));
    assert!(!comp.set_paused(true));
    assert!(!comp.set_clear_color(ClearColor::OPAQUE_BLACK));

    let image = solid_image(Size2::new(2, 2), 0.5);
    assert!(comp.set_image(Arc::clone(&image)).unwrap());
    assert!(!comp.set_image(solid_image(Size2::new(2, 2), 0.5)).unwrap());

    let settings = ParallaxSettings {
        focal_point: 0.7,
        interval_secs: 6.0,
        animation: AnimationKind::VerticalSwitch,
        ..ParallaxSettings::default()
    };
    assert!(!comp.apply_settings(&settings).unwrap());

    let load_time_only = ParallaxSettings {
        depth_convention: DepthConvention::NearIsZero,
        display_fps: Fps::new(30, 1).unwrap(),
        ..settings
    };
    assert!(!comp.apply_settings(&load_time_only).unwrap());
}

#[test]
fn parameter_setters_reject_out_of_range_values() {
    let (mut comp, _) = compositor();
    for bad in [f32::NAN, f32::INFINITY, -0.1, 7.5] {
        assert!(matches!(
            comp.set_focal_point(bad),
            Err(ParallaxError::Validation(_))
        ));
    }
    assert_eq!(comp.focal_point(), 0.5);

    for bad in [f32::NAN, -1.0, 3.5, 1e9] {
        assert!(comp.set_blur_intensity(bad).is_err());
    }
    assert_eq!(comp.blur_intensity(), 0.0);

    assert!(comp.set_animation_interval(0.5).is_err());
    assert!(comp.set_animation_interval(f64::NAN).is_err());
    assert!(comp.set_animation_intensity(0.2).is_err());
    assert!(comp.set_animation_intensity(-0.01).is_err());
    assert!(!comp.set_animation_intensity(0.05).unwrap());

    let err = comp.set_focal_point(7.5).unwrap_err();
    assert!(err.to_string().contains("focal_point"));
}

#[test]
fn pause_freezes_the_offset() {
    let (mut comp, _) = ready_compositor(Size2::new(2, 2));
    comp.draw(0.7);
    let held = comp.offset();
    comp.set_paused(true);
    comp.draw(2.3);
    assert_eq!(comp.offset(), held);
    comp.set_paused(false);
    comp.draw(2.3);
    assert_ne!(comp.offset(), held);
}

#[test]
fn still_export_captures_diffuse_then_depth() {
    let (mut comp, sink) = ready_compositor(Size2::new(2, 2));
    let events = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&events);
    comp.set_export_observer(Some(Box::new(move |e: &ExportEvent| log.lock().push(e.clone()))));

    assert!(comp.begin_still_export());
    assert!(comp.is_saving_to_photos());
    assert!(!comp.begin_still_export());
    assert_eq!(comp.offset_state(), OffsetState::Exporting);
    assert!(!comp.pan(PanPhase::Began, Vec2::new(5.0, 0.0), Size2::new(100, 100)));

    comp.draw(0.0);
    comp.draw(0.1);

    assert!(!comp.is_saving_to_photos());
    assert_eq!(comp.offset_state(), OffsetState::IdleAnimating);
    let stills = sink.stills();
    assert_eq!(stills.len(), 1);
    assert_solid(&stills[0].diffuse, COLOR);
    assert_solid(&stills[0].depth, [128, 128, 128, 255]);
    assert_eq!(events.lock().last(), Some(&ExportEvent::Finished));
    assert!(!comp.show_depth());
}

#[test]
fn exports_need_an_image_and_a_surface() {
    let (mut comp, _) = compositor();
    assert!(!comp.begin_still_export());
    assert!(!comp.begin_video_export());
    comp.set_image(solid_image(Size2::new(5, 3), 0.5)).unwrap();
    assert!(!comp.begin_still_export());
    assert!(!comp.begin_video_export());
    comp.resize(Size2::new(5, 3)).unwrap();
    assert!(comp.begin_video_export());
}

#[test]
fn replacing_the_image_cancels_an_export() {
    let (mut comp, sink) = ready_compositor(Size2::new(2, 2));
    assert!(comp.begin_video_export());
    comp.draw(0.0);
    comp.set_image(solid_image(Size2::new(2, 2), 0.2)).unwrap();
    assert!(!comp.is_saving_to_video());
    assert_eq!(comp.offset_state(), OffsetState::IdleAnimating);
    assert!(sink.videos().is_empty());
}

#[test]
fn at_most_one_frame_in_flight() {
    let (mut comp, _) = ready_compositor(Size2::new(8, 8));
    comp.set_blur_intensity(3.0).unwrap();
    for i in 0..5 {
        comp.draw(f64::from(i) * 0.016);
        assert!(comp.semaphore.available() <= 1);
    }
    comp.wait_idle();
    assert_eq!(comp.semaphore.available(), 1);
}
