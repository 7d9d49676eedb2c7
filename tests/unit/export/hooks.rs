use std::sync::Arc;

use parking_lot::Mutex;

use super::*;
use crate::{
    animation::kind::AnimationKind,
    export::sink::InMemoryExportSink,
    foundation::core::{Fps, Vec2},
};

fn frame(v: u8) -> FrameRGBA {
    FrameRGBA {
        width: 2,
        height: 2,
        data: vec![v; 16],
        premultiplied: false,
    }
}

fn recording_hooks() -> (ExportHooks, InMemoryExportSink, Arc<Mutex<Vec<ExportEvent>>>) {
    let sink = InMemoryExportSink::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let mut hooks = ExportHooks::new(Box::new(sink.clone()));
    let log = Arc::clone(&events);
    hooks.set_observer(Some(Box::new(move |e: &ExportEvent| log.lock().push(e.clone()))));
    (hooks, sink, events)
}

fn small_plan() -> VideoExportPlan {
    VideoExportPlan {
        kind: AnimationKind::HorizontalSwitch,
        interval_secs: 1.0,
        intensity: 0.05,
        fps: Fps::new(3, 1).unwrap(),
        target_secs: 1.0,
    }
}

#[test]
fn still_export_saves_once_and_reports_in_order() {
    let (mut hooks, sink, events) = recording_hooks();
    assert!(hooks.begin_still());
    assert!(hooks.is_saving_to_photos());

    let d = hooks.before_frame().unwrap();
    assert!(!d.show_depth);
    assert!(!hooks.after_frame(Some(frame(10))));
    let d = hooks.before_frame().unwrap();
    assert!(d.show_depth);
    assert!(hooks.after_frame(Some(frame(20))));

    assert!(!hooks.is_active());
    assert_eq!(
        *events.lock(),
        vec![
            ExportEvent::Rendering(50.0),
            ExportEvent::Rendering(100.0),
            ExportEvent::Saving,
            ExportEvent::Finished,
        ]
    );
    let stills = sink.stills();
    assert_eq!(stills.len(), 1);
    assert_eq!(stills[0].diffuse, frame(10));
    assert_eq!(stills[0].depth, frame(20));
    assert!(hooks.before_frame().is_none());
}

#[test]
fn second_trigger_is_ignored_while_running() {
    let (mut hooks, _sink, events) = recording_hooks();
    assert!(hooks.begin_still());
    assert!(!hooks.begin_still());
    assert!(!hooks.begin_video(&small_plan()));
    assert!(!hooks.is_saving_to_video());
    assert_eq!(hooks.active_kind(), Some(ExportKind::Still));
    assert!(events.lock().is_empty());
}

#[test]
fn video_export_walks_the_queue() {
    let (mut hooks, sink, events) = recording_hooks();
    assert!(hooks.begin_video(&small_plan()));
    assert!(hooks.is_saving_to_video());

    let mut offsets = Vec::new();
    let mut done = false;
    let mut n = 0u8;
    while !done {
        let d = hooks.before_frame().unwrap();
        offsets.push(d.offset);
        n += 1;
        done = hooks.after_frame(Some(frame(n)));
    }
    assert_eq!(offsets.len(), 3);
    assert_eq!(offsets[0], Vec2::ZERO);
    assert!(offsets.iter().all(|o| o.y == 0.0));

    let log = events.lock();
    let pcts: Vec<f64> = log
        .iter()
        .filter_map(|e| match e {
            ExportEvent::Rendering(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(pcts.len(), 3);
    assert!(pcts.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(log[log.len() - 2], ExportEvent::Saving);
    assert_eq!(log[log.len() - 1], ExportEvent::Finished);

    let videos = sink.videos();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].frames.len(), 3);
    assert_eq!(videos[0].fps, Fps::new(3, 1).unwrap());
}

#[test]
fn missing_snapshot_fails_without_saving_and_allows_retry() {
    let (mut hooks, sink, events) = recording_hooks();
    hooks.begin_still();
    hooks.before_frame();
    assert!(hooks.after_frame(None));
    assert!(!hooks.is_active());
    assert!(matches!(events.lock().last(), Some(ExportEvent::Failed(_))));
    assert!(!events.lock().contains(&ExportEvent::Saving));
    assert!(sink.stills().is_empty());

    assert!(hooks.begin_still());
}

#[test]
fn sink_error_surfaces_as_failed() {
    let (mut hooks, sink, events) = recording_hooks();
    sink.set_failure(Some("library unavailable"));
    hooks.begin_still();
    hooks.before_frame();
    hooks.after_frame(Some(frame(1)));
    hooks.before_frame();
    assert!(hooks.after_frame(Some(frame(2))));

    let log = events.lock();
    assert_eq!(log[log.len() - 2], ExportEvent::Saving);
    assert_eq!(
        log[log.len() - 1],
        ExportEvent::Failed("export error: library unavailable".to_string())
    );
    assert!(!hooks.is_saving_to_photos());
}

#[test]
fn empty_video_plan_fails_immediately() {
    let (mut hooks, _sink, events) = recording_hooks();
    let plan = VideoExportPlan {
        interval_secs: 0.0,
        ..small_plan()
    };
    assert!(!hooks.begin_video(&plan));
    assert!(!hooks.is_active());
    assert!(matches!(events.lock().as_slice(), [ExportEvent::Failed(_)]));
}

#[test]
fn cancel_clears_running_export() {
    let (mut hooks, _sink, events) = recording_hooks();
    assert!(!hooks.cancel("nothing running"));
    hooks.begin_video(&small_plan());
    assert!(hooks.cancel("image replaced"));
    assert!(!hooks.is_active());
    assert_eq!(
        events.lock().last(),
        Some(&ExportEvent::Failed("image replaced".to_string()))
    );
}
