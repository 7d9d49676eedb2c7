use super::*;

fn frame(v: u8) -> FrameRGBA {
    FrameRGBA {
        width: 2,
        height: 2,
        data: vec![v; 16],
        premultiplied: false,
    }
}

fn plan(interval_secs: f64) -> VideoExportPlan {
    VideoExportPlan {
        kind: AnimationKind::TurnTable,
        interval_secs,
        intensity: 0.05,
        fps: Fps::new(30, 1).unwrap(),
        target_secs: 10.0,
    }
}

#[test]
fn video_frame_count_is_whole_cycles() {
    for interval in 1..=10 {
        let p = plan(f64::from(interval));
        let expected = (10 / interval) * interval * 30;
        assert_eq!(p.total_frames(), expected as usize, "interval {interval}");
        assert_eq!(p.offset_queue().unwrap().len(), expected as usize);
    }
}

#[test]
fn queue_progress_is_monotonic_and_loops_seamlessly() {
    let p = plan(4.0);
    let q = p.offset_queue().unwrap();
    assert!(q.iter().zip(q.iter().skip(1)).all(|(a, b)| b.0 > a.0));
    assert_eq!(q[0].0, 0.0);
    assert!(q.back().unwrap().0 < 1.0);
    // The frame after the last one would be the first frame again.
    let next = AnimationKind::TurnTable.offset(q.len() as f64 / 120.0, 0.05);
    assert!((next - q[0].1).length() < 1e-9);
}

#[test]
fn bad_plans_are_rejected() {
    assert!(plan(0.0).offset_queue().is_err());
    let mut p = plan(4.0);
    p.target_secs = f64::NAN;
    assert!(p.offset_queue().is_err());
    assert!(ExportJob::video(&p).is_err());
}

#[test]
fn still_job_renders_diffuse_then_depth() {
    let mut job = ExportJob::still();
    assert_eq!(job.kind(), ExportKind::Still);

    let first = job.before_frame().unwrap();
    assert_eq!(first.offset, Vec2::ZERO);
    assert!(!first.show_depth);
    assert_eq!(job.after_frame(Some(frame(1))), JobStep::Continue(50.0));

    let second = job.before_frame().unwrap();
    assert!(second.show_depth);
    match job.after_frame(Some(frame(2))) {
        JobStep::Ready(pct, ExportPayload::Still { diffuse, depth }) => {
            assert_eq!(pct, 100.0);
            assert_eq!(diffuse, frame(1));
            assert_eq!(depth, frame(2));
        }
        other => panic!("unexpected step {other:?}"),
    }
}

#[test]
fn missing_snapshot_fails_the_job() {
    let mut job = ExportJob::still();
    job.before_frame();
    assert!(matches!(job.after_frame(None), JobStep::Failed(_)));

    let mut job = ExportJob::still();
    job.before_frame();
    let empty = FrameRGBA {
        width: 0,
        height: 0,
        data: Vec::new(),
        premultiplied: false,
    };
    assert!(matches!(job.after_frame(Some(empty)), JobStep::Failed(_)));
}

#[test]
fn video_job_reports_monotonic_progress() {
    let p = VideoExportPlan {
        fps: Fps::new(2, 1).unwrap(),
        target_secs: 2.0,
        ..plan(1.0)
    };
    let mut job = ExportJob::video(&p).unwrap();
    assert_eq!(job.kind(), ExportKind::Video);

    let mut last = 0.0;
    let mut count = 0;
    loop {
        let Some(_) = job.before_frame() else {
            panic!("queue drained without Ready");
        };
        count += 1;
        match job.after_frame(Some(frame(count))) {
            JobStep::Continue(pct) => {
                assert!(pct > last);
                last = pct;
            }
            JobStep::Ready(pct, ExportPayload::Video { frames, fps }) => {
                assert_eq!(pct, 100.0);
                assert_eq!(frames.len(), 4);
                assert_eq!(frames[3], frame(4));
                assert_eq!(fps.num, 2);
                break;
            }
            other => panic!("unexpected step {other:?}"),
        }
    }
    assert_eq!(count, 4);
    assert!(job.before_frame().is_none());
}

#[test]
fn video_job_rejects_frames_without_directive_or_with_new_size() {
    let mut job = ExportJob::video(&plan(10.0)).unwrap();
    assert!(matches!(job.after_frame(Some(frame(1))), JobStep::Failed(_)));

    let mut job = ExportJob::video(&plan(10.0)).unwrap();
    job.before_frame();
    assert!(matches!(job.after_frame(Some(frame(1))), JobStep::Continue(_)));
    job.before_frame();
    let bigger = FrameRGBA {
        width: 4,
        height: 2,
        data: vec![0; 32],
        premultiplied: false,
    };
    assert!(matches!(job.after_frame(Some(bigger)), JobStep::Failed(_)));
}
