use super::*;

fn frame(w: u32, h: u32, v: u8) -> FrameRGBA {
    FrameRGBA {
        width: w,
        height: h,
        data: vec![v; (w * h * 4) as usize],
        premultiplied: false,
    }
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("parallaxfx-sink-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn in_memory_clones_share_captures() {
    let handle = InMemoryExportSink::new();
    let mut sink: Box<dyn ExportSink> = Box::new(handle.clone());
    sink.save_still(&frame(2, 2, 1), &frame(2, 2, 2)).unwrap();
    sink.save_video(&[frame(2, 2, 3)], Fps::new(30, 1).unwrap())
        .unwrap();
    assert_eq!(handle.stills().len(), 1);
    assert_eq!(handle.stills()[0].depth, frame(2, 2, 2));
    assert_eq!(handle.videos()[0].frames.len(), 1);
}

#[test]
fn in_memory_failure_persists_nothing() {
    let mut sink = InMemoryExportSink::new();
    sink.set_failure(Some("disk full"));
    let err = sink.save_still(&frame(1, 1, 0), &frame(1, 1, 0)).unwrap_err();
    assert_eq!(err.to_string(), "export error: disk full");
    assert!(sink.stills().is_empty());
    sink.set_failure(None);
    sink.save_still(&frame(1, 1, 0), &frame(1, 1, 0)).unwrap();
    assert_eq!(sink.stills().len(), 1);
}

#[test]
fn file_sink_writes_png_pair_with_unique_stems() {
    let dir = temp_dir("still");
    let mut sink = FileExportSink::new(&dir, "shot");
    sink.save_still(&frame(3, 2, 200), &frame(3, 2, 50)).unwrap();
    sink.save_still(&frame(3, 2, 10), &frame(3, 2, 20)).unwrap();

    let (d0, z0) = sink.still_paths("shot");
    let (d1, _) = sink.still_paths("shot_1");
    assert!(d0.exists() && z0.exists() && d1.exists());
    let decoded = image::open(&z0).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (3, 2));
    assert_eq!(decoded.get_pixel(0, 0).0, [50, 50, 50, 50]);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn file_sink_cleans_up_after_bad_still() {
    let dir = temp_dir("bad-still");
    let mut sink = FileExportSink::new(&dir, "broken");
    let bad = FrameRGBA {
        width: 2,
        height: 2,
        data: vec![0; 3],
        premultiplied: false,
    };
    assert!(sink.save_still(&frame(2, 2, 9), &bad).is_err());
    let (d, z) = sink.still_paths("broken");
    assert!(!d.exists());
    assert!(!z.exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn file_sink_rejects_odd_video_without_leaving_output() {
    let dir = temp_dir("odd-video");
    let mut sink = FileExportSink::new(&dir, "clip");
    let err = sink
        .save_video(&[frame(3, 3, 0)], Fps::new(30, 1).unwrap())
        .unwrap_err();
    assert!(err.to_string().contains("even"));
    assert!(!sink.video_path("clip").exists());
    let _ = std::fs::remove_dir_all(&dir);
}
