use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use parking_lot::Mutex;

use crate::{
    export::ffmpeg::{FfmpegEncoderOpts, encode_mp4, ensure_parent_dir, remove_partial},
    foundation::{
        core::Fps,
        error::{ParallaxError, ParallaxResult},
    },
    gpu::texture::FrameRGBA,
};

/// Persists finished exports.
///
/// Sinks are only called with complete data: both still layers, or every video frame in playback
/// order. An error means nothing was persisted.
pub trait ExportSink: Send {
    /// Persist the diffuse and depth layers of a still export.
    fn save_still(&mut self, diffuse: &FrameRGBA, depth: &FrameRGBA) -> ParallaxResult<()>;
    /// Persist a video export.
    fn save_video(&mut self, frames: &[FrameRGBA], fps: Fps) -> ParallaxResult<()>;
}

/// Stills captured by an [`InMemoryExportSink`].
#[derive(Clone, Debug, PartialEq)]
pub struct CapturedStill {
    /// Color layer.
    pub diffuse: FrameRGBA,
    /// Depth layer.
    pub depth: FrameRGBA,
}

/// A video captured by an [`InMemoryExportSink`].
#[derive(Clone, Debug, PartialEq)]
pub struct CapturedVideo {
    /// Frames in playback order.
    pub frames: Vec<FrameRGBA>,
    /// Playback rate.
    pub fps: Fps,
}

#[derive(Debug, Default)]
struct Captured {
    stills: Vec<CapturedStill>,
    videos: Vec<CapturedVideo>,
    fail_with: Option<String>,
}

/// In-memory sink for tests and embedding hosts.
///
/// Clones share storage, so a caller can keep a handle while the compositor owns the sink.
#[derive(Clone, Debug, Default)]
pub struct InMemoryExportSink {
    inner: Arc<Mutex<Captured>>,
}

impl InMemoryExportSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following save fail with `reason` (`None` to succeed again).
    pub fn set_failure(&self, reason: Option<&str>) {
        self.inner.lock().fail_with = reason.map(str::to_string);
    }

    /// Stills saved so far.
    pub fn stills(&self) -> Vec<CapturedStill> {
        self.inner.lock().stills.clone()
    }

    /// Videos saved so far.
    pub fn videos(&self) -> Vec<CapturedVideo> {
        self.inner.lock().videos.clone()
    }

    fn check(&self) -> ParallaxResult<()> {
        match &self.inner.lock().fail_with {
            Some(reason) => Err(ParallaxError::export(reason.clone())),
            None => Ok(()),
        }
    }
}

impl ExportSink for InMemoryExportSink {
    fn save_still(&mut self, diffuse: &FrameRGBA, depth: &FrameRGBA) -> ParallaxResult<()> {
        self.check()?;
        self.inner.lock().stills.push(CapturedStill {
            diffuse: diffuse.clone(),
            depth: depth.clone(),
        });
        Ok(())
    }

    fn save_video(&mut self, frames: &[FrameRGBA], fps: Fps) -> ParallaxResult<()> {
        self.check()?;
        self.inner.lock().videos.push(CapturedVideo {
            frames: frames.to_vec(),
            fps,
        });
        Ok(())
    }
}

/// Writes stills as PNG files and videos as MP4 through the system `ffmpeg`.
///
/// Output names are `<stem>_diffuse.png`, `<stem>_depth.png` and `<stem>.mp4` inside `out_dir`.
/// A numeric suffix is appended to the stem for every export after the first.
#[derive(Clone, Debug)]
pub struct FileExportSink {
    out_dir: PathBuf,
    stem: String,
    bg_rgba: [u8; 4],
    saves: u32,
}

impl FileExportSink {
    /// Sink writing into `out_dir` with file stem `stem`.
    pub fn new(out_dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            out_dir: out_dir.into(),
            stem: stem.into(),
            bg_rgba: [0, 0, 0, 255],
            saves: 0,
        }
    }

    /// Background used to flatten transparent pixels in videos.
    pub fn with_background(mut self, bg_rgba: [u8; 4]) -> Self {
        self.bg_rgba = bg_rgba;
        self
    }

    fn next_stem(&mut self) -> String {
        let stem = if self.saves == 0 {
            self.stem.clone()
        } else {
            format!("{}_{}", self.stem, self.saves)
        };
        self.saves += 1;
        stem
    }

    /// Path of the diffuse still for `stem`.
    pub fn still_paths(&self, stem: &str) -> (PathBuf, PathBuf) {
        (
            self.out_dir.join(format!("{stem}_diffuse.png")),
            self.out_dir.join(format!("{stem}_depth.png")),
        )
    }

    /// Path of the video for `stem`.
    pub fn video_path(&self, stem: &str) -> PathBuf {
        self.out_dir.join(format!("{stem}.mp4"))
    }
}

fn write_png(frame: &FrameRGBA, path: &std::path::Path) -> ParallaxResult<()> {
    frame
        .to_rgba_image()?
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

impl ExportSink for FileExportSink {
    #[tracing::instrument(skip_all, fields(out_dir = %self.out_dir.display()))]
    fn save_still(&mut self, diffuse: &FrameRGBA, depth: &FrameRGBA) -> ParallaxResult<()> {
        let stem = self.next_stem();
        let (diffuse_path, depth_path) = self.still_paths(&stem);
        ensure_parent_dir(&diffuse_path)?;
        let result = write_png(diffuse, &diffuse_path).and_then(|()| write_png(depth, &depth_path));
        if let Err(e) = result {
            remove_partial(&diffuse_path);
            remove_partial(&depth_path);
            return Err(e);
        }
        tracing::info!(diffuse = %diffuse_path.display(), depth = %depth_path.display(), "saved still");
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(out_dir = %self.out_dir.display(), frames = frames.len()))]
    fn save_video(&mut self, frames: &[FrameRGBA], fps: Fps) -> ParallaxResult<()> {
        let stem = self.next_stem();
        let path = self.video_path(&stem);
        let mut opts = FfmpegEncoderOpts::new(&path);
        opts.bg_rgba = self.bg_rgba;
        encode_mp4(opts, frames, fps)?;
        tracing::info!(path = %path.display(), "saved video");
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/sink.rs"]
mod tests;
