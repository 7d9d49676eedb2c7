use std::{
    io::{Read, Write as _},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
    thread::JoinHandle,
};

use anyhow::Context as _;

use crate::{
    foundation::{
        core::{Fps, Size2},
        error::{ParallaxError, ParallaxResult},
        math::mul_div255,
    },
    gpu::texture::FrameRGBA,
};

/// Options for [`FfmpegEncoder`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegEncoderOpts {
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl FfmpegEncoderOpts {
    /// Create options for outputting an MP4 to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

/// Spawns the system `ffmpeg` and streams raw RGBA frames to its stdin.
pub struct FfmpegEncoder {
    opts: FfmpegEncoderOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,

    scratch: Vec<u8>,
    size: Option<Size2>,
}

impl FfmpegEncoder {
    /// Create an encoder; nothing is spawned until [`FfmpegEncoder::begin`].
    pub fn new(opts: FfmpegEncoderOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            size: None,
        }
    }

    /// Output path.
    pub fn out_path(&self) -> &Path {
        &self.opts.out_path
    }

    /// Spawn `ffmpeg` for frames of `size` at `fps`.
    ///
    /// Odd extents are padded to the next even size by repeating the last column and row, since
    /// yuv420p output needs even dimensions.
    pub fn begin(&mut self, size: Size2, fps: Fps) -> ParallaxResult<()> {
        if fps.num == 0 || fps.den == 0 {
            return Err(ParallaxError::validation("fps must be non-zero"));
        }
        if size.is_empty() {
            return Err(ParallaxError::validation(
                "ffmpeg encoder width/height must be non-zero",
            ));
        }
        let encoded = padded_to_even(size);

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(ParallaxError::export(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(ParallaxError::export(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.arg(if self.opts.overwrite { "-y" } else { "-n" });
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &encoded.to_string(),
            "-r",
            &format!("{}/{}", fps.num, fps.den),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ]);
        cmd.arg(&self.opts.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            ParallaxError::export(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ParallaxError::export("failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ParallaxError::export("failed to open ffmpeg stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        tracing::debug!(path = %self.opts.out_path.display(), %size, %encoded, "spawned ffmpeg");
        self.scratch = vec![0u8; encoded.pixel_count() * 4];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.size = Some(size);
        Ok(())
    }

    /// Flatten and write one frame.
    pub fn push_frame(&mut self, frame: &FrameRGBA) -> ParallaxResult<()> {
        let size = self
            .size
            .ok_or_else(|| ParallaxError::export("ffmpeg encoder not started"))?;
        if frame.size() != size {
            return Err(ParallaxError::validation(format!(
                "frame size mismatch: got {}, expected {size}",
                frame.size()
            )));
        }
        write_padded_frame(&mut self.scratch, frame, self.opts.bg_rgba)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ParallaxError::export("ffmpeg encoder is already finalized"));
        };
        stdin.write_all(&self.scratch).map_err(|e| {
            ParallaxError::export(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    /// Close stdin and wait for `ffmpeg` to exit.
    pub fn end(&mut self) -> ParallaxResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| ParallaxError::export("ffmpeg encoder not started"))?;

        let status = child.wait().map_err(|e| {
            ParallaxError::export(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ParallaxError::export("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| ParallaxError::export(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        self.size = None;
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(ParallaxError::export(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    /// Kill a running `ffmpeg`, if any.
    pub fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
        self.size = None;
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Encode `frames` into an MP4 at `opts.out_path`, removing the file if encoding fails.
#[tracing::instrument(skip_all, fields(path = %opts.out_path.display(), frames = frames.len()))]
pub fn encode_mp4(opts: FfmpegEncoderOpts, frames: &[FrameRGBA], fps: Fps) -> ParallaxResult<()> {
    let first = frames
        .first()
        .ok_or_else(|| ParallaxError::export("no frames to encode"))?;
    let mut enc = FfmpegEncoder::new(opts);
    if let Err(e) = stream_frames(&mut enc, first.size(), frames, fps) {
        enc.abort();
        remove_partial(enc.out_path());
        return Err(e);
    }
    Ok(())
}

fn stream_frames(
    enc: &mut FfmpegEncoder,
    size: Size2,
    frames: &[FrameRGBA],
    fps: Fps,
) -> ParallaxResult<()> {
    enc.begin(size, fps)?;
    for f in frames {
        enc.push_frame(f)?;
    }
    enc.end()
}

pub(crate) fn remove_partial(path: &Path) {
    if path.exists()
        && let Err(e) = std::fs::remove_file(path)
    {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove partial output");
    }
}

/// Round each extent up to the next even number.
pub(crate) fn padded_to_even(size: Size2) -> Size2 {
    Size2::new(size.width + size.width % 2, size.height + size.height % 2)
}

/// Flatten `frame` into `dst`, which holds a frame of [`padded_to_even`] size. Padding repeats
/// the last column and row.
fn write_padded_frame(dst: &mut [u8], frame: &FrameRGBA, bg_rgba: [u8; 4]) -> ParallaxResult<()> {
    let size = frame.size();
    let padded = padded_to_even(size);
    let src_stride = size.width as usize * 4;
    let dst_stride = padded.width as usize * 4;
    if size.is_empty()
        || frame.data.len() != src_stride * size.height as usize
        || dst.len() != dst_stride * padded.height as usize
    {
        return Err(ParallaxError::validation(format!(
            "padded frame buffer does not match frame size {size}"
        )));
    }

    for (dst_row, src_row) in dst
        .chunks_exact_mut(dst_stride)
        .zip(frame.data.chunks_exact(src_stride))
    {
        let (body, pad) = dst_row.split_at_mut(src_stride);
        flatten_over_bg_to_opaque_rgba8(body, src_row, frame.premultiplied, bg_rgba)?;
        if !pad.is_empty() {
            let last = src_stride - 4;
            pad.copy_from_slice(&body[last..]);
        }
    }
    if padded.height != size.height {
        let (rows, pad) = dst.split_at_mut(dst_stride * size.height as usize);
        pad.copy_from_slice(&rows[rows.len() - dst_stride..]);
    }
    Ok(())
}

fn flatten_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    premultiplied: bool,
    bg_rgba: [u8; 4],
) -> ParallaxResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(ParallaxError::validation(
            "flatten_over_bg_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg = [
        u16::from(bg_rgba[0]),
        u16::from(bg_rgba[1]),
        u16::from(bg_rgba[2]),
    ];
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            let fg = if premultiplied {
                u16::from(s[c])
            } else {
                mul_div255(u16::from(s[c]), a)
            };
            d[c] = (fg + mul_div255(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ParallaxResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/export/ffmpeg.rs"]
mod tests;
