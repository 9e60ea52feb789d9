use std::{
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use ndarray::{Array2, Array3};
use tracing::info;

use crate::{
    array_io::ensure_parent_dir,
    error::{StageError, StageResult},
};

/// A still frame to be appended to a video: grayscale or 3-channel color,
/// 8- or 16-bit.
#[derive(Clone, Debug)]
pub enum VideoFrame {
    Gray8(Array2<u8>),
    Gray16(Array2<u16>),
    Rgb8(Array3<u8>),
    Rgb16(Array3<u16>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameFormat {
    Gray8,
    Gray16,
    Rgb8,
    Rgb16,
}

impl FrameFormat {
    fn pix_fmt(self) -> &'static str {
        match self {
            Self::Gray8 => "gray",
            Self::Gray16 => "gray16le",
            Self::Rgb8 => "rgb24",
            Self::Rgb16 => "rgb48le",
        }
    }

    fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Gray16 => 2,
            Self::Rgb8 => 3,
            Self::Rgb16 => 6,
        }
    }
}

impl VideoFrame {
    pub fn format(&self) -> FrameFormat {
        match self {
            Self::Gray8(_) => FrameFormat::Gray8,
            Self::Gray16(_) => FrameFormat::Gray16,
            Self::Rgb8(_) => FrameFormat::Rgb8,
            Self::Rgb16(_) => FrameFormat::Rgb16,
        }
    }

    /// (height, width), validating that color frames carry exactly 3 channels.
    pub fn dimensions(&self) -> StageResult<(usize, usize)> {
        match self {
            Self::Gray8(a) => Ok(a.dim()),
            Self::Gray16(a) => Ok(a.dim()),
            Self::Rgb8(a) => rgb_dims(a.dim()),
            Self::Rgb16(a) => rgb_dims(a.dim()),
        }
    }

    fn append_bytes(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Gray8(a) => buf.extend(a.iter().copied()),
            Self::Gray16(a) => {
                for v in a {
                    buf.extend_from_slice(&v.to_le_bytes());
                }
            }
            Self::Rgb8(a) => buf.extend(a.iter().copied()),
            Self::Rgb16(a) => {
                for v in a {
                    buf.extend_from_slice(&v.to_le_bytes());
                }
            }
        }
    }
}

fn rgb_dims(dim: (usize, usize, usize)) -> StageResult<(usize, usize)> {
    if dim.2 != 3 {
        return Err(StageError::validation(format!(
            "color frames must have 3 channels, got {}",
            dim.2
        )));
    }
    Ok((dim.0, dim.1))
}

#[derive(Clone, Debug)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub out_path: PathBuf,
    pub overwrite: bool,
}

impl VideoConfig {
    pub fn validate(&self) -> StageResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StageError::validation("video width/height must be non-zero"));
        }
        if self.fps == 0 {
            return Err(StageError::validation("video fps must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // We target yuv420p output for maximum player compatibility.
            return Err(StageError::validation(
                "video width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

pub fn default_video_config(
    out_path: impl Into<PathBuf>,
    width: u32,
    height: u32,
    fps: u32,
) -> VideoConfig {
    VideoConfig {
        width,
        height,
        fps,
        out_path: out_path.into(),
        overwrite: true,
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Streams raw frames into a system `ffmpeg` process producing an H.264 MP4.
///
/// Every frame must match the configured size and the pixel format chosen at
/// construction; a rejected frame is simply not written, so a caller that
/// ignores the error and finalizes anyway gets a shorter video. Use
/// [`frames_to_video`] when all frames are known up front; it validates them
/// before any output file is created.
pub struct VideoEncoder {
    cfg: VideoConfig,
    format: FrameFormat,
    child: Child,
    stdin: Option<ChildStdin>,
    scratch: Vec<u8>,
}

impl VideoEncoder {
    pub fn new(cfg: VideoConfig, format: FrameFormat) -> StageResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(StageError::validation(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(StageError::encode(
                "ffmpeg is required for video assembly, but was not found on PATH",
            ));
        }

        // System binary rather than linked FFmpeg, to avoid native dev
        // header/lib requirements.
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        if cfg.overwrite {
            cmd.arg("-y");
        } else {
            cmd.arg("-n");
        }

        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            format.pix_fmt(),
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ])
        .arg(&cfg.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            StageError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| StageError::encode("failed to open ffmpeg stdin (unexpected)"))?;

        Ok(Self {
            scratch: Vec::with_capacity(
                cfg.width as usize * cfg.height as usize * format.bytes_per_pixel(),
            ),
            cfg,
            format,
            child,
            stdin: Some(stdin),
        })
    }

    pub fn write_frame(&mut self, frame: &VideoFrame) -> StageResult<()> {
        if frame.format() != self.format {
            return Err(StageError::validation(format!(
                "frame format {:?} does not match encoder format {:?}",
                frame.format(),
                self.format
            )));
        }

        let (h, w) = frame.dimensions()?;
        if (w, h) != (self.cfg.width as usize, self.cfg.height as usize) {
            return Err(StageError::validation(format!(
                "frame size mismatch: got {w}x{h}, expected {}x{}",
                self.cfg.width, self.cfg.height
            )));
        }

        self.scratch.clear();
        frame.append_bytes(&mut self.scratch);

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(StageError::encode("video encoder is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            StageError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;

        Ok(())
    }

    pub fn finish(mut self) -> StageResult<()> {
        drop(self.stdin.take());

        let output = self.child.wait_with_output().map_err(|e| {
            StageError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StageError::encode(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        info!(out = %self.cfg.out_path.display(), "video written");
        Ok(())
    }
}

/// Assembles equally shaped frames into a single video file.
///
/// The first frame fixes the format and size; every frame is validated
/// against it before ffmpeg is spawned, so a mismatched frame anywhere in the
/// sequence fails the whole operation without leaving a partial output file.
pub fn frames_to_video(
    frames: &[VideoFrame],
    fps: u32,
    out_path: impl AsRef<Path>,
) -> StageResult<()> {
    let first = frames
        .first()
        .ok_or_else(|| StageError::validation("no frames to assemble"))?;
    let format = first.format();
    let (h, w) = first.dimensions()?;

    for (i, frame) in frames.iter().enumerate() {
        if frame.format() != format {
            return Err(StageError::validation(format!(
                "frame {i} has format {:?}, expected {format:?}",
                frame.format()
            )));
        }
        if frame.dimensions()? != (h, w) {
            let (fh, fw) = frame.dimensions()?;
            return Err(StageError::validation(format!(
                "all frames must have the same shape: frame {i} is {fw}x{fh}, expected {w}x{h}"
            )));
        }
    }

    let cfg = default_video_config(out_path.as_ref(), w as u32, h as u32, fps);
    let mut encoder = VideoEncoder::new(cfg, format)?;
    for frame in frames {
        encoder.write_frame(frame)?;
    }
    encoder.finish()
}
