use std::{
    io::Write as _,
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use anyhow::Context as _;

use crate::{
    foundation::error::{StackError, StackResult},
    foundation::math::mul_div255_u16,
    render::backend::FrameRGBA,
};

/// Output parameters for [`FfmpegEncoder`].
#[derive(Clone, Debug)]
pub struct EncodeConfig {
    /// Frame width; must be even.
    pub width: u32,
    /// Frame height; must be even.
    pub height: u32,
    /// Integer frame rate.
    pub fps: u32,
    /// Destination file.
    pub out_path: PathBuf,
    /// Replace `out_path` if it exists.
    pub overwrite: bool,
}

impl EncodeConfig {
    /// Reject configurations `libx264`/`yuv420p` cannot encode.
    pub fn validate(&self) -> StackResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StackError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if self.fps == 0 {
            return Err(StackError::validation("encode fps must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(StackError::validation(
                "encode width/height must be even (yuv420p chroma subsampling)",
            ));
        }
        Ok(())
    }
}

/// `true` when an `ffmpeg` binary answers `-version`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Create the parent directory of `path` if needed.
pub fn ensure_parent_dir(path: &Path) -> StackResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Streams raw frames into a system `ffmpeg` process producing an H.264 MP4.
pub struct FfmpegEncoder {
    cfg: EncodeConfig,
    bg_rgba: [u8; 4],
    child: Child,
    stdin: Option<ChildStdin>,
    scratch: Vec<u8>,
    frames_written: u64,
}

impl FfmpegEncoder {
    /// Spawn `ffmpeg`. Frames with alpha are flattened over `bg_rgba` (straight alpha).
    pub fn new(cfg: EncodeConfig, bg_rgba: [u8; 4]) -> StackResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(StackError::validation(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(StackError::evaluation(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .arg(if cfg.overwrite { "-y" } else { "-n" })
            .args([
                "-loglevel",
                "error",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
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

        let mut child = cmd
            .spawn()
            .context("failed to spawn ffmpeg (is it installed and on PATH?)")?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| StackError::evaluation("ffmpeg stdin was not piped"))?;

        tracing::info!(
            out = %cfg.out_path.display(),
            width = cfg.width,
            height = cfg.height,
            fps = cfg.fps,
            "ffmpeg encode started"
        );

        Ok(Self {
            scratch: vec![0u8; cfg.width as usize * cfg.height as usize * 4],
            cfg,
            bg_rgba,
            child,
            stdin: Some(stdin),
            frames_written: 0,
        })
    }

    /// Flatten and write one frame.
    pub fn encode_frame(&mut self, frame: &FrameRGBA) -> StackResult<()> {
        if frame.width != self.cfg.width || frame.height != self.cfg.height {
            return Err(StackError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.cfg.width, self.cfg.height
            )));
        }

        flatten_to_opaque_rgba8(
            &mut self.scratch,
            &frame.data,
            frame.premultiplied,
            self.bg_rgba,
        )?;

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| StackError::evaluation("ffmpeg encoder is already finalized"))?;
        stdin
            .write_all(&self.scratch)
            .context("failed to write frame to ffmpeg stdin")?;
        self.frames_written += 1;
        Ok(())
    }

    /// Close the pipe and wait for `ffmpeg` to exit successfully.
    pub fn finish(mut self) -> StackResult<()> {
        drop(self.stdin.take());

        let output = self
            .child
            .wait_with_output()
            .context("failed to wait for ffmpeg to finish")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StackError::evaluation(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        tracing::info!(
            out = %self.cfg.out_path.display(),
            frames = self.frames_written,
            "ffmpeg encode finished"
        );
        Ok(())
    }
}

fn flatten_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    src_is_premul: bool,
    bg_rgba: [u8; 4],
) -> StackResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(StackError::validation(
            "frame data must be width*height*4 bytes",
        ));
    }

    let bg = [
        u16::from(bg_rgba[0]),
        u16::from(bg_rgba[1]),
        u16::from(bg_rgba[2]),
    ];
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        let inv = 255 - a;
        for i in 0..3 {
            let c = if src_is_premul {
                u16::from(s[i])
            } else {
                mul_div255_u16(u16::from(s[i]), a)
            };
            d[i] = (c + mul_div255_u16(bg[i], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
