//! Sequential video encoder over an ffmpeg subprocess.
//!
//! Frames are piped as whole PNG files over stdin; ffmpeg's own
//! back-pressure throttles the writer. The caller decides at the end
//! whether the stream was worth keeping: `finish` closes stdin and
//! waits, `abort` kills the process and leaves no artifact.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tracing::debug;

use crate::error::PipelineError;

/// Encoder invocation parameters.
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    pub framerate: u32,
    pub output: PathBuf,
}

pub struct MovieEncoder {
    child: Child,
    stdin: ChildStdin,
    frames_written: usize,
}

impl MovieEncoder {
    /// Spawn ffmpeg reading PNG frames from stdin. Output is H.264 at
    /// 1024 pixels wide (height follows, kept even for the pixel
    /// format).
    pub fn spawn(settings: &EncoderSettings) -> Result<Self, PipelineError> {
        let mut child = tokio::process::Command::new("ffmpeg")
            .args([
                "-y",
                "-f",
                "image2pipe",
                "-framerate",
                &settings.framerate.to_string(),
                "-vcodec",
                "png",
                "-i",
                "-",
                "-vf",
                "scale=1024:-2",
                "-loglevel",
                "error",
                "-vcodec",
                "libx264",
                "-pix_fmt",
                "yuv420p",
            ])
            .arg(&settings.output)
            .stdin(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| {
            PipelineError::Io(std::io::Error::other("ffmpeg stdin not captured"))
        })?;
        Ok(Self {
            child,
            stdin,
            frames_written: 0,
        })
    }

    /// Feed one encoded PNG frame.
    pub async fn write_frame(&mut self, png: &[u8]) -> Result<(), PipelineError> {
        self.stdin.write_all(png).await?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Close the stream and wait for the encode to complete.
    pub async fn finish(mut self) -> Result<(), PipelineError> {
        self.stdin.shutdown().await?;
        drop(self.stdin);
        let output = self.child.wait_with_output().await?;
        if !output.status.success() {
            return Err(PipelineError::Encoder {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        debug!(frames = self.frames_written, "encoder finished");
        Ok(())
    }

    /// Kill the encoder and discard any partial output file.
    pub async fn abort(mut self, output: &Path) -> Result<(), PipelineError> {
        self.child.kill().await?;
        if tokio::fs::try_exists(output).await? {
            tokio::fs::remove_file(output).await?;
        }
        debug!(frames = self.frames_written, "encoder aborted");
        Ok(())
    }
}
