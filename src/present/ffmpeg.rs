use anyhow::{Context, Result};
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use super::canvas::{self, Canvas};

/// Pipes raw RGBA frames into ffmpeg, which writes a single still image.
pub struct FfmpegEncoder {
    child: Child,
    frame_len: usize,
}

impl FfmpegEncoder {
    pub fn new(output_path: &Path, width: u32, height: u32) -> Result<Self> {
        canvas::check_size(width, height)?;
        let args = still_args(output_path, width, height);

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        log::debug!("FFmpeg encoder started: {}x{} -> {}", width, height, output_path.display());

        Ok(Self {
            child,
            frame_len: canvas::frame_len(width, height),
        })
    }

    pub fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        if rgba_pixels.len() != self.frame_len {
            anyhow::bail!(
                "Frame is {} bytes, encoder expects {}",
                rgba_pixels.len(),
                self.frame_len
            );
        }
        let stdin = self.child.stdin.as_mut().context("FFmpeg stdin not available")?;
        stdin.write_all(rgba_pixels).context("Failed to write frame to ffmpeg")?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        // Close stdin to signal EOF
        drop(self.child.stdin.take());

        let output = self.child.wait_with_output().context("Failed to wait for ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("FFmpeg exited with error:\n{}", stderr);
        }
        Ok(())
    }
}

fn still_args(output_path: &Path, width: u32, height: u32) -> Vec<OsString> {
    let size = format!("{}x{}", width, height);
    let mut args: Vec<OsString> = [
        "-y",
        "-f", "rawvideo",
        "-pixel_format", "rgba",
        "-video_size", size.as_str(),
        "-i", "pipe:0",
        "-frames:v", "1",
    ]
    .iter()
    .map(OsString::from)
    .collect();
    args.push(output_path.as_os_str().to_os_string());
    args
}

/// Encode a canvas to the image format implied by `path` (normally PNG).
pub fn write_image(path: &Path, canvas: &Canvas) -> Result<()> {
    let mut encoder = FfmpegEncoder::new(path, canvas.width, canvas.height)?;
    encoder.write_frame(&canvas.pixels)?;
    encoder
        .finish()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn still_args_request_one_rgba_frame() {
        let args = still_args(Path::new("out dir/analysis.png"), 640, 480);
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();

        assert_eq!(args[pos("-pixel_format") + 1], "rgba");
        assert_eq!(args[pos("-video_size") + 1], "640x480");
        assert_eq!(args[pos("-frames:v") + 1], "1");
        assert_eq!(args.last().unwrap(), "out dir/analysis.png");
    }
}
