// ============================================================================
// camcal-core/src/external/ffmpeg_reader.rs
// ============================================================================
//
// FFMPEG FRAME READER: Sequential Grayscale Frame Decoding
//
// This module decodes a video into 8-bit grayscale frames by running ffmpeg
// through ffmpeg-sidecar with rawvideo output on stdout. The reader owns the
// ffmpeg child process; dropping the reader before end of stream kills and
// reaps it, so every opened video is released.
//
// KEY COMPONENTS:
// - SidecarVideoSource: VideoSource implementation (ffprobe + ffmpeg)
// - SidecarFrameReader: FrameReader over one running ffmpeg process

use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};
use crate::external::{FrameReader, VideoParams, VideoSource, ffprobe_executor};

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use ffmpeg_sidecar::iter::FfmpegIterator;
use image::GrayImage;
use std::path::{Path, PathBuf};

/// Builds the decode command: all video frames, gray8, raw on stdout.
pub(crate) fn build_decode_command(input_path: &Path) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new();
    cmd.hide_banner();
    cmd.input(input_path.to_string_lossy().as_ref());
    cmd.arg("-map"); // First video stream only
    cmd.arg("0:v:0");
    cmd.arg("-an"); // No audio
    cmd.arg("-sn"); // No subtitles
    cmd.format("rawvideo");
    cmd.pix_fmt("gray");
    cmd.output("-");
    cmd
}

// ============================================================================
// VIDEO SOURCE
// ============================================================================

/// Production `VideoSource`: ffprobe for parameters, ffmpeg for frames.
#[derive(Debug, Clone, Default)]
pub struct SidecarVideoSource;

impl SidecarVideoSource {
    pub fn new() -> Self {
        Self
    }
}

impl VideoSource for SidecarVideoSource {
    type Reader = SidecarFrameReader;

    fn probe(&self, path: &Path) -> CoreResult<VideoParams> {
        ffprobe_executor::get_video_params(path)
    }

    fn open(&self, path: &Path) -> CoreResult<Self::Reader> {
        SidecarFrameReader::open(path)
    }
}

// ============================================================================
// FRAME READER
// ============================================================================

/// Reads decoded gray frames from a running ffmpeg process.
pub struct SidecarFrameReader {
    path: PathBuf,
    child: FfmpegChild,
    events: FfmpegIterator,
    last_error: Option<String>,
    finished: bool,
}

impl SidecarFrameReader {
    /// Spawns ffmpeg for `path` and attaches to its event stream.
    pub fn open(path: &Path) -> CoreResult<Self> {
        let mut cmd = build_decode_command(path);
        log::debug!("Running frame decode command: {:?}", cmd);

        let mut child = cmd
            .spawn()
            .map_err(|e| command_start_error("ffmpeg (sidecar)", e))?;
        let events = match child.iter() {
            Ok(events) => events,
            Err(e) => {
                log::error!("Failed to get ffmpeg event iterator: {}", e);
                let _ = child.kill();
                let _ = child.wait();
                return Err(CoreError::FrameDecode(format!(
                    "ffmpeg event stream unavailable for {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            child,
            events,
            last_error: None,
            finished: false,
        })
    }

    fn finish(&mut self) -> CoreResult<()> {
        self.finished = true;
        let status = self.child.wait().map_err(|e| {
            CoreError::FrameDecode(format!("failed to wait for ffmpeg: {e}"))
        })?;
        if !status.success() {
            let stderr = self
                .last_error
                .take()
                .unwrap_or_else(|| "ffmpeg exited without an error message".to_string());
            log::error!("Frame decode failed for {}: {}", self.path.display(), stderr);
            return Err(command_failed_error("ffmpeg (frame decode)", status, stderr));
        }
        Ok(())
    }
}

impl FrameReader for SidecarFrameReader {
    fn read_frame(&mut self) -> CoreResult<Option<GrayImage>> {
        if self.finished {
            return Ok(None);
        }

        for event in self.events.by_ref() {
            match event {
                FfmpegEvent::OutputFrame(frame) => {
                    let (width, height, frame_num) = (frame.width, frame.height, frame.frame_num);
                    return GrayImage::from_raw(width, height, frame.data)
                        .map(Some)
                        .ok_or_else(|| {
                            CoreError::FrameDecode(format!(
                                "frame {} of {} has a short buffer for {}x{} gray",
                                frame_num,
                                self.path.display(),
                                width,
                                height
                            ))
                        });
                }
                FfmpegEvent::Log(LogLevel::Fatal, msg) | FfmpegEvent::Log(LogLevel::Error, msg) => {
                    log::debug!("ffmpeg: {}", msg);
                    self.last_error = Some(msg);
                }
                FfmpegEvent::Error(msg) => {
                    log::debug!("ffmpeg sidecar: {}", msg);
                    self.last_error = Some(msg);
                }
                _ => {}
            }
        }

        // End of stream is a normal stop as long as ffmpeg exited cleanly
        self.finish()?;
        Ok(None)
    }
}

impl Drop for SidecarFrameReader {
    fn drop(&mut self) {
        if !self.finished {
            log::trace!("Releasing ffmpeg decoder for {}", self.path.display());
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
