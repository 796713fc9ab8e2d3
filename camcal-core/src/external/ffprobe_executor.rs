//! FFprobe integration for reading video parameters.
//!
//! The calibration result records the width, height and frame rate of the
//! camera's videos. They are read once, from the first video of each camera.
use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};
use crate::external::VideoParams;
use ffprobe::{FfProbeError, ffprobe};
use std::path::Path;

/// Gets width, height, frame rate and (when the container reports it) the
/// frame count of the first video stream.
pub fn get_video_params(input_path: &Path) -> CoreResult<VideoParams> {
    log::debug!(
        "Running ffprobe (via crate) for video params on: {}",
        input_path.display()
    );
    match ffprobe(input_path) {
        Ok(metadata) => {
            let video_stream = metadata
                .streams
                .iter()
                .find(|s| s.codec_type.as_deref() == Some("video"))
                .ok_or_else(|| {
                    CoreError::VideoInfoError(format!(
                        "No video stream found in {}",
                        input_path.display()
                    ))
                })?;

            let (width, height) = match (video_stream.width, video_stream.height) {
                (Some(w), Some(h)) if w > 0 && h > 0 => (w as u32, h as u32),
                (w, h) => {
                    return Err(CoreError::VideoInfoError(format!(
                        "Invalid or missing dimensions in {}: width={:?}, height={:?}",
                        input_path.display(),
                        w,
                        h
                    )));
                }
            };

            // avg_frame_rate is 0/0 for some AVI muxers; r_frame_rate is the fallback
            let fps = parse_frame_rate(&video_stream.avg_frame_rate)
                .or_else(|| parse_frame_rate(&video_stream.r_frame_rate))
                .ok_or_else(|| {
                    CoreError::FfprobeParse(format!(
                        "Failed to parse frame rate ('{}' / '{}') for {}",
                        video_stream.avg_frame_rate,
                        video_stream.r_frame_rate,
                        input_path.display()
                    ))
                })?;

            let frame_count = video_stream
                .nb_frames
                .as_deref()
                .and_then(|f| f.parse::<u64>().ok());

            Ok(VideoParams {
                width,
                height,
                fps,
                frame_count,
            })
        }
        Err(err) => {
            log::error!(
                "ffprobe failed for video params on {}: {:?}",
                input_path.display(),
                err
            );
            Err(map_ffprobe_error(err, "video params"))
        }
    }
}

/// Parses an ffprobe rational ("30000/1001") or plain ("25") frame rate.
/// Returns `None` for zero, negative or malformed rates.
pub(crate) fn parse_frame_rate(rate: &str) -> Option<f64> {
    let rate = rate.trim();
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.parse::<f64>().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

fn map_ffprobe_error(err: FfProbeError, context: &str) -> CoreError {
    match err {
        FfProbeError::Io(io_err) => command_start_error(format!("ffprobe ({context})"), io_err),
        FfProbeError::Status(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            command_failed_error(format!("ffprobe ({context})"), output.status, stderr)
        }
        FfProbeError::Deserialize(err) => {
            CoreError::FfprobeParse(format!("ffprobe {context} output deserialization: {err}"))
        }
        _ => CoreError::FfprobeParse(format!("Unknown ffprobe error during {context}: {err:?}")),
    }
}
