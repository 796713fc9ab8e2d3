// ============================================================================
// camcal-cli/src/progress.rs
// ============================================================================
//
// PROGRESS REPORTING: Terminal Rendering of Calibration Events
//
// Implements camcal-core's ProgressCallback for the terminal. Camera-level
// events become indented status lines on stdout; frame scanning gets an
// indicatif bar on stderr, hidden when stderr is not a terminal.
//
// KEY COMPONENTS:
// - CliProgressReporter: ProgressCallback with an optional live progress bar

use crate::terminal;

use camcal_core::{ProgressCallback, ProgressEvent, format_duration};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use std::sync::Mutex;
use std::time::Duration;

/// Renders progress events; `quiet` suppresses stdout lines (for `--json`).
pub struct CliProgressReporter {
    quiet: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgressReporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            bar: Mutex::new(None),
        }
    }

    fn start_bar(&self, label: String, total_frames: Option<u64>) {
        let bar = match total_frames {
            Some(total) => {
                let bar = ProgressBar::new(total);
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("    {msg} {percent:>3}% [{bar:30}] {pos}/{len} frames ({eta})")
                {
                    bar.set_style(style.progress_chars("##."));
                }
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                if let Ok(style) =
                    ProgressStyle::default_spinner().template("    {spinner} {msg} {pos} frames")
                {
                    bar.set_style(style);
                }
                bar
            }
        };
        bar.set_message(label);
        if !std::io::stderr().is_terminal() {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        if let Ok(mut slot) = self.bar.lock() {
            if let Some(old) = slot.replace(bar) {
                old.finish_and_clear();
            }
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                f(bar);
            }
        }
    }

    fn clear_bar(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }

    fn print(&self, f: impl FnOnce()) {
        if !self.quiet {
            f();
        }
    }
}

impl ProgressCallback for CliProgressReporter {
    fn on_progress(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::SessionStart { session, cameras } => self.print(|| {
                terminal::print_section(&format!("Session {}", session.display()));
                terminal::print_status("Cameras", &cameras.to_string(), false);
            }),
            ProgressEvent::CameraSkipped { camera, output_path } => self.print(|| {
                terminal::print_skipped(&format!(
                    "Camera {camera}: already calibrated ({})",
                    output_path.display()
                ));
            }),
            ProgressEvent::CameraStart { camera, videos, .. } => self.print(|| {
                terminal::print_processing(&format!("Camera {camera}: {videos} video(s)"));
            }),
            ProgressEvent::VideoScanStart { video, total_frames, .. } => {
                let label = video
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| video.display().to_string());
                self.start_bar(label, total_frames);
            }
            ProgressEvent::FrameProgress { frames_read, .. } => {
                self.with_bar(|bar| bar.set_position(frames_read));
            }
            ProgressEvent::VideoScanComplete {
                video,
                frames_read,
                usable_frames,
            } => {
                self.clear_bar();
                self.print(|| {
                    let name = video
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    println!("    {name}: {frames_read} frames, {usable_frames} usable");
                });
            }
            ProgressEvent::BoardsSelected {
                markers,
                boards,
                complete_boards,
                ..
            } => self.print(|| {
                terminal::print_status("Markers", &markers.to_string(), false);
                terminal::print_status(
                    "Boards",
                    &format!("{boards} ({complete_boards} complete)"),
                    false,
                );
            }),
            ProgressEvent::CameraComplete {
                camera,
                output_path,
                error,
                duration,
            } => self.print(|| {
                terminal::print_success(&format!("Camera {camera} calibrated"));
                terminal::print_status("Reproj. error", &format!("{error:.4} px"), true);
                terminal::print_status("Duration", &format_duration(duration.as_secs_f64()), false);
                terminal::print_status("Output", &output_path.display().to_string(), false);
            }),
            ProgressEvent::CameraFailed { camera, message } => {
                self.clear_bar();
                self.print(|| {
                    terminal::print_failure(&format!("Camera {camera} failed: {message}"))
                });
            }
        }
    }
}
