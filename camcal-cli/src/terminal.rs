//! Terminal output for camcal.
//!
//! Hierarchical, human-readable output on stdout: section headers, indented
//! per-camera lines and aligned status rows. Log lines go to stderr through the
//! logger, so stdout stays clean for `--json`.

use camcal_core::{CameraJob, CameraState, RunSummary, format_duration};
use console::style;
use owo_colors::OwoColorize;
use std::io::IsTerminal;

/// Check if color should be used (respects NO_COLOR and non-terminal stdout)
pub fn should_use_color() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
}

/// Print a section header (Level 1 - Main sections with cyan color)
pub fn print_section(title: &str) {
    println!();
    if should_use_color() {
        println!("===== {} =====", title.to_uppercase().cyan().bold());
    } else {
        println!("===== {} =====", title.to_uppercase());
    }
}

/// Print a processing step (Level 2 - Subsections with 2 spaces indentation and bold)
pub fn print_processing(message: &str) {
    if should_use_color() {
        println!("  » {}", style(message).bold());
    } else {
        println!("  » {message}");
    }
}

const STATUS_LABEL_WIDTH: usize = 15;

/// Plain status row with the value aligned after the label.
pub fn format_status(label: &str, value: &str) -> String {
    let padding = STATUS_LABEL_WIDTH.saturating_sub(label.len()).max(1);
    format!("    {}:{} {}", label, " ".repeat(padding), value)
}

/// Print a status line (Level 3 - 4 spaces indentation, aligned values)
pub fn print_status(label: &str, value: &str, highlight: bool) {
    if should_use_color() && highlight {
        println!("{}", format_status(label, &style(value).bold().to_string()));
    } else {
        println!("{}", format_status(label, value));
    }
}

/// Print a success message (Level 2 - green with check mark)
pub fn print_success(message: &str) {
    if should_use_color() {
        println!("  ✓ {}", message.green());
    } else {
        println!("  ✓ {message}");
    }
}

/// Print a skipped item (Level 2 - dimmed)
pub fn print_skipped(message: &str) {
    if should_use_color() {
        println!("  - {}", style(message).dim());
    } else {
        println!("  - {message}");
    }
}

/// Print a failure message (Level 2 - red with cross)
pub fn print_failure(message: &str) {
    if should_use_color() {
        println!("  ✗ {}", message.bright_red().bold());
    } else {
        println!("  ✗ {message}");
    }
}

/// Short human-readable label for a camera state.
pub fn state_label(state: CameraState) -> &'static str {
    match state {
        CameraState::Pending => "pending",
        CameraState::CalibratedExisting => "calibrated (existing)",
        CameraState::Calibrating => "calibrating",
        CameraState::Done => "calibrated",
        CameraState::Failed => "failed",
    }
}

/// Print the job list grouped by session.
pub fn print_plan(jobs: &[CameraJob]) {
    print_section("Calibration plan");
    if jobs.is_empty() {
        println!("  No calibration videos found.");
        return;
    }
    let mut current = None;
    for job in jobs {
        if current != Some(&job.session) {
            current = Some(&job.session);
            println!();
            print_processing(&job.session.display().to_string());
        }
        let line = format!(
            "camera {}: {} video(s), {}",
            job.camera,
            job.videos.len(),
            state_label(job.state)
        );
        match job.state {
            CameraState::CalibratedExisting => print_skipped(&line),
            _ => println!("    {line}"),
        }
    }
    let pending = jobs.iter().filter(|j| j.state == CameraState::Pending).count();
    println!();
    print_status("Cameras", &jobs.len().to_string(), false);
    print_status("To calibrate", &pending.to_string(), true);
}

/// Print the end-of-run summary.
pub fn print_summary(summary: &RunSummary) {
    print_section("Summary");
    for outcome in summary.outcomes.iter().filter(|o| o.state == CameraState::Done) {
        let error = outcome.error.map(|e| format!("{e:.4} px")).unwrap_or_default();
        print_success(&format!(
            "{} camera {} (reprojection error {})",
            outcome.session.display(),
            outcome.camera,
            error
        ));
    }
    print_status("Calibrated", &summary.calibrated().to_string(), true);
    print_status("Already done", &summary.skipped().to_string(), false);
    print_status("Total time", &format_duration(summary.total_duration_secs), false);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_labels_are_distinct() {
        let states = [
            CameraState::Pending,
            CameraState::CalibratedExisting,
            CameraState::Calibrating,
            CameraState::Done,
            CameraState::Failed,
        ];
        let labels: std::collections::HashSet<&str> =
            states.iter().map(|s| state_label(*s)).collect();
        assert_eq!(labels.len(), states.len());
    }

    #[test]
    fn test_status_values_are_aligned() {
        let short = format_status("Camera", "A");
        let long = format_status("Reprojection", "0.3120");
        assert_eq!(short, "    Camera:          A");
        assert_eq!(short.find('A'), long.find('0'));
    }

    #[test]
    fn test_status_keeps_a_space_after_long_labels() {
        assert_eq!(
            format_status("A very long status label", "x"),
            "    A very long status label:  x"
        );
    }

    #[test]
    fn test_print_status_accepts_any_label() {
        print_status("Camera", "A", true);
        print_status("", "", false);
    }
}
