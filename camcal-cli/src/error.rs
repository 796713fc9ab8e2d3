// ============================================================================
// camcal-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Error types and utilities for the CLI
//
// Core errors are wrapped in anyhow with the context of the command step that
// failed, and reported once at the top level with their full cause chain.
//
// KEY COMPONENTS:
// - CliResult: Type alias for CLI operations
// - report_error: top-level error printing

use owo_colors::OwoColorize;

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Type alias for CLI results.
pub type CliResult<T> = anyhow::Result<T>;

// ============================================================================
// ERROR REPORTING
// ============================================================================

/// Formats an error and its causes as one message per line.
pub fn format_error_chain(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    for cause in error.chain().skip(1) {
        message.push_str("\n  caused by: ");
        message.push_str(&cause.to_string());
    }
    message
}

/// Prints an error with red styling to stderr.
pub fn report_error(error: &anyhow::Error) {
    let message = format_error_chain(error);
    if crate::terminal::should_use_color() {
        eprintln!("{} {}", "Error:".bold().bright_red(), message);
    } else {
        eprintln!("Error: {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_error_chain_lists_causes() {
        let result: CliResult<()> = Err(camcal_core::CoreError::Config(
            "missing required key `cam_regex`".to_string(),
        ))
        .context("Failed to load configuration from pipeline.toml");
        let message = format_error_chain(&result.unwrap_err());
        assert!(message.starts_with("Failed to load configuration"));
        assert!(
            message.contains("caused by: Configuration error: missing required key `cam_regex`")
        );
    }
}
