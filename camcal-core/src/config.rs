// ============================================================================
// camcal-core/src/config.rs
// ============================================================================
//
// CONFIGURATION: Pipeline Configuration Structures and Constants
//
// This module defines the configuration consumed by the session walker. It is
// loaded from the same TOML file the rest of a capture pipeline uses, so keys
// that camcal does not know about are ignored.
//
// KEY COMPONENTS:
// - PipelineConfig: session layout, filename matching and selection settings
// - TieBreak: how boards with equal marker counts are ordered
// - Default constants for the optional keys
//
// USAGE:
// The CLI loads a PipelineConfig with `PipelineConfig::from_file`, applies its
// flag overrides and passes the struct by value to `SessionWalker::new`.

use crate::board::BoardDefinition;
use crate::error::{CoreError, CoreResult};
use crate::session::CameraPattern;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// DEFAULT CONSTANTS
// ============================================================================

/// Keys every pipeline config must provide.
pub const REQUIRED_KEYS: [&str; 5] = [
    "path",
    "pipeline_videos_raw",
    "pipeline_calibration",
    "calibration_prefix",
    "cam_regex",
];

/// Extension of the raw calibration videos (compared case-insensitively).
pub const DEFAULT_VIDEO_EXTENSION: &str = "avi";

/// Only every Nth decoded frame is handed to the marker detector.
pub const DEFAULT_FRAME_STRIDE: usize = 10;

/// Upper bound on the number of boards passed to the calibration call.
pub const DEFAULT_MAX_BOARDS: usize = 85;

fn default_video_extension() -> String {
    DEFAULT_VIDEO_EXTENSION.to_string()
}

fn default_frame_stride() -> usize {
    DEFAULT_FRAME_STRIDE
}

fn default_max_boards() -> usize {
    DEFAULT_MAX_BOARDS
}

// ============================================================================
// TIE-BREAK POLICY
// ============================================================================

/// Ordering policy for boards with the same marker count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// Perturb counts with uniform noise so ties are broken without favouring
    /// early frames.
    #[default]
    Random,
    /// Stable sort on the raw count; ties keep discovery order.
    InputOrder,
}

// ============================================================================
// PIPELINE CONFIGURATION
// ============================================================================

/// Configuration for one calibration run over a tree of sessions.
///
/// # Examples
///
/// ```rust
/// use camcal_core::PipelineConfig;
///
/// let config = PipelineConfig::from_toml_str(
///     r#"
/// path = "/data"
/// pipeline_videos_raw = "raw"
/// pipeline_calibration = "calib"
/// calibration_prefix = "calib-"
/// cam_regex = "cam([A-Z])"
/// "#,
/// )
/// .unwrap();
/// assert_eq!(config.max_boards, 85);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    // ---- Session Layout ----

    /// Root directory whose immediate subdirectories are sessions
    pub path: PathBuf,

    /// Subdirectory of a session holding the raw videos
    pub pipeline_videos_raw: String,

    /// Subdirectory of a session receiving the intrinsics files
    pub pipeline_calibration: String,

    // ---- Video Matching ----

    /// Filename prefix of calibration videos
    pub calibration_prefix: String,

    /// Regex with exactly one capture group extracting the camera id from a file stem
    pub cam_regex: String,

    /// Video file extension, without the dot
    #[serde(default = "default_video_extension")]
    pub video_extension: String,

    // ---- Frame Sampling & Selection ----

    /// Decode stride: every Nth frame is run through the detector
    #[serde(default = "default_frame_stride")]
    pub frame_stride: usize,

    /// Maximum number of boards used for one camera's calibration
    #[serde(default = "default_max_boards")]
    pub max_boards: usize,

    /// Seed for the tie-break random source; `None` seeds from the OS
    #[serde(default)]
    pub selection_seed: Option<u64>,

    #[serde(default)]
    pub tie_break: TieBreak,

    // ---- Board ----

    #[serde(default)]
    pub board: BoardDefinition,
}

impl PipelineConfig {
    /// Creates a configuration from the five required keys, with defaults for
    /// everything else.
    pub fn new(
        path: impl Into<PathBuf>,
        pipeline_videos_raw: impl Into<String>,
        pipeline_calibration: impl Into<String>,
        calibration_prefix: impl Into<String>,
        cam_regex: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            pipeline_videos_raw: pipeline_videos_raw.into(),
            pipeline_calibration: pipeline_calibration.into(),
            calibration_prefix: calibration_prefix.into(),
            cam_regex: cam_regex.into(),
            video_extension: default_video_extension(),
            frame_stride: DEFAULT_FRAME_STRIDE,
            max_boards: DEFAULT_MAX_BOARDS,
            selection_seed: None,
            tie_break: TieBreak::default(),
            board: BoardDefinition::default(),
        }
    }

    /// Loads and validates a configuration file.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        log::debug!("Loading pipeline config from {}", path.display());
        let contents = fs::read_to_string(path).map_err(|e| {
            CoreError::PathError(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&contents, path)
    }

    /// Parses and validates configuration text.
    pub fn from_toml_str(contents: &str) -> CoreResult<Self> {
        Self::parse(contents, Path::new("<inline>"))
    }

    fn parse(contents: &str, origin: &Path) -> CoreResult<Self> {
        let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| {
            CoreError::ConfigParse {
                path: origin.to_path_buf(),
                message: e.message().to_string(),
            }
        })?;

        // Report missing keys by name before serde gets a chance to
        if let Some(missing) = REQUIRED_KEYS.iter().find(|key| !table.contains_key(**key)) {
            return Err(CoreError::Config(format!(
                "missing required key `{}` in {}",
                missing,
                origin.display()
            )));
        }

        let config: PipelineConfig =
            toml::from_str(contents).map_err(|e| CoreError::ConfigParse {
                path: origin.to_path_buf(),
                message: e.message().to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that deserialize fine but cannot drive a run.
    pub fn validate(&self) -> CoreResult<()> {
        for (key, value) in [
            ("pipeline_videos_raw", &self.pipeline_videos_raw),
            ("pipeline_calibration", &self.pipeline_calibration),
            ("video_extension", &self.video_extension),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::Config(format!("`{key}` must not be empty")));
            }
        }
        if self.frame_stride == 0 {
            return Err(CoreError::Config("`frame_stride` must be at least 1".to_string()));
        }
        if self.max_boards == 0 {
            return Err(CoreError::Config("`max_boards` must be at least 1".to_string()));
        }
        self.board
            .validate()
            .map_err(|msg| CoreError::Config(format!("[board]: {msg}")))?;
        CameraPattern::new(&self.cam_regex)?;
        Ok(())
    }

    /// Raw video directory of a session.
    pub fn raw_dir(&self, session: &Path) -> PathBuf {
        session.join(&self.pipeline_videos_raw)
    }

    /// Calibration output directory of a session.
    pub fn calibration_dir(&self, session: &Path) -> PathBuf {
        session.join(&self.pipeline_calibration)
    }

    /// Intrinsics output file for one camera of a session.
    pub fn intrinsics_path(&self, session: &Path, camera: &str) -> PathBuf {
        self.calibration_dir(session)
            .join(format!("intrinsics_{camera}.toml"))
    }
}
