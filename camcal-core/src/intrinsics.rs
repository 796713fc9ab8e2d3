// ============================================================================
// camcal-core/src/intrinsics.rs
// ============================================================================
//
// INTRINSICS FILES: Calibration Result Encoding
//
// One TOML file per camera holds the fitted intrinsics together with the
// video parameters they were computed for:
//
//   error = 0.31
//   camera_mat = [[fx, 0, cx], [0, fy, cy], [0, 0, 1]]
//   dist_coeff = [k1, k2, p1, p2, k3]
//   width = 1920
//   height = 1080
//   fps = 59.94
//
// Files are written through a temporary file in the target directory and
// renamed into place, so an interrupted run never leaves a truncated file that
// a later run would mistake for a finished calibration.

use crate::error::{CoreError, CoreResult};
use crate::external::{CalibrationFit, VideoParams};

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Calibration result for one camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// RMS reprojection error in pixels
    pub error: f64,
    pub camera_mat: [[f64; 3]; 3],
    pub dist_coeff: Vec<f64>,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl CameraIntrinsics {
    pub fn from_fit(fit: CalibrationFit, params: &VideoParams) -> Self {
        Self {
            error: fit.error,
            camera_mat: fit.model.camera_matrix,
            dist_coeff: fit.model.dist_coeffs,
            width: params.width,
            height: params.height,
            fps: params.fps,
        }
    }

    pub fn to_toml_string(&self) -> CoreResult<String> {
        Ok(toml::to_string(self)?)
    }
}

/// Writes `intrinsics` to `path`, creating the parent directory if needed.
///
/// The file either appears complete or not at all.
pub fn write_intrinsics(path: &Path, intrinsics: &CameraIntrinsics) -> CoreResult<()> {
    let contents = intrinsics.to_toml_string()?;
    let dir = path.parent().ok_or_else(|| {
        CoreError::PathError(format!("Output path has no parent directory: {}", path.display()))
    })?;
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| CoreError::Io(e.error))?;

    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Reads an intrinsics file written by [`write_intrinsics`].
pub fn read_intrinsics(path: &Path) -> CoreResult<CameraIntrinsics> {
    let contents = fs::read_to_string(path)?;
    toml::from_str(&contents).map_err(|e| CoreError::IntrinsicsParse {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::CameraModel;
    use tempfile::tempdir;

    fn sample() -> CameraIntrinsics {
        CameraIntrinsics {
            error: 0.318,
            camera_mat: [[1402.5, 0.0, 960.2], [0.0, 1400.1, 540.7], [0.0, 0.0, 1.0]],
            dist_coeff: vec![-0.21, 0.05, 0.001, -0.0004, 0.0],
            width: 1920,
            height: 1080,
            fps: 59.94,
        }
    }

    #[test]
    fn test_toml_layout() {
        let text = sample().to_toml_string().unwrap();
        let table: toml::Table = text.parse().unwrap();
        for key in ["error", "camera_mat", "dist_coeff", "width", "height", "fps"] {
            assert!(table.contains_key(key), "missing {key} in:\n{text}");
        }
        let rows = table["camera_mat"].as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.as_array().unwrap().len() == 3));
        assert_eq!(table["dist_coeff"].as_array().unwrap().len(), 5);
        assert_eq!(table["width"].as_integer(), Some(1920));
    }

    #[test]
    fn test_write_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s1").join("calib").join("intrinsics_A.toml");

        write_intrinsics(&path, &sample()).unwrap();

        assert!(path.is_file());
        assert_eq!(read_intrinsics(&path).unwrap(), sample());
        // Only the final file remains in the directory
        let entries = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_from_fit_copies_video_params() {
        let fit = CalibrationFit {
            error: 1.5,
            model: CameraModel::initial_guess(),
        };
        let params = VideoParams {
            width: 640,
            height: 480,
            fps: 30.0,
            frame_count: Some(900),
        };
        let intrinsics = CameraIntrinsics::from_fit(fit, &params);
        assert_eq!((intrinsics.width, intrinsics.height), (640, 480));
        assert_eq!(intrinsics.fps, 30.0);
        assert_eq!(intrinsics.camera_mat[2], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_read_rejects_incomplete_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("intrinsics_A.toml");
        fs::write(&path, "error = 0.5\n").unwrap();
        assert!(matches!(
            read_intrinsics(&path),
            Err(CoreError::IntrinsicsParse { .. })
        ));
    }
}
