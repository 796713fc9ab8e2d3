// ============================================================================
// camcal-core/src/session.rs
// ============================================================================
//
// SESSION WALKER: Discovery and Per-Camera Calibration Jobs
//
// This module walks a tree of capture sessions, finds each session's
// calibration videos, groups them by camera and drives the camera pipeline for
// every camera that does not have an intrinsics file yet.
//
// KEY COMPONENTS:
// - CameraPattern: camera id extraction from video file stems
// - discover_sessions / find_calibration_videos / group_by_camera: discovery
// - CameraJob / CameraState: the per-camera plan and its state machine
// - SessionWalker: plan() and run() over the whole tree
// - RunSummary / CameraOutcome: what a run did, per camera
//
// WORKFLOW:
// 1. List the immediate subdirectories of the root as sessions, sorted
// 2. In each session, list `<raw>/<prefix>*.<ext>` and group by camera id
// 3. For each camera in sorted order, skip it if its intrinsics file exists,
//    otherwise calibrate it and write the file
// 4. The first failure is reported and ends the run
//
// Running twice over the same tree writes nothing the second time.

use crate::config::PipelineConfig;
use crate::error::{CoreError, CoreResult};
use crate::external::{CameraCalibrator, MarkerDetector, VideoSource};
use crate::intrinsics::write_intrinsics;
use crate::processing::CameraPipeline;
use crate::progress::{ProgressCallback, ProgressEvent};
use crate::utils::{get_filename_safe, has_extension};

use rand::SeedableRng;
use rand::rngs::StdRng;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

// ============================================================================
// CAMERA PATTERN
// ============================================================================

/// Compiled camera-id regex.
///
/// The pattern is searched (not anchored) in the file stem and must have
/// exactly one capture group, whose match is the camera id.
#[derive(Debug, Clone)]
pub struct CameraPattern {
    regex: Regex,
}

impl CameraPattern {
    pub fn new(pattern: &str) -> CoreResult<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| CoreError::Config(format!("invalid `cam_regex` {pattern:?}: {e}")))?;
        // captures_len counts the implicit whole-match group
        let groups = regex.captures_len() - 1;
        if groups != 1 {
            return Err(CoreError::Config(format!(
                "`cam_regex` {pattern:?} must have exactly one capture group, found {groups}"
            )));
        }
        Ok(Self { regex })
    }

    /// Camera id of the video at `path`, or `None` if the stem does not match.
    pub fn camera_id(&self, path: &Path) -> Option<String> {
        let stem = path.file_stem()?.to_string_lossy();
        let captures = self.regex.captures(&stem)?;
        captures.get(1).map(|m| m.as_str().to_string())
    }
}

// ============================================================================
// DISCOVERY
// ============================================================================

/// Lists the immediate subdirectories of `root`, sorted.
pub fn discover_sessions(root: &Path) -> CoreResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(CoreError::PathError(format!(
            "Session root is not a directory: {}",
            root.display()
        )));
    }
    let mut sessions = Vec::new();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_dir() {
            sessions.push(path);
        }
    }
    sessions.sort();
    log::debug!("Found {} session(s) under {}", sessions.len(), root.display());
    Ok(sessions)
}

/// Lists the calibration videos of a session, sorted.
///
/// A session without a raw video directory has no videos.
pub fn find_calibration_videos(
    config: &PipelineConfig,
    session: &Path,
) -> CoreResult<Vec<PathBuf>> {
    let raw_dir = config.raw_dir(session);
    if !raw_dir.is_dir() {
        log::debug!("No raw video directory in {}", session.display());
        return Ok(Vec::new());
    }

    let mut videos = Vec::new();
    for entry in fs::read_dir(&raw_dir)? {
        let path = entry?.path();
        if !path.is_file() || !has_extension(&path, &config.video_extension) {
            continue;
        }
        if get_filename_safe(&path)?.starts_with(&config.calibration_prefix) {
            videos.push(path);
        }
    }
    videos.sort();
    Ok(videos)
}

/// Groups videos by camera id, in sorted camera order.
///
/// Videos whose stem does not match the pattern are left out.
pub fn group_by_camera(
    pattern: &CameraPattern,
    videos: Vec<PathBuf>,
) -> BTreeMap<String, Vec<PathBuf>> {
    let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for video in videos {
        match pattern.camera_id(&video) {
            Some(camera) => groups.entry(camera).or_default().push(video),
            None => log::debug!("No camera id in {}, skipping", video.display()),
        }
    }
    groups
}

// ============================================================================
// JOBS
// ============================================================================

/// Lifecycle of one camera within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraState {
    Pending,
    /// The intrinsics file already exists; nothing is invoked
    CalibratedExisting,
    Calibrating,
    Done,
    Failed,
}

/// One camera of one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraJob {
    pub session: PathBuf,
    pub camera: String,
    pub videos: Vec<PathBuf>,
    pub output_path: PathBuf,
    pub state: CameraState,
}

/// Result of one camera in a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraOutcome {
    pub session: PathBuf,
    pub camera: String,
    pub state: CameraState,
    pub output_path: PathBuf,
    pub videos: usize,
    /// Reprojection error, for cameras calibrated in this run
    pub error: Option<f64>,
    pub duration_secs: Option<f64>,
}

/// Per-camera outcomes of a run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub outcomes: Vec<CameraOutcome>,
    pub total_duration_secs: f64,
}

impl RunSummary {
    pub fn calibrated(&self) -> usize {
        self.count(CameraState::Done)
    }

    pub fn skipped(&self) -> usize {
        self.count(CameraState::CalibratedExisting)
    }

    fn count(&self, state: CameraState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }
}

/// Tie-break random source for one camera.
///
/// With a seed, the stream depends only on the seed, the session directory
/// name and the camera id, so which other cameras ran or were skipped never
/// changes a camera's board selection. Without a seed it comes from the OS.
pub fn camera_rng(seed: Option<u64>, session: &Path, camera: &str) -> StdRng {
    let Some(seed) = seed else {
        return StdRng::from_entropy();
    };
    let session_name = session
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(session_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(camera.as_bytes());
    StdRng::from_seed(hasher.finalize().into())
}

// ============================================================================
// SESSION WALKER
// ============================================================================

/// Calibrates every uncalibrated camera under the configured root.
pub struct SessionWalker<V, D, C> {
    config: PipelineConfig,
    pattern: CameraPattern,
    source: V,
    detector: D,
    calibrator: C,
}

impl<V, D, C> SessionWalker<V, D, C>
where
    V: VideoSource,
    D: MarkerDetector,
    C: CameraCalibrator,
{
    /// Validates `config` and builds a walker around the given services.
    ///
    /// Each camera job gets its own tie-break random source, see
    /// [`camera_rng`].
    pub fn new(config: PipelineConfig, source: V, detector: D, calibrator: C) -> CoreResult<Self> {
        config.validate()?;
        let pattern = CameraPattern::new(&config.cam_regex)?;
        Ok(Self {
            config,
            pattern,
            source,
            detector,
            calibrator,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Builds the job list for the whole tree without touching any video.
    ///
    /// Jobs are ordered by session, then camera. Cameras with an existing
    /// intrinsics file are `CalibratedExisting`, all others `Pending`.
    pub fn plan(&self) -> CoreResult<Vec<CameraJob>> {
        let mut jobs = Vec::new();
        for session in discover_sessions(&self.config.path)? {
            let videos = find_calibration_videos(&self.config, &session)?;
            for (camera, videos) in group_by_camera(&self.pattern, videos) {
                let output_path = self.config.intrinsics_path(&session, &camera);
                let state = if output_path.exists() {
                    CameraState::CalibratedExisting
                } else {
                    CameraState::Pending
                };
                jobs.push(CameraJob {
                    session: session.clone(),
                    camera,
                    videos,
                    output_path,
                    state,
                });
            }
        }
        Ok(jobs)
    }

    /// Plans and executes the run.
    ///
    /// The first failing camera is reported through `progress` and its error
    /// returned; cameras after it are not attempted.
    pub fn run(&mut self, progress: &dyn ProgressCallback) -> CoreResult<RunSummary> {
        let start = Instant::now();
        let jobs = self.plan()?;
        let mut summary = RunSummary::default();

        let mut current_session: Option<&Path> = None;
        for (i, job) in jobs.iter().enumerate() {
            if current_session != Some(job.session.as_path()) {
                current_session = Some(job.session.as_path());
                let cameras = jobs[i..]
                    .iter()
                    .take_while(|j| j.session == job.session)
                    .count();
                log::info!("Session {}: {} camera(s)", job.session.display(), cameras);
                progress.on_progress(ProgressEvent::SessionStart {
                    session: job.session.clone(),
                    cameras,
                });
            }
            summary.outcomes.push(self.run_job(job, progress)?);
        }

        summary.total_duration_secs = start.elapsed().as_secs_f64();
        log::info!(
            "Run finished: {} calibrated, {} already calibrated",
            summary.calibrated(),
            summary.skipped()
        );
        Ok(summary)
    }

    fn run_job(
        &mut self,
        job: &CameraJob,
        progress: &dyn ProgressCallback,
    ) -> CoreResult<CameraOutcome> {
        let mut outcome = CameraOutcome {
            session: job.session.clone(),
            camera: job.camera.clone(),
            state: job.state,
            output_path: job.output_path.clone(),
            videos: job.videos.len(),
            error: None,
            duration_secs: None,
        };

        // Checked again here; the file may have appeared since planning
        if job.state == CameraState::CalibratedExisting || job.output_path.exists() {
            log::info!(
                "Camera {} already calibrated: {}",
                job.camera,
                job.output_path.display()
            );
            progress.on_progress(ProgressEvent::CameraSkipped {
                camera: job.camera.clone(),
                output_path: job.output_path.clone(),
            });
            outcome.state = CameraState::CalibratedExisting;
            return Ok(outcome);
        }

        outcome.state = CameraState::Calibrating;
        log::info!(
            "Calibrating camera {} from {} video(s)",
            job.camera,
            job.videos.len()
        );
        progress.on_progress(ProgressEvent::CameraStart {
            camera: job.camera.clone(),
            session: job.session.clone(),
            videos: job.videos.len(),
        });

        let start = Instant::now();
        let result = self.calibrate_camera(job, progress);
        let duration = start.elapsed();

        match result {
            Ok(error) => {
                progress.on_progress(ProgressEvent::CameraComplete {
                    camera: job.camera.clone(),
                    output_path: job.output_path.clone(),
                    error,
                    duration,
                });
                outcome.state = CameraState::Done;
                outcome.error = Some(error);
                outcome.duration_secs = Some(duration.as_secs_f64());
                Ok(outcome)
            }
            Err(e) => {
                outcome.state = CameraState::Failed;
                log::error!(
                    "Camera {} in {} is {:?}: {}",
                    job.camera,
                    job.session.display(),
                    outcome.state,
                    e
                );
                progress.on_progress(ProgressEvent::CameraFailed {
                    camera: job.camera.clone(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Runs the pipeline and writes the file; returns the reprojection error.
    fn calibrate_camera(
        &self,
        job: &CameraJob,
        progress: &dyn ProgressCallback,
    ) -> CoreResult<f64> {
        let pipeline = CameraPipeline {
            source: &self.source,
            detector: &self.detector,
            calibrator: &self.calibrator,
            config: &self.config,
            progress,
        };
        let mut rng = camera_rng(self.config.selection_seed, &job.session, &job.camera);
        let intrinsics = pipeline.run(&job.camera, &job.videos, &mut rng)?;
        write_intrinsics(&job.output_path, &intrinsics)?;
        log::info!(
            "Saved intrinsics for camera {} to {}",
            job.camera,
            job.output_path.display()
        );
        Ok(intrinsics.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::VideoParams;
    use crate::external::mocks::{MockCalibrator, MockMarkerDetector, MockVideoSource};
    use crate::progress::NullProgressCallback;
    use std::sync::Mutex;
    use tempfile::{TempDir, tempdir};

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn first_draw(seed: Option<u64>, session: &str, camera: &str) -> u64 {
        use rand::Rng;
        camera_rng(seed, Path::new(session), camera).r#gen()
    }

    #[test]
    #[cfg(unix)]
    fn test_camera_id_from_non_utf8_stem() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let pattern = CameraPattern::new("cam([A-Z])").unwrap();
        let name = OsStr::from_bytes(b"calib-camC-\xff.avi");
        let path = Path::new("/data/s1/raw").join(name);
        assert_eq!(pattern.camera_id(&path), Some("C".to_string()));
    }

    #[test]
    fn test_camera_rng_is_stable_per_camera() {
        let a = first_draw(Some(7), "/data/s1", "A");
        assert_eq!(a, first_draw(Some(7), "/data/s1", "A"));
        // Only the session directory name counts, not where the tree lives
        assert_eq!(a, first_draw(Some(7), "/mnt/copy/s1", "A"));
        assert_ne!(a, first_draw(Some(7), "/data/s1", "B"));
        assert_ne!(a, first_draw(Some(7), "/data/s2", "A"));
        assert_ne!(a, first_draw(Some(8), "/data/s1", "A"));
    }

    fn config(root: &Path) -> PipelineConfig {
        let mut config = PipelineConfig::new(root, "raw", "calib", "calib-", "cam([A-Z])");
        config.selection_seed = Some(11);
        config
    }

    fn params() -> VideoParams {
        VideoParams {
            width: 800,
            height: 600,
            fps: 25.0,
            frame_count: None,
        }
    }

    fn tree() -> TempDir {
        let dir = tempdir().unwrap();
        for name in ["calib-camA-1.avi", "calib-camA-2.AVI", "calib-camB-1.avi"] {
            touch(&dir.path().join("s1/raw").join(name));
        }
        dir
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ProgressCallback for Recorder {
        fn on_progress(&self, event: ProgressEvent) {
            let name = match event {
                ProgressEvent::SessionStart { .. } => "session",
                ProgressEvent::CameraSkipped { .. } => "skipped",
                ProgressEvent::CameraStart { .. } => "start",
                ProgressEvent::CameraComplete { .. } => "complete",
                ProgressEvent::CameraFailed { .. } => "failed",
                _ => return,
            };
            self.0.lock().unwrap().push(name.to_string());
        }
    }

    #[test]
    fn test_camera_pattern_requires_one_group() {
        assert!(CameraPattern::new("cam([A-Z])").is_ok());
        assert!(matches!(CameraPattern::new("cam[A-Z]"), Err(CoreError::Config(_))));
        assert!(matches!(
            CameraPattern::new("(cam)([A-Z])"),
            Err(CoreError::Config(_))
        ));
        assert!(matches!(CameraPattern::new("cam(["), Err(CoreError::Config(_))));
        // Non-capturing groups do not count
        assert!(CameraPattern::new("(?:cam)([A-Z])").is_ok());
    }

    #[test]
    fn test_camera_id_is_searched_in_stem() {
        let pattern = CameraPattern::new("cam([A-Z])").unwrap();
        assert_eq!(
            pattern.camera_id(Path::new("/s1/raw/calib-camA-1.avi")),
            Some("A".to_string())
        );
        assert_eq!(pattern.camera_id(Path::new("/s1/raw/calib-x-1.avi")), None);
    }

    #[test]
    fn test_find_videos_filters_prefix_and_extension() {
        let dir = tree();
        let raw = dir.path().join("s1/raw");
        touch(&raw.join("other-camA-1.avi"));
        touch(&raw.join("calib-camA-3.mp4"));
        fs::create_dir_all(raw.join("calib-dir.avi")).unwrap();

        let config = config(dir.path());
        let videos = find_calibration_videos(&config, &dir.path().join("s1")).unwrap();
        let names: Vec<String> = videos.iter().map(|v| get_filename_safe(v).unwrap()).collect();
        assert_eq!(names, vec!["calib-camA-1.avi", "calib-camA-2.AVI", "calib-camB-1.avi"]);
    }

    #[test]
    fn test_missing_raw_dir_yields_no_videos() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("s2")).unwrap();
        let config = config(dir.path());
        assert!(find_calibration_videos(&config, &dir.path().join("s2")).unwrap().is_empty());
    }

    #[test]
    fn test_group_by_camera_excludes_unmatched() {
        let pattern = CameraPattern::new("cam([A-Z])").unwrap();
        let groups = group_by_camera(
            &pattern,
            vec![
                PathBuf::from("calib-camB-1.avi"),
                PathBuf::from("calib-camA-1.avi"),
                PathBuf::from("calib-noid.avi"),
                PathBuf::from("calib-camA-2.avi"),
            ],
        );
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(groups["A"].len(), 2);
        assert_eq!(groups.values().map(Vec::len).sum::<usize>(), 3);
    }

    #[test]
    fn test_discover_sessions_sorted_dirs_only() {
        let dir = tempdir().unwrap();
        for name in ["s2", "s1", "s10"] {
            fs::create_dir_all(dir.path().join(name)).unwrap();
        }
        touch(&dir.path().join("notes.txt"));
        let sessions = discover_sessions(dir.path()).unwrap();
        let names: Vec<String> = sessions.iter().map(|s| get_filename_safe(s).unwrap()).collect();
        assert_eq!(names, vec!["s1", "s10", "s2"]);
    }

    #[test]
    fn test_missing_root_is_path_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            discover_sessions(&dir.path().join("absent")),
            Err(CoreError::PathError(_))
        ));
    }

    #[test]
    fn test_plan_marks_existing_outputs() {
        let dir = tree();
        touch(&dir.path().join("s1/calib/intrinsics_A.toml"));
        let walker = SessionWalker::new(
            config(dir.path()),
            MockVideoSource::new(),
            MockMarkerDetector::new(),
            MockCalibrator::new(),
        )
        .unwrap();

        let jobs = walker.plan().unwrap();
        let states: Vec<(&str, CameraState)> =
            jobs.iter().map(|j| (j.camera.as_str(), j.state)).collect();
        assert_eq!(
            states,
            vec![("A", CameraState::CalibratedExisting), ("B", CameraState::Pending)]
        );
        assert_eq!(jobs[0].videos.len(), 2);
    }

    #[test]
    fn test_run_emits_events_in_order() {
        let dir = tree();
        touch(&dir.path().join("s1/calib/intrinsics_A.toml"));
        let source = MockVideoSource::new();
        source.add_video(&dir.path().join("s1/raw/calib-camB-1.avi"), params(), &[4, 3], 10);
        let mut walker = SessionWalker::new(
            config(dir.path()),
            source,
            MockMarkerDetector::new(),
            MockCalibrator::new(),
        )
        .unwrap();

        let recorder = Recorder::default();
        let summary = walker.run(&recorder).unwrap();

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["session", "skipped", "start", "complete"]
        );
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.calibrated(), 1);
        assert_eq!(summary.outcomes[1].error, Some(0.42));
    }

    #[test]
    fn test_failure_stops_run_and_writes_nothing() {
        let dir = tree();
        let source = MockVideoSource::new();
        source.add_video(&dir.path().join("s1/raw/calib-camA-1.avi"), params(), &[4], 10);
        source.add_video(&dir.path().join("s1/raw/calib-camA-2.AVI"), params(), &[3], 10);
        let calibrator = MockCalibrator::failing("solver diverged");
        let mut walker = SessionWalker::new(
            config(dir.path()),
            source.clone(),
            MockMarkerDetector::new(),
            calibrator.clone(),
        )
        .unwrap();

        let recorder = Recorder::default();
        let result = walker.run(&recorder);

        assert!(matches!(result, Err(CoreError::Calibration(_))));
        assert_eq!(*recorder.0.lock().unwrap(), vec!["session", "start", "failed"]);
        // Camera B is never attempted
        assert_eq!(calibrator.calls().len(), 1);
        assert!(!dir.path().join("s1/calib").exists());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let dir = tempdir().unwrap();
        let mut config = config(dir.path());
        config.cam_regex = "cam".to_string();
        let result = SessionWalker::new(
            config,
            MockVideoSource::new(),
            MockMarkerDetector::new(),
            MockCalibrator::new(),
        );
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn test_empty_tree_runs_cleanly() {
        let dir = tempdir().unwrap();
        let mut walker = SessionWalker::new(
            config(dir.path()),
            MockVideoSource::new(),
            MockMarkerDetector::new(),
            MockCalibrator::new(),
        )
        .unwrap();
        let summary = walker.run(&NullProgressCallback).unwrap();
        assert!(summary.outcomes.is_empty());
    }
}
