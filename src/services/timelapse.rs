use crate::models::encode::{EncodeJob, EncodeOutcome, EncodeState, timelapse_output_path};
use crate::services::encoder_probe::ENCODER_PROGRAM;
use crate::services::photos::{PhotoError, list_photos};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDateTime;
use regex::Regex;
use std::fmt::Write as _;
use std::process::Stdio;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::runtime::Handle;

/// Name of the temporary concat script written next to the photos.
pub const SCRIPT_FILE_NAME: &str = "filelist.txt";

static PROGRESS_TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^out_time_(?:us|ms)=(\d+)$").expect("Invalid progress regex")
});

#[derive(Debug, Error)]
pub enum TimelapseError {
    #[error("No photos found in {0}")]
    NoPhotos(Utf8PathBuf),

    #[error("A timelapse is already being created")]
    AlreadyRunning,

    #[error(transparent)]
    Photos(#[from] PhotoError),
}

/// One line pair of the render script.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptEntry {
    pub file: String,
    /// `None` for the trailing sentinel entry
    pub duration: Option<f64>,
}

/// Ordered list of photos with per-entry display durations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderScript {
    pub entries: Vec<ScriptEntry>,
}

/// Build the script for `photos` shown `seconds_per_photo` each.
///
/// The last photo is repeated without a duration: concat-style encoders apply
/// a duration to the gap before the next entry, so without the repeat the
/// final photo would get no screen time. `n` photos give `n + 1` entries and
/// an empty list gives an empty script.
pub fn build_render_script(photos: &[String], seconds_per_photo: f64) -> RenderScript {
    let mut entries: Vec<ScriptEntry> = photos
        .iter()
        .map(|photo| ScriptEntry {
            file: photo.clone(),
            duration: Some(seconds_per_photo),
        })
        .collect();

    if let Some(last) = photos.last() {
        entries.push(ScriptEntry {
            file: last.clone(),
            duration: None,
        });
    }

    RenderScript { entries }
}

/// Quote a file name for a concat script line.
pub fn escape_concat_path(name: &str) -> String {
    name.replace('\'', r"'\''")
}

impl RenderScript {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Text in concat demuxer syntax.
    pub fn to_concat_document(&self) -> String {
        let mut document = String::new();
        for entry in &self.entries {
            let _ = writeln!(document, "file '{}'", escape_concat_path(&entry.file));
            if let Some(duration) = entry.duration {
                let _ = writeln!(document, "duration {}", duration);
            }
        }
        document
    }
}

/// Encoder binary and the output options passed to it.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderSettings {
    pub program: String,
    pub pixel_format: String,
    pub codec: String,
    pub preset: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            program: ENCODER_PROGRAM.to_string(),
            pixel_format: "yuv420p".to_string(),
            codec: "libx264".to_string(),
            preset: "medium".to_string(),
        }
    }
}

impl EncoderSettings {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Arguments for encoding `script` into `output`, overwriting it.
    pub fn arguments(&self, script: &Utf8Path, output: &Utf8Path) -> Vec<String> {
        [
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-f",
            "concat",
            "-safe",
            "0",
            "-i",
            script.as_str(),
            "-vsync",
            "vfr",
            "-pix_fmt",
            self.pixel_format.as_str(),
            "-c:v",
            self.codec.as_str(),
            "-preset",
            self.preset.as_str(),
            "-progress",
            "pipe:1",
            "-nostats",
            output.as_str(),
        ]
        .iter()
        .map(|arg| arg.to_string())
        .collect()
    }
}

/// Fraction of `total_seconds` encoded so far, from one `-progress` line.
///
/// Both `out_time_us` and `out_time_ms` carry microseconds.
pub fn parse_progress_line(line: &str, total_seconds: f64) -> Option<f32> {
    let line = line.trim();
    if line == "progress=end" {
        return Some(1.0);
    }
    if total_seconds <= 0.0 {
        return None;
    }

    let micros: f64 = PROGRESS_TIME_PATTERN.captures(line)?[1].parse().ok()?;
    Some((micros / 1_000_000.0 / total_seconds).clamp(0.0, 1.0) as f32)
}

/// Runs the external encoder for one job.
#[derive(Debug, Clone, Default)]
pub struct TimelapseService {
    settings: EncoderSettings,
}

impl TimelapseService {
    pub fn new(settings: EncoderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Write the script, run the encoder to completion and remove the script.
    ///
    /// Never fails: every problem becomes [`EncodeOutcome::Failed`]. The full
    /// standard error is kept in the outcome's diagnostics.
    pub async fn encode<P>(&self, job: &EncodeJob, on_progress: P) -> EncodeOutcome
    where
        P: Fn(f32) + Send,
    {
        let script_path = job.source_directory.join(SCRIPT_FILE_NAME);
        let script = build_render_script(&job.photos, job.seconds_per_photo);

        if let Err(e) = tokio::fs::write(&script_path, script.to_concat_document()).await {
            return EncodeOutcome::failed(format!(
                "Failed to write render script {}: {}",
                script_path, e
            ));
        }

        let outcome = self.run_encoder(job, &script_path, &on_progress).await;

        if let Err(e) = tokio::fs::remove_file(&script_path).await {
            tracing::debug!("Could not remove {}: {}", script_path, e);
        }

        outcome
    }

    async fn run_encoder<P>(
        &self,
        job: &EncodeJob,
        script_path: &Utf8Path,
        on_progress: &P,
    ) -> EncodeOutcome
    where
        P: Fn(f32) + Send,
    {
        let args = self.settings.arguments(script_path, &job.output_path);
        tracing::info!(
            "Encoding {} photo(s) at {}s each: {} {}",
            job.photos.len(),
            job.seconds_per_photo,
            self.settings.program,
            args.join(" ")
        );

        let spawned = Command::new(&self.settings.program)
            .args(&args)
            .current_dir(&job.source_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                return EncodeOutcome::failed(format!(
                    "Failed to start {}: {}",
                    self.settings.program, e
                ));
            }
        };

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text).await;
                text
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let total = job.total_seconds();
            let mut lines = BufReader::new(stdout).lines();
            let mut last_reported = -1.0f32;
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(fraction) = parse_progress_line(&line, total)
                    && fraction > last_reported
                {
                    last_reported = fraction;
                    on_progress(fraction);
                }
            }
        }

        let status = child.wait().await;
        let diagnostics = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        match status {
            Ok(status) if status.success() => {
                tracing::info!("Timelapse written to {}", job.output_path);
                EncodeOutcome::Completed {
                    output: job.output_path.clone(),
                }
            }
            Ok(status) => {
                tracing::error!("Encoder exited with {}", status);
                if !diagnostics.trim().is_empty() {
                    tracing::debug!("Encoder stderr:\n{}", diagnostics);
                    EncodeOutcome::failed(diagnostics)
                } else {
                    EncodeOutcome::failed(format!("Encoder exited with {}", status))
                }
            }
            Err(e) => EncodeOutcome::failed(format!("Failed to wait for encoder: {}", e)),
        }
    }
}

/// Snapshot the photo list of `directory` into a job.
///
/// Blocking (lists the directory). Fails with [`TimelapseError::NoPhotos`]
/// when there is nothing to encode.
pub fn prepare_job(
    directory: &Utf8Path,
    seconds_per_photo: f64,
    now: NaiveDateTime,
) -> Result<EncodeJob, TimelapseError> {
    if !directory.is_dir() {
        return Err(TimelapseError::NoPhotos(directory.to_path_buf()));
    }

    let photos = list_photos(directory)?;
    if photos.is_empty() {
        return Err(TimelapseError::NoPhotos(directory.to_path_buf()));
    }

    Ok(EncodeJob {
        source_directory: directory.to_path_buf(),
        output_path: timelapse_output_path(directory, now),
        photos,
        seconds_per_photo,
    })
}

/// One-job-at-a-time driver of [`TimelapseService`].
///
/// `Idle -> Running -> {Completed | Failed}`; a finished orchestrator accepts
/// the next job. The worker never touches presentation state: it reports only
/// through the callbacks given to [`start`](Self::start).
#[derive(Debug)]
pub struct TimelapseOrchestrator {
    service: Arc<TimelapseService>,
    state: EncodeState,
}

impl TimelapseOrchestrator {
    pub fn new(service: TimelapseService) -> Self {
        Self {
            service: Arc::new(service),
            state: EncodeState::Idle,
        }
    }

    pub fn state(&self) -> &EncodeState {
        &self.state
    }

    pub fn settings(&self) -> &EncoderSettings {
        self.service.settings()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// See [`prepare_job`].
    pub fn prepare_job(
        &self,
        directory: &Utf8Path,
        seconds_per_photo: f64,
        now: NaiveDateTime,
    ) -> Result<EncodeJob, TimelapseError> {
        prepare_job(directory, seconds_per_photo, now)
    }

    /// Dispatch `job` to a worker on `runtime`.
    ///
    /// `on_progress` and `on_finished` run on the worker; they must only hand
    /// their value to the presentation context. Feed the outcome back through
    /// [`finish`](Self::finish).
    pub fn start<P, F>(
        &mut self,
        job: EncodeJob,
        runtime: &Handle,
        on_progress: P,
        on_finished: F,
    ) -> Result<(), TimelapseError>
    where
        P: Fn(f32) + Send + Sync + 'static,
        F: FnOnce(EncodeOutcome) + Send + 'static,
    {
        if self.is_running() {
            return Err(TimelapseError::AlreadyRunning);
        }

        self.state = EncodeState::Running {
            output: job.output_path.clone(),
        };

        let service = Arc::clone(&self.service);
        runtime.spawn(async move {
            let outcome = service.encode(&job, on_progress).await;
            on_finished(outcome);
        });

        Ok(())
    }

    /// Record the worker's outcome.
    pub fn finish(&mut self, outcome: &EncodeOutcome) {
        self.state = match outcome {
            EncodeOutcome::Completed { output } => EncodeState::Completed(output.clone()),
            EncodeOutcome::Failed { message, .. } => EncodeState::Failed(message.clone()),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_script_repeats_last_photo() {
        let script = build_render_script(&names(&["a", "b", "c"]), 0.2);

        assert_eq!(script.len(), 4);
        let pairs: Vec<(&str, Option<f64>)> = script
            .entries
            .iter()
            .map(|e| (e.file.as_str(), e.duration))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("a", Some(0.2)),
                ("b", Some(0.2)),
                ("c", Some(0.2)),
                ("c", None)
            ]
        );
    }

    #[test]
    fn test_empty_script() {
        assert!(build_render_script(&[], 0.2).is_empty());
    }

    #[test]
    fn test_concat_document() {
        let script = build_render_script(&names(&["it's.jpg"]), 0.5);

        assert_eq!(
            script.to_concat_document(),
            "file 'it'\\''s.jpg'\nduration 0.5\nfile 'it'\\''s.jpg'\n"
        );
    }

    #[test]
    fn test_arguments_order() {
        let args = EncoderSettings::default()
            .arguments(Utf8Path::new("/p/filelist.txt"), Utf8Path::new("/p/out.mp4"));

        let joined = args.join(" ");
        assert!(joined.contains("-f concat -safe 0 -i /p/filelist.txt"));
        assert!(joined.contains("-vsync vfr -pix_fmt yuv420p -c:v libx264 -preset medium"));
        assert!(args.contains(&"-y".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/p/out.mp4"));
    }

    #[test]
    fn test_parse_progress() {
        assert_eq!(parse_progress_line("out_time_us=500000", 1.0), Some(0.5));
        assert_eq!(parse_progress_line("out_time_ms=3000000", 2.0), Some(1.0));
        assert_eq!(parse_progress_line("progress=end", 2.0), Some(1.0));
        assert_eq!(parse_progress_line("frame=12", 2.0), None);
        assert_eq!(parse_progress_line("out_time_us=N/A", 2.0), None);
    }

    #[test]
    fn test_prepare_job_without_photos() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let orchestrator = TimelapseOrchestrator::new(TimelapseService::default());
        let now = chrono::Local::now().naive_local();

        let result = orchestrator.prepare_job(&path, 0.2, now);
        assert!(matches!(result, Err(TimelapseError::NoPhotos(_))));

        let missing = orchestrator.prepare_job(&path.join("missing"), 0.2, now);
        assert!(matches!(missing, Err(TimelapseError::NoPhotos(_))));
    }

    #[test]
    fn test_finish_allows_retry() {
        let mut orchestrator = TimelapseOrchestrator::new(TimelapseService::default());
        orchestrator.state = EncodeState::Running {
            output: "/p/out.mp4".into(),
        };

        orchestrator.finish(&EncodeOutcome::failed("boom"));

        assert_eq!(orchestrator.state(), &EncodeState::Failed("boom".to_string()));
        assert!(!orchestrator.is_running());
    }

    proptest! {
        #[test]
        fn prop_script_has_one_extra_entry(
            photos in proptest::collection::vec("[a-z0-9_]{1,12}\\.jpg", 1..40),
            seconds in 0.05f64..0.5,
        ) {
            let script = build_render_script(&photos, seconds);
            prop_assert_eq!(script.len(), photos.len() + 1);
            prop_assert!(script.entries[..photos.len()].iter().all(|e| e.duration == Some(seconds)));
            let last = script.entries.last().unwrap();
            prop_assert_eq!(&last.file, photos.last().unwrap());
            prop_assert_eq!(last.duration, None);
        }
    }
}
