//! Batch caption rendering.
//!
//! Renders every job of a jobs file. Each job is an independent render
//! call with its own resolved config and canvas, so jobs run in parallel
//! with [rayon](https://docs.rs/rayon) and one failing job never aborts
//! the others.
//!
//! ## Jobs File
//!
//! ```toml
//! # Overlay applied to every job (same keys as a config file)
//! [defaults]
//! canvas = { size = [1080, 1080] }
//! text = { font_path = "fonts/Impact.ttf" }
//!
//! [[job]]
//! text = "Monday again"
//! image = "photos/cat.jpg"
//! output = "out/monday.png"
//!
//! [[job]]
//! text = "Top text"
//! image = "photos/dog.jpg"
//! output = "out/top.jpg"
//! config = { margins = { top = 0.05 }, panel = { mode = "attach_to_top" } }
//! ```
//!
//! Relative `image`, `output` and `font_path` values resolve against the
//! jobs file's directory.
//!
//! ## Config Layers
//!
//! ```text
//! stock defaults → --config file → [defaults] → job config
//! ```
//!
//! ## Progress
//!
//! When given a sender, a [`BatchEvent`] is emitted as each job finishes.
//! Jobs finish in any order; the returned [`BatchReport`] lists them in
//! file order.

use crate::config::{CaptionConfig, ConfigError, resolve_config};
use crate::imaging::{
    CaptionError, FontBackend, TextBackend, compose_caption, load_image, save_image,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Jobs file error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a single job failed.
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Caption(#[from] CaptionError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parsed jobs file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobsFile {
    /// Config overlay shared by all jobs.
    #[serde(default)]
    pub defaults: Option<toml::Value>,
    #[serde(default, rename = "job")]
    pub jobs: Vec<JobSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSpec {
    pub text: String,
    pub image: PathBuf,
    pub output: PathBuf,
    /// Config overlay for this job only.
    #[serde(default)]
    pub config: Option<toml::Value>,
}

/// Progress event sent as each job finishes.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Rendered {
        /// 1-based position in the jobs file.
        index: usize,
        total: usize,
        output: PathBuf,
        width: u32,
        height: u32,
    },
    Failed {
        index: usize,
        total: usize,
        output: PathBuf,
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedJob {
    pub index: usize,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedJob {
    pub index: usize,
    pub output: PathBuf,
    pub error: String,
}

/// Outcome of a batch run, in jobs-file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub rendered: Vec<RenderedJob>,
    pub failed: Vec<FailedJob>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.rendered.len() + self.failed.len()
    }
}

/// Parse a jobs file.
pub fn load_jobs(jobs_path: &Path) -> Result<JobsFile, ProcessError> {
    let content = std::fs::read_to_string(jobs_path)?;
    Ok(toml::from_str(&content)?)
}

/// Render every job in `jobs_path`, loading each job's configured font.
///
/// `base` is the config every job starts from: the stock defaults, or a
/// resolved `--config` file.
pub fn run_batch(
    jobs_path: &Path,
    base: toml::Value,
    progress: Option<Sender<BatchEvent>>,
) -> Result<BatchReport, ProcessError> {
    run_batch_with_backend(jobs_path, base, progress, |config| {
        let font_path = config
            .text
            .font_path
            .as_deref()
            .ok_or(CaptionError::MissingFont)?;
        Ok(FontBackend::open(font_path)?)
    })
}

/// Render jobs with backends built by `open_backend` (allows testing with mock).
pub fn run_batch_with_backend<B, F>(
    jobs_path: &Path,
    base: toml::Value,
    progress: Option<Sender<BatchEvent>>,
    open_backend: F,
) -> Result<BatchReport, ProcessError>
where
    B: TextBackend,
    F: Fn(&CaptionConfig) -> Result<B, CaptionError> + Sync,
{
    let jobs_file = load_jobs(jobs_path)?;
    let jobs_dir = jobs_path.parent().unwrap_or(Path::new("."));
    let total = jobs_file.jobs.len();
    tracing::info!(jobs = total, file = %jobs_path.display(), "starting batch");

    let outcomes: Vec<(usize, PathBuf, Result<(u32, u32), JobError>)> = jobs_file
        .jobs
        .par_iter()
        .enumerate()
        .map(|(i, job)| {
            let index = i + 1;
            let output = jobs_dir.join(&job.output);
            let result = render_job(
                job,
                jobs_dir,
                &base,
                jobs_file.defaults.as_ref(),
                &open_backend,
            );

            let event = match &result {
                Ok((width, height)) => {
                    tracing::info!(index, output = %output.display(), "rendered");
                    BatchEvent::Rendered {
                        index,
                        total,
                        output: output.clone(),
                        width: *width,
                        height: *height,
                    }
                }
                Err(e) => {
                    tracing::warn!(index, output = %output.display(), error = %e, "job failed");
                    BatchEvent::Failed {
                        index,
                        total,
                        output: output.clone(),
                        error: e.to_string(),
                    }
                }
            };
            if let Some(tx) = &progress {
                tx.send(event).ok();
            }

            (index, output, result)
        })
        .collect();

    let mut report = BatchReport::default();
    for (index, output, result) in outcomes {
        match result {
            Ok((width, height)) => report.rendered.push(RenderedJob {
                index,
                output,
                width,
                height,
            }),
            Err(e) => report.failed.push(FailedJob {
                index,
                output,
                error: e.to_string(),
            }),
        }
    }
    Ok(report)
}

/// Resolve one job's config, render it and save the result.
fn render_job<B, F>(
    job: &JobSpec,
    jobs_dir: &Path,
    base: &toml::Value,
    defaults: Option<&toml::Value>,
    open_backend: &F,
) -> Result<(u32, u32), JobError>
where
    B: TextBackend,
    F: Fn(&CaptionConfig) -> Result<B, CaptionError>,
{
    let layers = defaults.cloned().into_iter().chain(job.config.clone());
    let mut config = resolve_config(base.clone(), layers)?;
    config.resolve_paths(jobs_dir);

    let backend = open_backend(&config)?;
    let photo = load_image(&jobs_dir.join(&job.image)).map_err(CaptionError::from)?;
    let canvas = compose_caption(&backend, &job.text, &photo, &config)?;

    let output = jobs_dir.join(&job.output);
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    save_image(&canvas, &output).map_err(CaptionError::from)?;
    Ok(canvas.dimensions())
}

/// Write the report as pretty JSON.
pub fn write_report(report: &BatchReport, path: &Path) -> Result<(), ProcessError> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}
