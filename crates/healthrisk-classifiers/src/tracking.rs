//! File-backed experiment tracking.
//!
//! Layout under the tracking root:
//!
//! ```text
//! <root>/<experiment>/<run_id>/meta.json
//!                             /params/<name>       (value)
//!                             /metrics/<name>      (one "<unix_millis> <value> <step>" line per log call)
//!                             /artifacts/...       (text reports, model/model.json)
//! ```
//!
//! Every write failure surfaces as [`RiskError::Upstream`].

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::pipeline::RiskPipeline;

/// File name of a logged pipeline inside its artifact directory.
pub const MODEL_FILE: &str = "model.json";

fn upstream(action: &str, path: &Path, e: impl std::fmt::Display) -> RiskError {
    RiskError::upstream(format!("tracking store: cannot {} {}: {}", action, path.display(), e))
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Names that become single path components.
fn check_key(kind: &str, key: &str) -> Result<()> {
    if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
        return Err(RiskError::invalid_state(format!(
            "invalid {} name '{}'",
            kind, key
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: String,
    pub run_name: String,
    pub experiment: String,
    pub status: RunStatus,
    pub start_time: String,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TrackingStore {
    root: PathBuf,
    experiment: String,
}

impl TrackingStore {
    /// Store rooted at `root`, logging into the default experiment.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        TrackingStore {
            root: root.into(),
            experiment: crate::config::EXPERIMENT_NAME.to_string(),
        }
    }

    /// Switch to (and lazily create) experiment `name`.
    pub fn experiment(mut self, name: &str) -> Self {
        self.experiment = name.to_string();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn experiment_name(&self) -> &str {
        &self.experiment
    }

    pub fn experiment_dir(&self) -> PathBuf {
        self.root.join(&self.experiment)
    }

    pub fn start_run(&self, run_name: &str) -> Result<Run> {
        check_key("experiment", &self.experiment)?;
        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let dir = self.experiment_dir().join(&run_id);
        for sub in ["params", "metrics", "artifacts"] {
            let p = dir.join(sub);
            fs::create_dir_all(&p).map_err(|e| upstream("create", &p, e))?;
        }
        let run = Run {
            dir,
            meta: RunMeta {
                run_id,
                run_name: run_name.to_string(),
                experiment: self.experiment.clone(),
                status: RunStatus::Running,
                start_time: now_rfc3339(),
                end_time: None,
            },
        };
        run.write_meta()?;
        log::debug!(
            "started run '{}' ({}) in experiment '{}'",
            run.meta.run_name,
            run.meta.run_id,
            run.meta.experiment
        );
        Ok(run)
    }

    /// Metadata of every run in the current experiment, oldest first.
    pub fn list_runs(&self) -> Result<Vec<RunMeta>> {
        let dir = self.experiment_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut runs = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| upstream("read", &dir, e))? {
            let meta_path = entry?.path().join("meta.json");
            if meta_path.is_file() {
                let text = fs::read_to_string(&meta_path)?;
                runs.push(serde_json::from_str::<RunMeta>(&text)?);
            }
        }
        runs.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(runs)
    }
}

/// An open run. Call [`Run::finish`] once everything is logged.
#[derive(Debug)]
pub struct Run {
    dir: PathBuf,
    meta: RunMeta,
}

impl Run {
    pub fn run_id(&self) -> &str {
        &self.meta.run_id
    }

    pub fn run_name(&self) -> &str {
        &self.meta.run_name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn meta(&self) -> &RunMeta {
        &self.meta
    }

    fn write_meta(&self) -> Result<()> {
        let path = self.dir.join("meta.json");
        let json = serde_json::to_string_pretty(&self.meta)?;
        fs::write(&path, json).map_err(|e| upstream("write", &path, e))
    }

    pub fn log_param(&self, name: &str, value: impl ToString) -> Result<()> {
        check_key("param", name)?;
        let path = self.dir.join("params").join(name);
        fs::write(&path, value.to_string()).map_err(|e| upstream("write", &path, e))
    }

    pub fn log_metric(&self, name: &str, value: f64) -> Result<()> {
        self.log_metric_at(name, value, 0)
    }

    /// Append one observation of metric `name`.
    pub fn log_metric_at(&self, name: &str, value: f64, step: u64) -> Result<()> {
        check_key("metric", name)?;
        let path = self.dir.join("metrics").join(name);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| upstream("open", &path, e))?;
        writeln!(file, "{} {} {}", Utc::now().timestamp_millis(), value, step)
            .map_err(|e| upstream("append to", &path, e))
    }

    fn artifact_path(&self, artifact_path: &str) -> Result<PathBuf> {
        let rel = Path::new(artifact_path);
        let escapes = rel.components().any(|c| {
            !matches!(c, std::path::Component::Normal(_))
        });
        if artifact_path.is_empty() || escapes {
            return Err(RiskError::invalid_state(format!(
                "artifact path '{}' must be relative and stay inside the run",
                artifact_path
            )));
        }
        let full = self.dir.join("artifacts").join(rel);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| upstream("create", parent, e))?;
        }
        Ok(full)
    }

    /// Store `text` as the artifact file `artifact_path` (e.g.
    /// `"model_comparison/best_model.txt"`).
    pub fn log_text(&self, text: &str, artifact_path: &str) -> Result<PathBuf> {
        let path = self.artifact_path(artifact_path)?;
        fs::write(&path, text).map_err(|e| upstream("write", &path, e))?;
        Ok(path)
    }

    /// Serialize `pipeline` to `artifacts/<artifact_dir>/model.json`.
    pub fn log_model(&self, pipeline: &RiskPipeline, artifact_dir: &str) -> Result<PathBuf> {
        let path = self.artifact_path(&format!("{}/{}", artifact_dir, MODEL_FILE))?;
        pipeline
            .save(&path)
            .map_err(|e| upstream("write", &path, e))?;
        Ok(path)
    }

    fn close(mut self, status: RunStatus) -> Result<RunMeta> {
        self.meta.status = status;
        self.meta.end_time = Some(now_rfc3339());
        self.write_meta()?;
        Ok(self.meta)
    }

    pub fn finish(self) -> Result<RunMeta> {
        self.close(RunStatus::Finished)
    }

    /// Mark the run failed; used when training aborts mid-run.
    pub fn fail(self) -> Result<RunMeta> {
        self.close(RunStatus::Failed)
    }
}
