use std::path::PathBuf;

use anyhow::Result;
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use healthrisk_classifiers::serving::ArtifactSource;

pub const TRACKING_ROOT_ENV: &str = "HEALTHRISK_TRACKING_ROOT";
pub const MODEL_PATH_ENV: &str = "HEALTHRISK_MODEL_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    pub tracking_root: PathBuf,
    /// Fixed artifact; skips latest-model discovery when set.
    pub model_path: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    /// Shown in the sidebar until a model is loaded.
    pub model_label: String,
}

impl Default for ServeConfig {
    fn default() -> Self {
        ServeConfig {
            tracking_root: PathBuf::from("mlruns"),
            model_path: None,
            host: String::from("127.0.0.1"),
            port: 8501,
            model_label: String::from("Logistic Regression"),
        }
    }
}

impl ServeConfig {
    /// Defaults, then environment, then CLI flags.
    pub fn from_arguments(matches: &ArgMatches) -> Result<Self> {
        let mut config = ServeConfig::default();
        config.apply_env(|key| std::env::var(key).ok());

        if let Some(root) = matches.get_one::<PathBuf>("tracking_root") {
            config.tracking_root = root.clone();
        }
        if let Some(model) = matches.get_one::<PathBuf>("model_path") {
            config.model_path = Some(model.clone());
        }
        if let Some(host) = matches.get_one::<String>("host") {
            config.host = host.clone();
        }
        if let Some(port) = matches.get_one::<u16>("port") {
            config.port = *port;
        }
        Ok(config)
    }

    /// Apply `HEALTHRISK_TRACKING_ROOT` / `HEALTHRISK_MODEL_PATH` through
    /// `lookup`. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(TRACKING_ROOT_ENV).filter(|v| !v.is_empty()) {
            self.tracking_root = PathBuf::from(root);
        }
        if let Some(model) = lookup(MODEL_PATH_ENV).filter(|v| !v.is_empty()) {
            self.model_path = Some(PathBuf::from(model));
        }
    }

    pub fn artifact_source(&self) -> ArtifactSource {
        match &self.model_path {
            Some(path) => ArtifactSource::Fixed(path.clone()),
            None => ArtifactSource::Latest {
                tracking_root: self.tracking_root.clone(),
            },
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_defaults() {
        let mut cfg = ServeConfig::default();
        cfg.apply_env(|key| match key {
            TRACKING_ROOT_ENV => Some("/srv/runs".to_string()),
            MODEL_PATH_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(cfg.tracking_root, PathBuf::from("/srv/runs"));
        assert_eq!(
            cfg.artifact_source(),
            ArtifactSource::Latest {
                tracking_root: PathBuf::from("/srv/runs")
            }
        );
    }

    #[test]
    fn fixed_model_path_wins() {
        let cfg = ServeConfig {
            model_path: Some(PathBuf::from("model.json")),
            ..ServeConfig::default()
        };
        assert_eq!(
            cfg.artifact_source(),
            ArtifactSource::Fixed(PathBuf::from("model.json"))
        );
        assert_eq!(cfg.bind_address(), "127.0.0.1:8501");
    }
}
