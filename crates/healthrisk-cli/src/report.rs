//! Self-contained HTML report of a training run.
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use maud::{html, Markup, PreEscaped, DOCTYPE};

use healthrisk_classifiers::metrics::Metrics;

use crate::train::input::TrainConfig;
use crate::train::runner::TrainingSummary;

const STYLE: &str = "
body { font-family: sans-serif; margin: 2em auto; max-width: 960px; color: #222; }
h1 { border-bottom: 2px solid #2a6f97; padding-bottom: .3em; }
table { border-collapse: collapse; margin: 1em 0; }
th, td { border: 1px solid #ccc; padding: 4px 10px; text-align: right; }
th:first-child, td:first-child { text-align: left; }
tr.best { background-color: #e6f4ea; font-weight: bold; }
.code-container { background-color: #f5f5f5; padding: 10px; border-radius: 5px;
    overflow-x: auto; font-family: monospace; white-space: pre-wrap; }
";

/// A titled block of report content.
pub struct ReportSection {
    title: String,
    content: Vec<Markup>,
}

impl ReportSection {
    pub fn new(title: &str) -> Self {
        ReportSection {
            title: title.to_string(),
            content: Vec::new(),
        }
    }

    pub fn add_content(&mut self, markup: Markup) {
        self.content.push(markup);
    }

    fn render(&self) -> Markup {
        html! {
            section {
                h2 { (self.title) }
                @for block in &self.content {
                    (block)
                }
            }
        }
    }
}

pub struct Report {
    title: String,
    subtitle: String,
    sections: Vec<ReportSection>,
}

impl Report {
    pub fn new(title: &str, subtitle: &str) -> Self {
        Report {
            title: title.to_string(),
            subtitle: subtitle.to_string(),
            sections: Vec::new(),
        }
    }

    pub fn add_section(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    pub fn render(&self) -> Markup {
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    title { (self.title) }
                    style { (PreEscaped(STYLE)) }
                }
                body {
                    h1 { (self.title) }
                    p { em { (self.subtitle) } }
                    @for section in &self.sections {
                        (section.render())
                    }
                }
            }
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, self.render().into_string())
            .with_context(|| format!("Failed to write report: {}", path.display()))
    }
}

fn metrics_table(results: &[(String, Metrics)], best: &str) -> Markup {
    html! {
        table {
            thead {
                tr {
                    th { "Model" }
                    @for name in Metrics::NAMES {
                        th { (name) }
                    }
                }
            }
            tbody {
                @for (model, metrics) in results {
                    tr class=[(model == best).then_some("best")] {
                        td { (model) }
                        @for v in metrics.values() {
                            td { (format!("{:.4}", v)) }
                        }
                    }
                }
            }
        }
    }
}

/// Comparison table, best model and the configuration used.
pub fn write_training_report(
    config: &TrainConfig,
    summary: &TrainingSummary,
    path: &Path,
) -> Result<()> {
    let mut report = Report::new(
        "HealthRisk Training Report",
        &format!(
            "Experiment {} | generated {}",
            config.experiment_name,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ),
    );

    let mut comparison = ReportSection::new("Model Comparison");
    comparison.add_content(html! {
        p {
            "Test-set metrics of every trained model. Models are ranked by recall, "
            "so the highlighted row minimizes missed at-risk patients."
        }
        (metrics_table(&summary.results, &summary.best_model))
        p {
            "Best model based on Recall: " strong { (summary.best_model) }
        }
        p { "Summary run: " code { (summary.summary_run_id) } }
    });
    report.add_section(comparison);

    let mut config_section = ReportSection::new("Configuration");
    config_section.add_content(html! {
        div class="code-container" {
            pre {
                code { (serde_json::to_string_pretty(config)?) }
            }
        }
    });
    report.add_section(config_section);

    report.save_to_file(path)
}
