use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::dates::{build_exclusions, expand_top_dirs, DateWindow, DirConvention};
use crate::decode::RecordFormat;
use crate::error::{PipelineError, Result};
use crate::pipeline::PipelineParams;

/// One pipeline run, as loaded from a TOML file.
#[derive(Debug, Deserialize)]
pub struct RunConfig {
    /// Prefix for every scanned directory; normally ends with `/`.
    pub base_path: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// `day`, `month-day` or `full`.
    #[serde(default = "default_convention")]
    pub convention: String,
    pub file_patterns: Vec<String>,
    #[serde(default)]
    pub grep_patterns: Vec<String>,
    /// `none` or `avro`.
    #[serde(default = "default_format")]
    pub format: String,
    /// Widen the exclusion padding beyond the default single day.
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    /// JSON-lines output; `.gz` suffix compresses. Absent means stdout.
    pub out_file: Option<PathBuf>,
    #[serde(default)]
    pub announce_files: bool,
}

fn default_convention() -> String {
    "day".to_string()
}

fn default_format() -> String {
    "none".to_string()
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: RunConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Expand the date window into concrete pipeline parameters. Fatal
    /// configuration errors (bad convention, bad format, reversed window)
    /// surface here.
    pub fn to_params(&self) -> Result<PipelineParams> {
        let window = DateWindow::new(self.start_date, self.end_date)?;
        let convention: DirConvention = self.convention.parse()?;
        let format: RecordFormat = self.format.parse()?;
        let top_dirs = expand_top_dirs(&self.base_path, &window, convention);
        let exclusions =
            build_exclusions(self.min_date, self.max_date, &window, &top_dirs, convention)?;
        Ok(PipelineParams {
            file_patterns: self.file_patterns.clone(),
            top_dirs: top_dirs.into_iter().collect(),
            exclusions,
            grep_patterns: self.grep_patterns.clone(),
            format,
            announce_files: self.announce_files,
        })
    }
}
