use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::report::DEFAULT_TITLE;

pub const DEFAULT_SUFFIX: &str = "_accessibility_results.txt";
const CONFIG_FILE: &str = "a11y_report";
const ENV_PREFIX: &str = "A11Y";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Where reports go; defaults to next to the pane dump.
    pub output_dir: Option<PathBuf>,
    pub report_suffix: String,
    pub title: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            output_dir: None,
            report_suffix: DEFAULT_SUFFIX.to_string(),
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

impl Settings {
    /// Defaults, then `a11y_report.toml` if present, then `A11Y_*` env vars.
    pub fn load() -> Result<Self> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name(CONFIG_FILE).required(false))
                .add_source(Environment::with_prefix(ENV_PREFIX)),
        )
    }

    fn from_builder(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let settings = builder
            .set_default("report_suffix", DEFAULT_SUFFIX)?
            .set_default("title", DEFAULT_TITLE)?
            .build()
            .context("loading settings")?
            .try_deserialize()
            .context("parsing settings")?;
        Ok(settings)
    }
}
