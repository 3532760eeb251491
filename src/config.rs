use std::path::{Path, PathBuf};

use ::config::{Config, ConfigError, Environment, File};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::AppError;
use crate::vision::MatchConfig;
use crate::workflow::{presets, Workflow};

pub const ENV_PREFIX: &str = "EMU_FARMER";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub adb_path: PathBuf,
    /// Target a specific device with `adb -s`.
    pub serial: Option<String>,
    pub assets_dir: PathBuf,
    pub template_cache_capacity: usize,
    pub matching: MatchConfig,
    pub idle_delay_ms: u64,
    pub stop_key: String,
    /// Name of the workflow to run.
    pub workflow: String,
    /// User workflows; these shadow built-ins of the same name.
    pub workflows: IndexMap<String, Workflow>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            adb_path: PathBuf::from("adb"),
            serial: None,
            assets_dir: PathBuf::from("assets"),
            template_cache_capacity: 10,
            matching: MatchConfig::default(),
            idle_delay_ms: 2000,
            stop_key: "`".to_string(),
            workflow: presets::FARMING.to_string(),
            workflows: IndexMap::new(),
        }
    }
}

impl Configuration {
    /// Layers an optional TOML file under `EMU_FARMER__*` environment
    /// variables, e.g. `EMU_FARMER__IDLE_DELAY_MS=500`.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let configuration: Configuration = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.matching.validate().map_err(ConfigError::Message)?;
        let mut key = self.stop_key.chars();
        if !matches!((key.next(), key.next()), (Some(c), None) if !c.is_whitespace()) {
            return Err(ConfigError::Message("Stop key must be a single character".to_string()).into());
        }
        for (name, workflow) in &self.workflows {
            workflow
                .validate()
                .map_err(|e| AppError::Workflow(format!("{}: {}", name, e)))?;
        }
        Ok(())
    }

    pub fn resolve_workflow(&self, name: &str) -> Option<Workflow> {
        self.workflows
            .get(name)
            .cloned()
            .or_else(|| presets::builtin().shift_remove(name))
    }

    /// Built-in names first, then user-only ones.
    pub fn workflow_names(&self) -> Vec<String> {
        let mut names: Vec<String> = presets::builtin().into_keys().collect();
        for name in self.workflows.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}
