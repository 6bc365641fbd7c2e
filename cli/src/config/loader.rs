//! Layered configuration loader for tAIke
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. One config file: --config file/dir, else ./taike.{json,toml,yaml},
//!    ./.taike/config.*, or `dirs::config_dir()`/taike/config.*
//! 3. `TAIKE__SECTION__KEY` environment variables
//! 4. Deployment variables `RUNPOD_API_URL` and `MCP_URL`
//! 5. Command-line flags

use anyhow::{anyhow, Context, Result};
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};
use taike_core::config::AppConfig;
use tracing::debug;

/// Extensions tried for every candidate file, in order
const CONFIG_EXTENSIONS: [&str; 3] = ["json", "toml", "yaml"];

/// First existing `dir/stem.<ext>`
fn find_with_stem(dir: &Path, stem: &str) -> Option<PathBuf> {
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .find(|candidate| candidate.is_file())
}

/// Discovery order without an explicit `--config`
fn discover(cwd: &Path, user_config_dir: Option<&Path>) -> Option<PathBuf> {
    find_with_stem(cwd, "taike")
        .or_else(|| find_with_stem(&cwd.join(".taike"), "config"))
        .or_else(|| user_config_dir.and_then(|dir| find_with_stem(&dir.join("taike"), "config")))
}

/// CLI configuration loader
#[derive(Debug, Default)]
pub struct CliConfigLoader {
    /// Override config file/directory path
    config_override: Option<PathBuf>,
    /// Flag overrides
    generate_url_override: Option<String>,
    mcp_url_override: Option<String>,
    database_override: Option<String>,
    max_iterations_override: Option<usize>,
    /// Read `TAIKE__*` and deployment variables
    use_env: bool,
}

impl CliConfigLoader {
    /// Create a new loader
    pub fn new() -> Self {
        Self {
            use_env: true,
            ..Self::default()
        }
    }

    /// Set config file/directory override
    pub fn with_config_override(mut self, path: PathBuf) -> Self {
        self.config_override = Some(path);
        self
    }

    pub fn with_generate_url_override(mut self, url: String) -> Self {
        self.generate_url_override = Some(url);
        self
    }

    pub fn with_mcp_url_override(mut self, url: String) -> Self {
        self.mcp_url_override = Some(url);
        self
    }

    pub fn with_database_override(mut self, path: String) -> Self {
        self.database_override = Some(path);
        self
    }

    pub fn with_max_iterations_override(mut self, max_iterations: usize) -> Self {
        self.max_iterations_override = Some(max_iterations);
        self
    }

    /// Ignore the process environment
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Load, merge and validate configuration
    pub fn load(&self) -> Result<AppConfig> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&AppConfig::default()).context("Failed to encode default config")?,
        );

        if let Some(path) = self.config_file()? {
            debug!("Using config file: {}", path.display());
            builder = builder.add_source(File::from(path.as_path()));
        }

        if self.use_env {
            builder = builder.add_source(
                Environment::with_prefix("TAIKE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let mut config: AppConfig = builder
            .build()
            .context("Failed to merge configuration sources")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        if self.use_env {
            if let Ok(url) = std::env::var("RUNPOD_API_URL") {
                config.generation.endpoint = Some(url);
            }
            if let Ok(url) = std::env::var("MCP_URL") {
                config.mcp.url = url;
            }
        }

        self.apply_overrides(&mut config);

        config
            .validate()
            .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(url) = &self.generate_url_override {
            config.generation.endpoint = Some(url.clone());
        }
        if let Some(url) = &self.mcp_url_override {
            config.mcp.url = url.clone();
        }
        if let Some(path) = &self.database_override {
            config.data.database_path = path.clone();
        }
        if let Some(max_iterations) = self.max_iterations_override {
            config.agent.max_iterations = max_iterations;
        }
    }

    /// The one config file to read, if any
    fn config_file(&self) -> Result<Option<PathBuf>> {
        if let Some(path) = &self.config_override {
            return Self::resolve_override(path).map(Some);
        }

        let cwd = std::env::current_dir()?;
        Ok(discover(&cwd, dirs::config_dir().as_deref()))
    }

    fn resolve_override(path: &Path) -> Result<PathBuf> {
        let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
        if expanded.is_file() {
            Ok(expanded)
        } else if expanded.is_dir() {
            find_with_stem(&expanded, "config").ok_or_else(|| anyhow!("No config file found in directory: {}", expanded.display()))
        } else {
            Err(anyhow!("Config path does not exist: {}", expanded.display()))
        }
    }
}
