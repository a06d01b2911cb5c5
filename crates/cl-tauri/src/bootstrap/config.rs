//! # Configuration Loader / 配置加载器
//!
//! Reads the optional TOML file and layers `CLIPLIAISON_*` environment
//! overrides on top. Every key has a default, so running without a file is
//! the normal case.

use std::path::PathBuf;

use anyhow::Context;
use cl_core::LiaisonConfig;

/// Load configuration from a TOML file
/// 从 TOML 文件加载配置
///
/// Missing sections and keys take their defaults.
///
/// # Errors / 错误
///
/// Returns error if the file cannot be read or is not valid TOML for
/// [`LiaisonConfig`].
pub fn load_config(config_path: PathBuf) -> anyhow::Result<LiaisonConfig> {
    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    LiaisonConfig::from_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
}

/// Defaults (or `config_path` when given) plus environment overrides read
/// through `lookup`.
pub fn resolve_config<F>(config_path: Option<PathBuf>, lookup: F) -> anyhow::Result<LiaisonConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match config_path {
        Some(path) => load_config(path)?,
        None => LiaisonConfig::default(),
    };
    config
        .apply_overrides(lookup)
        .context("Invalid environment override")?;
    Ok(config)
}
