use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Default data directory: `~/.querysmith`.
pub fn data_dir() -> anyhow::Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".querysmith"))
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))
}

/// Expand `~` and environment variables in a configured path.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
    }
}

pub fn load_from(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read {} failed: {e}", path.display()))?;
    Ok(toml::from_str::<AppConfig>(&s)?)
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.querysmith/config.toml
    let data_dir = data_dir()?;
    let home_config = data_dir.join("config.toml");

    // Priority 2: ./config.toml
    let local_config = Path::new("config.toml");

    let mut cfg = if home_config.exists() {
        load_from(&home_config)?
    } else if local_config.exists() {
        load_from(local_config)?
    } else {
        AppConfig::default()
    };

    if cfg.snapshot.directory.as_deref().map(str::trim).unwrap_or("").is_empty() {
        cfg.snapshot.directory = Some(data_dir.join("snapshots").to_string_lossy().to_string());
    }
    if cfg.logging.file
        && cfg.logging.directory.as_deref().map(str::trim).unwrap_or("").is_empty()
    {
        cfg.logging.directory = Some(data_dir.join("logs").to_string_lossy().to_string());
    }

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    normalize_paths(&mut cfg);
    Ok(cfg)
}

/// Environment overrides (highest priority). Empty values are ignored.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("QUERYSMITH_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = get("QUERYSMITH_GENERATION_URL") {
        cfg.generation.base_url = v;
    }
    if let Some(v) = get("QUERYSMITH_GENERATION_API_KEY") {
        cfg.generation.api_key = v;
    }
    if let Some(v) = get("QUERYSMITH_GENERATION_MODEL") {
        cfg.generation.model = v;
    }
    if let Some(v) = get("QUERYSMITH_EMBEDDING_URL") {
        cfg.embedding.base_url = v;
    }
    if let Some(v) = get("QUERYSMITH_EMBEDDING_API_KEY") {
        cfg.embedding.api_key = v;
    }
    if let Some(v) = get("QUERYSMITH_SOURCE_URL") {
        cfg.source.base_url = v;
    }
    if let Some(v) = get("QUERYSMITH_SOURCE_API_KEY") {
        cfg.source.api_key = v;
    }
}

fn normalize_paths(cfg: &mut AppConfig) {
    for dir in [&mut cfg.snapshot.directory, &mut cfg.logging.directory] {
        let expanded = dir
            .as_deref()
            .map(|raw| expand_path(raw).to_string_lossy().to_string());
        if expanded.is_some() {
            *dir = expanded;
        }
    }
}
