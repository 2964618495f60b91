use crate::detection::OUTPUT_DIR;
use crate::error::{read_input, DigestError, DigestResult};
use crate::models::DEFAULT_MODEL;
use crate::types::DigestConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MODEL_ENV_VAR: &str = "TESTDIGEST_MODEL";

const CONFIG_FILE: &str = "config.json";

/// Get model with priority: ENV > local > global > default
pub fn get_model() -> String {
    if let Ok(env_model) = std::env::var(MODEL_ENV_VAR) {
        if !env_model.trim().is_empty() {
            return env_model;
        }
    }

    load_config()
        .default_model
        .unwrap_or_else(|| DEFAULT_MODEL.to_string())
}

/// Effective config: local file, else global file, else defaults.
/// Unreadable or invalid files are skipped.
pub fn load_config() -> DigestConfig {
    match load_local_config() {
        Ok(config) => return config,
        Err(err) => debug!(error = %err, "no usable local config"),
    }
    match load_global_config() {
        Ok(config) => return config,
        Err(err) => debug!(error = %err, "no usable global config"),
    }
    DigestConfig::default()
}

/// Path of the local config, `.testdigest/config.json` under `root`.
pub fn local_config_path(root: &Path) -> PathBuf {
    root.join(OUTPUT_DIR).join(CONFIG_FILE)
}

/// Path of the global config, `~/.config/testdigest/config.json`.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("testdigest").join(CONFIG_FILE))
}

/// Load local config from .testdigest/config.json
pub fn load_local_config() -> DigestResult<DigestConfig> {
    load_config_file(&local_config_path(Path::new(".")))
}

/// Load global config from ~/.config/testdigest/config.json
pub fn load_global_config() -> DigestResult<DigestConfig> {
    let path = global_config_path().unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    load_config_file(&path)
}

pub fn load_config_file(path: &Path) -> DigestResult<DigestConfig> {
    let contents = read_input(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Save config to `.testdigest/config.json` under `root`, creating the directory.
pub fn save_local_config(root: &Path, config: &DigestConfig) -> DigestResult<PathBuf> {
    let path = local_config_path(root);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| DigestError::from_io(parent, err))?;
    }
    let contents = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, contents).map_err(|err| DigestError::from_io(&path, err))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_get_model_env_override() {
        // Save current env
        let saved = env::var(MODEL_ENV_VAR).ok();

        env::set_var(MODEL_ENV_VAR, "gpt-4o");
        assert_eq!(get_model(), "gpt-4o");

        env::set_var(MODEL_ENV_VAR, "   ");
        assert_ne!(get_model(), "   ");

        // Restore env
        env::remove_var(MODEL_ENV_VAR);
        if let Some(val) = saved {
            env::set_var(MODEL_ENV_VAR, val);
        }
    }

    #[test]
    fn test_save_and_load_local_config() {
        let dir = TempDir::new().unwrap();
        let config = DigestConfig {
            default_model: Some("gpt-4".to_string()),
            max_tokens: Some(2_000),
            ..DigestConfig::default()
        };

        let path = save_local_config(dir.path(), &config).unwrap();
        assert_eq!(path, dir.path().join(".testdigest").join("config.json"));

        let loaded = load_config_file(&path).unwrap();
        assert_eq!(loaded.default_model.as_deref(), Some("gpt-4"));
        assert_eq!(loaded.max_tokens, Some(2_000));
        assert_eq!(loaded.first_lines, config.first_lines);
    }

    #[test]
    fn test_invalid_config_is_json_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(load_config_file(&path), Err(DigestError::Json(_))));
    }

    #[test]
    fn test_missing_config_is_not_found() {
        let dir = TempDir::new().unwrap();
        let result = load_config_file(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(DigestError::NotFound(_))));
    }
}
