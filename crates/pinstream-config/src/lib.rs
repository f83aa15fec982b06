mod config;

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use pinstream_core::{PinError, PinResult};

pub use config::{
    BackendConfig, DEFAULT_BACKEND_URL, DEFAULT_REENABLE_DELAY_MS, DEFAULT_TIMEOUT_SECS,
    DownloadConfig, OutputConfig, PinConfig,
};

pub const CONFIG_KEYS: [&str; 5] = [
    "backend.base_url",
    "backend.timeout_secs",
    "download.directory",
    "download.reenable_delay_ms",
    "output.simple",
];

pub fn config_path() -> PinResult<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PinError::Config("home directory not found".to_string()))?;
    Ok(home.join(".pinstream").join("config.toml"))
}

pub fn load_config() -> PinResult<PinConfig> {
    let path = config_path()?;
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(PinConfig::default());
    }
    let content = fs::read_to_string(&path)
        .map_err(|err| PinError::Config(format!("failed to read config: {err}")))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> PinResult<PinConfig> {
    toml::from_str(content)
        .map_err(|err| PinError::Config(format!("failed to parse config: {err}")))
}

pub fn save_config(config: &PinConfig) -> PinResult<()> {
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| PinError::Config(format!("failed to create config dir: {err}")))?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|err| PinError::Config(format!("failed to serialize config: {err}")))?;
    fs::write(&path, content)
        .map_err(|err| PinError::Config(format!("failed to write config: {err}")))?;
    Ok(())
}

pub fn config_exists() -> PinResult<bool> {
    let path = config_path()?;
    Ok(path.exists())
}

fn env_override(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

pub fn resolve_backend_url(config: &PinConfig) -> String {
    env_override("PINSTREAM_BACKEND_URL")
        .or_else(|| config.backend.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
}

pub fn resolve_timeout(config: &PinConfig) -> Duration {
    Duration::from_secs(config.backend.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
}

pub fn resolve_download_dir(config: &PinConfig) -> Option<PathBuf> {
    env_override("PINSTREAM_DOWNLOAD_DIR")
        .or_else(|| config.download.directory.clone())
        .map(PathBuf::from)
}

pub fn resolve_reenable_delay(config: &PinConfig) -> Duration {
    Duration::from_millis(
        config
            .download
            .reenable_delay_ms
            .unwrap_or(DEFAULT_REENABLE_DELAY_MS),
    )
}

pub fn resolve_simple_output(config: &PinConfig) -> Option<bool> {
    if let Ok(value) = env::var("PINSTREAM_OUTPUT_SIMPLE") {
        let normalized = value.to_lowercase();
        return Some(normalized == "1" || normalized == "true" || normalized == "yes");
    }
    config.output.simple
}

pub fn get_config_value(config: &PinConfig, key_path: &str) -> Option<String> {
    let parts: Vec<&str> = key_path.split('.').collect();

    match parts.as_slice() {
        ["backend", "base_url"] => config.backend.base_url.clone(),
        ["backend", "timeout_secs"] => config.backend.timeout_secs.map(|v| v.to_string()),
        ["download", "directory"] => config.download.directory.clone(),
        ["download", "reenable_delay_ms"] => {
            config.download.reenable_delay_ms.map(|v| v.to_string())
        }
        ["output", "simple"] => config.output.simple.map(|b| b.to_string()),
        _ => None,
    }
}

pub fn set_config_value(key_path: &str, value: &str) -> PinResult<()> {
    let path = config_path()?;
    let content = if path.exists() {
        fs::read_to_string(&path)
            .map_err(|err| PinError::Config(format!("failed to read config: {err}")))?
    } else {
        String::new()
    };

    let content = set_value_in_document(&content, key_path, value)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| PinError::Config(format!("failed to create config dir: {err}")))?;
    }
    fs::write(&path, content)
        .map_err(|err| PinError::Config(format!("failed to write config: {err}")))?;

    Ok(())
}

/// Writes `value` at `key_path` into a TOML document, keeping existing comments and layout.
pub fn set_value_in_document(content: &str, key_path: &str, value: &str) -> PinResult<String> {
    if !CONFIG_KEYS.contains(&key_path) {
        return Err(PinError::Config(format!(
            "unknown key '{key_path}' (expected one of: {})",
            CONFIG_KEYS.join(", ")
        )));
    }

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .unwrap_or_default();

    let Some((table_path, last_part)) = key_path.rsplit_once('.') else {
        return Err(PinError::Config(
            "key path must have at least 2 parts (e.g., 'backend.base_url')".to_string(),
        ));
    };

    let mut current = doc.as_table_mut();
    for part in table_path.split('.') {
        current = current
            .entry(part)
            .or_insert(toml_edit::Item::Table(Default::default()))
            .as_table_mut()
            .ok_or_else(|| {
                PinError::Config(format!("cannot set nested value in '{}'", key_path))
            })?;
    }

    current[last_part] = typed_value(key_path, value)?;

    let updated = doc.to_string();
    parse_config(&updated)?;
    Ok(updated)
}

fn typed_value(key_path: &str, value: &str) -> PinResult<toml_edit::Item> {
    match key_path {
        "backend.timeout_secs" | "download.reenable_delay_ms" => value
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|number| *number >= 0)
            .map(toml_edit::value)
            .ok_or_else(|| {
                PinError::Config(format!("'{key_path}' expects a non-negative integer"))
            }),
        "output.simple" => value
            .trim()
            .parse::<bool>()
            .map(toml_edit::value)
            .map_err(|_| PinError::Config(format!("'{key_path}' expects true or false"))),
        _ => Ok(toml_edit::value(value)),
    }
}

pub fn open_in_editor() -> PinResult<()> {
    let path = config_path()?;
    if !path.exists() {
        save_config(&PinConfig::default())?;
    }

    let editor = env::var("EDITOR").unwrap_or_else(|_| {
        if cfg!(target_os = "macos") {
            "vim".to_string()
        } else if cfg!(target_os = "windows") {
            "notepad".to_string()
        } else {
            "nano".to_string()
        }
    });

    let status = Command::new(&editor)
        .arg(&path)
        .status()
        .map_err(|err| PinError::Config(format!("failed to open editor '{}': {}", editor, err)))?;

    if !status.success() {
        return Err(PinError::Config(format!(
            "editor exited with status: {}",
            status
        )));
    }

    Ok(())
}
