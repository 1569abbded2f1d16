// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "feedesk";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub data: Data,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            data: Data::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Data {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub page_size: Option<i64>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            page_size: Some(feedesk_tui::DEFAULT_PAGE_SIZE as i64),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("FEEDESK_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set FEEDESK_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and keep values under [data], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1. Regenerate it with `feedesk --print-example-config`",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(data_path) = &self.data.path
            && data_path.trim().is_empty()
        {
            bail!(
                "data.path in {} is empty; remove it to use the built-in demo data",
                path.display()
            );
        }

        if let Some(page_size) = self.ui.page_size
            && page_size <= 0
        {
            bail!(
                "ui.page_size in {} must be positive, got {}",
                path.display(),
                page_size
            );
        }

        if let Some(level) = &self.log.level
            && !LOG_LEVELS.contains(&level.as_str())
        {
            bail!(
                "log.level in {} must be one of {}, got {:?}",
                path.display(),
                LOG_LEVELS.join(", "),
                level
            );
        }

        if let Some(file) = &self.log.file
            && file.trim().is_empty()
        {
            bail!("log.file in {} is empty", path.display());
        }

        Ok(())
    }

    /// Fee document to open; `None` means the bundled demo document.
    pub fn data_path(&self) -> Option<PathBuf> {
        match &self.data.path {
            Some(path) => Some(PathBuf::from(path)),
            None => env::var_os("FEEDESK_DATA_PATH")
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn page_size(&self) -> usize {
        self.ui
            .page_size
            .and_then(|size| usize::try_from(size).ok())
            .filter(|size| *size > 0)
            .unwrap_or(feedesk_tui::DEFAULT_PAGE_SIZE)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let data_root = dirs::data_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [log].file in the config")
        })?;
        Ok(data_root.join(APP_NAME).join("feedesk.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# feedesk config\n# Place this file at: {}\n\nversion = 1\n\n[data]\n# Optional. Without it feedesk opens the built-in demo fee table\n# path = \"/absolute/path/to/fees.json\"\n\n[ui]\npage_size = {}\n\n[log]\nlevel = \"{}\"\n# Optional. Default is the platform data dir (for example ~/.local/share/feedesk/feedesk.log)\n# file = \"/absolute/path/to/feedesk.log\"\n",
            path.display(),
            feedesk_tui::DEFAULT_PAGE_SIZE,
            DEFAULT_LOG_LEVEL,
        )
    }
}
