// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Sends tracing output to `file`. The terminal is owned by the UI, so nothing
/// is written to stderr. `RUST_LOG` takes precedence over `level`.
///
/// The returned guard flushes pending lines on drop; hold it for the life of
/// the process.
pub fn init(level: &str, file: &Path) -> Result<WorkerGuard> {
    let directory = file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = file
        .file_name()
        .ok_or_else(|| anyhow!("log file {} has no file name", file.display()))?;
    fs::create_dir_all(directory)
        .with_context(|| format!("create log directory {}", directory.display()))?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))?;

    Ok(guard)
}
