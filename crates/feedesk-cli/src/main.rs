// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use feedesk_app::{AppState, ClockIds};
use feedesk_tui::UiOptions;
use runtime::{DataSource, LogRuntime};
use std::env;
use std::path::PathBuf;
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `feedesk --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let log_file = config.log_file()?;
    let _log_guard = logging::init(config.log_level(), &log_file)
        .with_context(|| format!("start logging to {}", log_file.display()))?;

    let source = DataSource::from_path(options.data_path.clone().or_else(|| config.data_path()));
    info!(
        config = %options.config_path.display(),
        data = %source,
        page_size = config.page_size(),
        "starting feedesk"
    );

    let mut ids = ClockIds::new();
    let (scope, _report) = source.load(&mut ids).with_context(|| {
        format!(
            "open fee data from {source} -- if this path is wrong, pass --data or set [data].path or FEEDESK_DATA_PATH"
        )
    })?;

    if options.print_data {
        let payload = LogRuntime::render(&scope)?;
        println!("{payload}");
        return Ok(());
    }
    if options.check_only {
        return Ok(());
    }

    let mut state = AppState::with_ids(scope, ids);
    let mut runtime = LogRuntime::new();
    feedesk_tui::run_app(
        &mut state,
        &mut runtime,
        UiOptions {
            page_size: config.page_size(),
        },
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    data_path: Option<PathBuf>,
    print_config_path: bool,
    print_example: bool,
    print_data: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        data_path: None,
        print_config_path: false,
        print_example: false,
        print_data: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--data" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--data requires a file path"))?;
                options.data_path = Some(PathBuf::from(value.as_ref()));
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--print-data" => {
                options.print_data = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("feedesk: service fee table editor");
    println!("  --config <path>          Use a specific config path");
    println!("  --data <path>            Open a fee document (JSON) instead of the configured one");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --print-data             Print the loaded fee document with ids filled in");
    println!("  --check                  Validate config and fee data, then exit");
    println!("  --help                   Show this help");
}
