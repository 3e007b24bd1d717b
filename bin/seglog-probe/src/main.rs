//! Seglog Probe - segment directory capability check
//!
//! Reports the direct I/O block size and native async I/O support of the
//! filesystem backing a directory, and optionally runs one full segment
//! lifecycle against it as a smoke test.

use anyhow::{Context, Result};
use clap::Parser;
use seglog_common::{BufferSet, CapabilityProfile, FsConfig};
use serde::{Deserialize, Serialize};
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "seglog-probe")]
#[command(about = "Probe a segment directory's I/O capabilities")]
#[command(version)]
struct Args {
    /// Directory to probe (created if missing)
    dir: PathBuf,

    /// Configuration file path
    #[arg(short, long, default_value = "/etc/seglog/probe.toml")]
    config: String,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    /// Print the profile as JSON
    #[arg(long)]
    json: bool,

    /// Also run an allocate/write/scan/finalize/remove cycle
    #[arg(long)]
    smoke: bool,
}

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
struct Config {
    #[serde(default)]
    fs: FsConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
struct LoggingConfig {
    #[serde(default = "default_log_level")]
    level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Serialize)]
struct Report {
    dir: PathBuf,
    #[serde(flatten)]
    profile: CapabilityProfile,
    smoke: Option<bool>,
}

/// Segment size used by the smoke cycle
const SMOKE_SEGMENT_SIZE: u64 = 1024 * 1024;

fn main() -> Result<()> {
    let args = Args::parse();

    // Load config file if it exists
    let config: Config = if Path::new(&args.config).exists() {
        let config_str = std::fs::read_to_string(&args.config)
            .with_context(|| format!("failed to read {}", args.config))?;
        toml::from_str(&config_str)
            .with_context(|| format!("failed to parse {}", args.config))?
    } else {
        Config::default()
    };
    config.fs.validate()?;

    // CLI takes precedence over the config file
    let log_level = args.log_level.unwrap_or(config.logging.level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    seglog_fs::ensure_dir(&args.dir)
        .with_context(|| format!("cannot use {}", args.dir.display()))?;

    let profile = seglog_fs::probe_capabilities_with(&args.dir, &config.fs.probe)?;
    info!(
        "Direct I/O: {}",
        if profile.supports_direct_io() {
            format!("{} byte blocks", profile.direct_io_block_size)
        } else {
            "unsupported".to_string()
        }
    );
    info!(
        "Native async I/O: {}",
        if profile.async_io_supported { "supported" } else { "unsupported" }
    );

    let smoke = if args.smoke {
        match smoke_cycle(&args.dir, &config.fs) {
            Ok(()) => {
                info!("Segment lifecycle smoke test passed");
                Some(true)
            }
            Err(e) => {
                error!("Segment lifecycle smoke test failed: {:#}", e);
                Some(false)
            }
        }
    } else {
        None
    };

    let report = Report {
        dir: args.dir.clone(),
        profile,
        smoke,
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("dir:                  {}", report.dir.display());
        println!("direct_io_block_size: {}", profile.direct_io_block_size);
        println!("async_io_supported:   {}", profile.async_io_supported);
        if let Some(passed) = smoke {
            println!("smoke:                {}", if passed { "ok" } else { "FAILED" });
        }
    }

    if smoke == Some(false) {
        std::process::exit(1);
    }
    Ok(())
}

/// Allocate, append, scan, finalize, verify and remove one segment
fn smoke_cycle(dir: &Path, config: &FsConfig) -> Result<()> {
    let open_name = format!(".smoke-open-{}", std::process::id());
    let closed_name = format!(".smoke-closed-{}", std::process::id());
    let payload = b"seglog smoke entry";

    let mut file =
        seglog_fs::allocate_file_with(dir, &open_name, SMOKE_SEGMENT_SIZE, config.allocation)?;
    let outcome = (|| -> Result<()> {
        file.write_all(payload)?;
        file.sync_data()?;

        anyhow::ensure!(
            seglog_fs::file_has_only_trailing_zeros(&mut file)?,
            "unexpected data after the appended entry"
        );
        let used = file.stream_position()?;

        seglog_fs::truncate_and_rename_file(dir, used, &open_name, &closed_name)?;
        let content = seglog_fs::read_file(dir, &closed_name)?;
        anyhow::ensure!(content == payload, "finalized segment content mismatch");

        seglog_fs::make_or_replace_file(dir, &closed_name, &BufferSet::from(content))?;
        seglog_fs::remove_file(dir, &closed_name)?;
        Ok(())
    })();
    drop(file);

    if outcome.is_err() {
        for name in [&open_name, &closed_name] {
            if seglog_fs::file_exists(dir, name).unwrap_or(false) {
                let _ = seglog_fs::remove_file(dir, name);
            }
        }
    }
    outcome
}
