// MIT License - Copyright (c) 2026 Peter Wright
// Bridge monitor/control CLI

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::info;

use lutron_lip_bridge::{
    load_integration_report, Action, BridgeConfig, BridgeRegistry, Output, Scene, DEFAULT_PASSWORD,
    DEFAULT_PORT, DEFAULT_USERNAME, OUTPUT,
};

/// How long `query` waits for the bridge to answer through the
/// notification stream.
const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "lipwatch")]
#[command(about = "Monitor and control a Lutron bridge over its integration protocol")]
struct Cli {
    /// Bridge host name or IP address
    #[arg(long)]
    host: String,

    /// Bridge telnet port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Login user name
    #[arg(long, default_value = DEFAULT_USERNAME)]
    username: String,

    /// Login password
    #[arg(long, default_value = DEFAULT_PASSWORD)]
    password: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every notification the bridge emits
    Watch {
        /// Integration report used to label notifications with device names
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Set a zone-level output to a level (0-100)
    Set {
        /// Integration ID of the output
        #[arg(long)]
        id: u32,
        /// Target level in percent
        #[arg(long)]
        level: f64,
        /// Fade time in seconds
        #[arg(long)]
        fade: Option<f64>,
    },
    /// Ask an output for its current level and print the reply
    Query {
        /// Integration ID of the output
        #[arg(long)]
        id: u32,
    },
    /// Activate a scene by its button number on the bridge
    Scene {
        /// Scene button number
        #[arg(long)]
        scene_id: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = BridgeConfig::builder()
        .host(&cli.host)
        .port(cli.port)
        .username(&cli.username)
        .password(&cli.password)
        .build();

    let registry = BridgeRegistry::new();
    let session = registry.get_or_create_with(config);
    session.open().await;
    ensure!(
        session.is_connected(),
        "could not connect to bridge {}:{}",
        cli.host,
        cli.port
    );

    match cli.command {
        Command::Watch { report } => {
            let names = match report {
                Some(path) => device_names(&path)?,
                None => HashMap::new(),
            };
            session.register(move |frame| {
                let name = names
                    .get(&frame.integration_id)
                    .map(String::as_str)
                    .unwrap_or("-");
                println!(
                    "{} ~{},{},{},{:.2}  {}",
                    Local::now().format("%H:%M:%S%.3f"),
                    frame.mode,
                    frame.integration_id,
                    frame.action,
                    frame.value,
                    name
                );
            });
            session.start();
            info!("Watching bridge {}, press Ctrl+C to stop", cli.host);
            tokio::signal::ctrl_c().await?;
            session.stop().await;
        }
        Command::Set { id, level, fade } => {
            let output = Output::new(Arc::clone(&session), id);
            output
                .set_level(level, fade.map(Duration::from_secs_f64))
                .await?;
        }
        Command::Query { id } => {
            let (tx, mut rx) = mpsc::unbounded_channel();
            session.register(move |frame| {
                if frame.mode == OUTPUT
                    && frame.integration_id == id
                    && frame.action == Action::Set as u32
                {
                    let _ = tx.send(frame.value);
                }
            });
            session.start();

            let output = Output::new(Arc::clone(&session), id);
            output.query_level().await?;

            let level = timeout(QUERY_TIMEOUT, rx.recv())
                .await
                .context("no reply from bridge within 5 seconds")?
                .context("session stopped before the bridge replied")?;
            println!("output {id} level {level:.2}");
            session.stop().await;
        }
        Command::Scene { scene_id } => {
            Scene::new(Arc::clone(&session), scene_id).activate().await?;
        }
    }

    Ok(())
}

/// Map integration IDs to display names from an integration report.
fn device_names(path: &Path) -> Result<HashMap<u32, String>> {
    let devices = load_integration_report(path)
        .with_context(|| format!("failed to load integration report {}", path.display()))?;
    Ok(devices
        .into_iter()
        .map(|d| {
            let name = match &d.area_name {
                Some(area) => format!("{} {}", area, d.name),
                None => d.name,
            };
            (d.integration_id, name)
        })
        .collect())
}
