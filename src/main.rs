//! # feelform
//!
//! Tilt relay server, relay clients, and a text-to-motion CLI.

#![deny(unsafe_code)]

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use feelform_client::{ClientConfig, ConnectionState, Role};
use feelform_core::ids::RoomId;
use feelform_llm::{pipeline, PlanCell};
use feelform_relay::AppConfig;
use feelform_telemetry::{init_telemetry, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(name = "feelform", about = "Feeling-driven motion relay")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the relay and analysis API until ctrl-c.
    Serve {
        /// Host to bind (overrides FEELFORM_HOST).
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides PORT, 0 for auto-assign).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Join a room and print every orientation update.
    Viewer {
        #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
        url: String,
        #[arg(long)]
        room: String,
    },
    /// Join a room and stream `x y` lines from stdin as tilt.
    Controller {
        #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
        url: String,
        #[arg(long)]
        room: String,
    },
    /// Turn each stdin line into a motion plan and print the current plan.
    Feel,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let telemetry = TelemetryConfig {
        json: cli.json_logs,
        ..TelemetryConfig::default()
    };
    init_telemetry(&telemetry).context("failed to initialize logging")?;

    match cli.command {
        Command::Serve { host, port } => serve(host, port).await,
        Command::Viewer { url, room } => viewer(url, parse_room(&room)?).await,
        Command::Controller { url, room } => controller(url, parse_room(&room)?).await,
        Command::Feel => feel().await,
    }
}

fn parse_room(raw: &str) -> Result<RoomId> {
    RoomId::parse(raw).context("room must not be empty")
}

async fn serve(host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = AppConfig::from_env();
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let generator = config.llm.build_generator();
    let handle = feelform_relay::start(config.server, generator)
        .await
        .context("failed to start relay server")?;
    tracing::info!(port = handle.port, "feelform ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("shutting down");
    Ok(())
}

async fn viewer(url: String, room: RoomId) -> Result<()> {
    let client = feelform_client::spawn(ClientConfig::new(url, room));
    let mut orientation = client.watch_orientation();

    loop {
        tokio::select! {
            changed = orientation.changed() => {
                if changed.is_err() {
                    break;
                }
                let o = *orientation.borrow_and_update();
                println!("{:.3} {:.3}", o.x, o.y);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    client.shutdown().await;
    Ok(())
}

async fn controller(url: String, room: RoomId) -> Result<()> {
    let client = feelform_client::spawn(ClientConfig::new(url, room).with_role(Role::Controller));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let mut parts = line.split_whitespace().map(str::parse::<f64>);
        match (parts.next(), parts.next()) {
            (Some(Ok(x)), Some(Ok(y))) => {
                if client.state() != ConnectionState::Joined {
                    tracing::warn!("not joined, tilt dropped");
                }
                client.send_tilt(x, y);
            }
            _ => eprintln!("expected `x y`, got {line:?}"),
        }
    }

    // Let the last value reach the relay before closing.
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.shutdown().await;
    Ok(())
}

async fn feel() -> Result<()> {
    let generator = AppConfig::from_env().llm.build_generator()?;
    let cell = PlanCell::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let result = pipeline::feel(generator.as_ref(), &line)
            .await
            .map(|(_, plan)| plan)
            .inspect_err(|e| eprintln!("keeping previous plan: {e}"));
        cell.apply(result);
        println!("{}", serde_json::to_string(&cell.current())?);
    }
    Ok(())
}
