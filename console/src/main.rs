//! Fleet Console
//!
//! Operator command-line client for a fleet node

mod client;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client::FleetClient;
use robofleet_shared::{limits, Parameters, Request};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "fleet-console")]
#[command(about = "Operator console for a robot fleet node", long_about = None)]
struct Cli {
    /// Node address
    #[arg(long, default_value = limits::DEFAULT_NODE_ADDR)]
    addr: String,

    /// Give up waiting for a response after this many milliseconds
    #[arg(long, default_value_t = limits::REQUEST_TIMEOUT_MS)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Node health
    Status,
    /// Register a new robot
    Register {
        name: String,
        /// Robot type, e.g. mobile, arm, manipulator, sensor-array
        #[arg(long = "type")]
        robot_type: String,
        #[arg(long)]
        location: Option<String>,
    },
    /// List all robots
    List,
    /// Show one robot
    Get { id: String },
    /// Send a command to a robot
    Command {
        id: String,
        /// move, stop, rotate, grab, release or charge
        command: String,
        /// Parameters as a JSON object, e.g. '{"direction":"forward","distance":5}'
        #[arg(long, default_value = "{}")]
        params: String,
    },
    /// Calibrate a robot's sensors
    Calibrate { id: String },
    /// Check a robot's stored sensor readings
    Health { id: String },
    /// Remove a robot
    Delete { id: String },
}

impl Commands {
    fn into_request(self) -> Result<Request> {
        let request = match self {
            Commands::Status => Request::NodeHealth,
            Commands::Register {
                name,
                robot_type,
                location,
            } => Request::RegisterRobot {
                name: Some(name),
                robot_type: Some(robot_type),
                location,
            },
            Commands::List => Request::ListRobots,
            Commands::Get { id } => Request::GetRobot { id },
            Commands::Command { id, command, params } => Request::Command {
                id,
                command: Some(command),
                parameters: parse_params(&params)?,
            },
            Commands::Calibrate { id } => Request::Calibrate { id },
            Commands::Health { id } => Request::SensorHealth { id },
            Commands::Delete { id } => Request::DeleteRobot { id },
        };
        Ok(request)
    }
}

fn parse_params(raw: &str) -> Result<Parameters> {
    let value: serde_json::Value =
        serde_json::from_str(raw).with_context(|| format!("--params is not valid JSON: {}", raw))?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => bail!("--params must be a JSON object, got {}", other),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .init();

    let cli = Cli::parse();
    let request = cli.command.into_request()?;
    let client_id = format!("console-{}", std::process::id());

    let mut client =
        FleetClient::connect(&cli.addr, client_id, Duration::from_millis(cli.timeout_ms)).await?;
    info!("Sending {} to {}", request.name(), cli.addr);
    let response = client.request(request).await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    if response.is_error() {
        std::process::exit(1);
    }
    Ok(())
}
