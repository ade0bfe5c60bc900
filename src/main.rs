//! minit binary.
//!
//! Parses the command line, sets up logging and runs the init.

use clap::Parser;
use minit::{Init, InitConfig, DEFAULT_SYSLOG_SOCKET};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "minit",
    about = "Minimal PID 1 supervisor",
    version,
    author
)]
struct Cli {
    /// Relay the syslog socket to stdout
    #[arg(long, env = "MINIT_SYSLOG")]
    syslog: bool,

    /// Syslog socket path
    #[arg(long, env = "MINIT_SYSLOG_PATH", default_value = DEFAULT_SYSLOG_SOCKET)]
    syslog_path: PathBuf,

    /// Initial service and its arguments
    #[arg(
        value_name = "INIT",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    command: Vec<String>,
}

impl Cli {
    fn config(&self) -> InitConfig {
        InitConfig {
            syslog_socket: self.syslog.then(|| self.syslog_path.clone()),
            ..InitConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let init = Init::new(cli.config(), cli.command);
    if let Err(e) = init.run().await {
        error!(error = %e, "Init failed");
        return Err(e.into());
    }

    Ok(())
}
