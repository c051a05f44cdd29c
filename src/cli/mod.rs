//! Command-line interface parsing and process entry.
//!
//! The version request is handled before anything else: it is a deliberate
//! short-circuit that prints and exits with code 0 without touching the
//! configuration or the host runtime.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::core::state::AppState;
use crate::host::local::{
    FixedQuitAnswer, LocalAutoLaunch, LocalSpellcheck, LocalTray, LocalViewBinding,
};
use crate::host::lock::FileInstanceLock;
use crate::lifecycle::{HostServices, InitOutcome, Orchestrator};

#[derive(Parser)]
#[command(name = "muster")]
#[command(disable_version_flag = true)]
#[command(about = "Desktop shell core for a multi-server team chat client")]
#[command(
    long_about = "Muster coordinates the sessions of a multi-server team chat \
client: which servers and tabs exist, which one is shown, and how control \
messages flow between the privileged process and its UI surfaces.\n\n\
Run without arguments to start the shell against the configured servers. \
The configuration lives in the platform config directory unless --data-dir \
relocates it."
)]
pub struct Args {
    /// Print the application version and exit
    #[arg(short = 'v', long = "version")]
    pub version: bool,

    /// Relocate persisted application state (configuration, lock file) to DIR
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable developer mode
    #[arg(long)]
    pub dev: bool,
}

pub(crate) fn version_string() -> String {
    format!("v.{}", env!("CARGO_PKG_VERSION"))
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    if args.version {
        println!("{}", version_string());
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tokio::runtime::Runtime::new()?.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let state = Arc::new(AppState::new(args.dev));
    let (ready_tx, ready_rx) = watch::channel(false);

    let lock_path = Config::config_path(args.data_dir.as_deref()).with_file_name("instance.lock");
    let services = HostServices {
        binding: Arc::new(LocalViewBinding::new()),
        hooks: Arc::new(FixedQuitAnswer::accepting()),
        spellcheck: Arc::new(LocalSpellcheck::new(vec!["en-US".to_string()])),
        tray: Arc::new(LocalTray),
        auto_launch: Arc::new(LocalAutoLaunch),
        lock: Box::new(FileInstanceLock::new(lock_path)),
    };
    let orchestrator = Orchestrator::new(state, args.data_dir.clone(), services, ready_rx);

    // The headless harness is its own host: signal readiness immediately.
    ready_tx.send(true)?;

    match orchestrator.initialize().await? {
        InitOutcome::Running(initialized) => {
            let initialized = *initialized;
            info!(
                servers = initialized.config.servers.len(),
                "shell initialized"
            );
            // No interactive surfaces here; dropping the control channel
            // lets the router drain its queue and stop cleanly.
            drop(initialized.control_tx);
            initialized.router_task.await?;
            Ok(())
        }
        InitOutcome::Deferred => {
            info!("deferred to an existing instance");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_flag_parses_short_and_long() {
        let args = Args::try_parse_from(["muster", "-v"]).expect("parse failed");
        assert!(args.version);
        let args = Args::try_parse_from(["muster", "--version"]).expect("parse failed");
        assert!(args.version);
    }

    #[test]
    fn version_string_has_the_v_dot_format() {
        let v = version_string();
        assert!(v.starts_with("v."));
        assert_eq!(v, format!("v.{}", env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn data_dir_flag_parses() {
        let args =
            Args::try_parse_from(["muster", "--data-dir", "/tmp/profile"]).expect("parse failed");
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/profile")));
        assert!(!args.version);
        assert!(!args.dev);
    }
}
