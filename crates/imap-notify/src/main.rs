//! imap-notify: run a command whenever an IMAP account changes.
//!
//! Keeps one connection open, asks the server for change notifications
//! with `NOTIFY` (RFC 5465) and runs the configured command once per burst
//! of changes.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use imap_notify_core::{ActionRunner, Config, Settings, default_path};
use imap_notify_proto::{Dispatcher, Mailbox, Session, TcpConnector, supervisor};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "imap-notify", version, about)]
struct Args {
    /// Configuration file [default: $XDG_CONFIG_HOME/imap-notify/config.toml]
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose logging, including protocol traffic
    #[arg(short, long)]
    debug: bool,

    /// Exit after the first detected change
    #[arg(long, conflicts_with = "check")]
    once: bool,

    /// Verify configuration, credentials and NOTIFY support, then exit
    #[arg(long)]
    check: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Logging depends on the file's `debug` key, so load it first and
    // report a failure once logging is up.
    let config = load_config(args.config.clone());
    let debug = args.debug || config.as_ref().is_ok_and(|c| c.imap.debug);
    init_logging(debug);

    match config.and_then(|config| run(&args, &config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug: bool) {
    let default = if debug {
        "imap_notify=debug,imap_notify_core=debug,imap_notify_proto=trace"
    } else {
        "imap_notify=info,imap_notify_core=info,imap_notify_proto=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = path
        .or_else(default_path)
        .ok_or_else(|| anyhow!("No configuration directory found; pass --config"))?;
    Config::load(&path).with_context(|| format!("Cannot load {}", path.display()))
}

fn run(args: &Args, config: &Config) -> Result<()> {
    let settings = config.resolve().context("Cannot obtain the IMAP password")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Cannot start the async runtime")?;

    runtime.block_on(async {
        if args.check {
            check(settings).await
        } else {
            watch_account(settings, args.once).await
        }
    })
}

/// Connects once, reaches the watching state and logs out.
async fn check(settings: Settings) -> Result<()> {
    let mut session = Session::connect(&mut TcpConnector, &settings.profile, settings.session)
        .await
        .context("Check failed")?;
    let watched: Vec<&str> = session.watched().iter().map(Mailbox::as_str).collect();
    info!(
        address = %settings.profile.address(),
        ?watched,
        "Configuration OK, server accepted NOTIFY"
    );
    session.logout().await;
    Ok(())
}

/// Watches until interrupted, or until the first change with `once`.
async fn watch_account(settings: Settings, once: bool) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let interrupt_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            let _ = interrupt_tx.send(true);
        }
    });

    let runner = settings.command.clone().map(ActionRunner::spawn);
    if runner.is_none() {
        info!("No notify.command configured, changes are only logged");
    }
    let on_burst = || {
        if let Some(runner) = &runner {
            runner.request();
        }
    };

    info!(address = %settings.profile.address(), user = %settings.profile.username, "Starting imap-notify");
    let result = if once {
        supervisor::run_once(
            &mut TcpConnector,
            &settings.profile,
            &settings.session,
            &settings.reconnect,
            on_burst,
            shutdown_tx,
        )
        .await
    } else {
        let mut dispatcher = Dispatcher::new(settings.session.debounce, on_burst);
        supervisor::run(
            &mut TcpConnector,
            &settings.profile,
            &settings.session,
            &settings.reconnect,
            &mut dispatcher,
            shutdown_rx,
        )
        .await
    };

    if let Some(runner) = runner {
        runner.shutdown().await;
    }
    result.context("Watcher stopped")
}
