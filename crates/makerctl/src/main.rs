use std::path::PathBuf;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use makerctl_core::{
    Config, CoreError, DispatchTable, OpContext, PollSettings, cancel_pair,
};
use tracing::{debug, error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cli;
mod commands;
mod error;
mod output;
mod progress;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(&cli).await {
        error::print_diagnostic(&err);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "makerctl=warn,makerctl_core=warn",
            1 => "makerctl=info,makerctl_core=info",
            2 => "makerctl=debug,makerctl_core=debug",
            _ => "makerctl=trace,makerctl_core=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

async fn run(cli: &Cli) -> Result<(), CoreError> {
    match &cli.command {
        Commands::Version => {
            println!("makerctl {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            let name = command.get_name().to_string();
            generate(*shell, &mut command, name, &mut std::io::stdout());
            Ok(())
        }
        Commands::Auth(args) => commands::auth::run(args, cli).await,
        Commands::Create(_) | Commands::Status(_) | Commands::Delete(_) => {
            execute_operation(cli).await
        }
    }
}

async fn execute_operation(cli: &Cli) -> Result<(), CoreError> {
    let Some(operation) = cli.command.operation() else {
        return Ok(());
    };
    info!(
        "{} {} on {}",
        operation.verb, operation.kind, operation.provider
    );

    let table = DispatchTable::builtin();
    // Resolve before touching config or network so unsupported combinations
    // fail fast with their own error kind.
    table.resolve(operation.provider, operation.kind, operation.verb)?;

    let config = load_config(cli)?;

    // Ctrl-C aborts a poll loop cleanly instead of killing the process
    // mid-write.
    let (cancel_handle, cancel_token) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_handle.cancel();
        }
    });

    let (bar, callback) = progress::spinner();
    let ctx = OpContext::new(config, operation.params)
        .with_wait(!operation.wait.no_wait)
        .with_poll(PollSettings::new(
            Duration::from_secs(operation.wait.wait_interval),
            Duration::from_secs(operation.wait.wait_timeout),
        ))
        .with_cancel(cancel_token)
        .with_progress(callback);

    let start = std::time::Instant::now();
    let result = table
        .execute(operation.provider, operation.kind, operation.verb, &ctx)
        .await;
    if !bar.is_finished() {
        bar.finish_and_clear();
    }

    match &result {
        Ok(_) => debug!("operation completed in {:?}", start.elapsed()),
        Err(e) => error!("operation failed after {:?}: {e}", start.elapsed()),
    }

    output::print_output(&result?, cli.output)
}

fn load_config(cli: &Cli) -> Result<Config, CoreError> {
    let config = match &cli.config_file {
        Some(path) => {
            debug!(path = %path, "loading config from explicit path");
            Config::load_from_path(&PathBuf::from(path))?
        }
        None => Config::load()?,
    };
    Ok(config)
}
