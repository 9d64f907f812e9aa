mod cli;
mod commands;
mod output;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Command, CreateCommand, DeleteCommand, DiscoverCommand, ExportCommand};
use tracing_subscriber::EnvFilter;

/// Plain synchronous entry point, not `#[tokio::main]`: every command below
/// drives its own async calls through `tokio::runtime::Handle::block_on`
/// from ordinary sync code (see `commands.rs`'s module doc for why), so the
/// runtime only needs to exist, never to poll this function itself.
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start async runtime: {err:#}");
            return ExitCode::from(2);
        }
    };
    let rt = runtime.handle().clone();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Create { command } => match command {
            CreateCommand::Cluster(args) => commands::create_cluster(args, &rt),
            CreateCommand::Kubecfg(args) => commands::create_kubecfg(args, &rt),
        },
        Command::Delete { command } => match command {
            DeleteCommand::Cluster(args) => commands::delete_cluster(args, &rt),
        },
        Command::Discover { command } => match command {
            DiscoverCommand::Clusters(args) => commands::discover_clusters(args, &rt),
        },
        Command::Export { command } => match command {
            ExportCommand::Cluster(args) => commands::export_cluster(args, &rt),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

/// Configuration/validation failures exit 1; everything else that reached
/// out to a cloud, PKI store, or script file exits 2 (spec §6/§7).
fn exit_code_for(err: &anyhow::Error) -> u8 {
    let is_user_error = err.chain().any(|cause| {
        cause.downcast_ref::<kubeup_compose::ComposeError>().is_some()
            || cause.downcast_ref::<serde_yaml::Error>().is_some()
            || cause.downcast_ref::<commands::UsageError>().is_some()
    });
    if is_user_error {
        1
    } else {
        2
    }
}
