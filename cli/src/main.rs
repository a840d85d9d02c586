use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use graphpub::config::Config;
use graphpub::queue::ReleaseQueue;
use graphpub::store::HttpClient;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "graphpub")]
#[command(about = "Versioned dataset release queue")]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to the configuration file
    #[clap(long, short, default_value = "graphpub.json", global = true)]
    config: PathBuf,
    /// Verbose mode - sets the RUST_LOG level to info, defaults to warning level
    #[clap(long, short, action, default_value = "false", global = true)]
    verbose: bool,
    /// Debug mode - sets the RUST_LOG level to debug, defaults to warning level
    #[clap(long, action, default_value = "false", global = true)]
    debug: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite the configuration file if it already exists
        #[clap(long, default_value = "false")]
        overwrite: bool,
    },
    /// Print the configuration
    Config,
    /// List all release tasks with their status
    Status,
    /// Create a ready release task for a staging graph
    Enqueue {
        /// The named graph holding the staged content
        source_graph: String,
    },
    /// Drain the queue: run eligible tasks in creation order
    Run,
    /// Print the update an operator runs to reset a failed task to ready
    Recovery {
        /// The URI of the failed task
        task: String,
    },
    /// Prints the version of the graphpub binary
    Version,
}

fn open_queue(config_path: &PathBuf) -> Result<ReleaseQueue> {
    let config = Config::from_file(config_path)?;
    let client = HttpClient::new(config.endpoint.clone());
    Ok(ReleaseQueue::new(Box::new(client), config))
}

fn main() -> Result<()> {
    let cmd = Cli::parse();

    graphpub::init_logging();
    if std::env::var("RUST_LOG").is_err() {
        let log_level = if cmd.verbose { "info" } else { "warn" };
        let log_level = if cmd.debug { "debug" } else { log_level };
        std::env::set_var("RUST_LOG", log_level);
    }
    env_logger::init();

    match cmd.command {
        Commands::Init { overwrite } => {
            if cmd.config.exists() && !overwrite {
                return Err(anyhow::anyhow!(
                    "{} already exists; pass --overwrite to replace it",
                    cmd.config.display()
                ));
            }
            let config = Config::default();
            config.save_to_file(&cmd.config)?;
            println!("Wrote {}", cmd.config.display());
            config.print();
        }
        Commands::Config => {
            let config = Config::from_file(&cmd.config)?;
            config.print();
        }
        Commands::Status => {
            let queue = open_queue(&cmd.config)?;
            let tasks = queue.tasks()?;
            if tasks.is_empty() {
                println!("No release tasks.");
            }
            for task in tasks {
                println!(
                    "{}  {}  {}  {}",
                    task.created.to_rfc3339(),
                    task.status,
                    task.source_graph,
                    task.uri
                );
            }
        }
        Commands::Enqueue { source_graph } => {
            let mut queue = open_queue(&cmd.config)?;
            let task = queue.enqueue(&source_graph)?;
            println!("Enqueued {}", task.uri);
        }
        Commands::Run => {
            let mut queue = open_queue(&cmd.config)?;
            info!("draining release queue against {}", queue.config().endpoint);
            let executed = queue.run_pending()?;
            println!("Executed {} release task(s)", executed);
        }
        Commands::Recovery { task } => {
            let queue = open_queue(&cmd.config)?;
            println!("{}", queue.recovery_statement(&task));
        }
        Commands::Version => {
            println!("graphpub {}", env!("CARGO_PKG_VERSION"));
        }
    }
    Ok(())
}
