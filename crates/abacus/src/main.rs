mod cli;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use abacus_core::storage::{LocalStorageProvider, LogAuditSink, MemoryStorageProvider, StorageProvider};
use abacus_core::Application;
use clap::{Parser, Subcommand};
use log::{info, warn};

/// Abacus: a runtime for self-contained calculator plugins
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Check that the binary runs, then exit
    #[arg(long)]
    ping: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Directory plugin configs are persisted in. Without it nothing outlives the process.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect registered plugins
    Plugin {
        #[command(subcommand)]
        command: PluginCommand,
    },
    /// Run one calculation
    Run {
        /// Plugin id
        id: String,
        /// Field value as key=value; the value is read as JSON, falling back to a string
        #[arg(long = "input", short = 'i', value_name = "KEY=VALUE")]
        inputs: Vec<String>,
        /// Locale for labels and messages
        #[arg(long, default_value = "en")]
        locale: String,
    },
    /// Read and change persisted plugin configs
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum PluginCommand {
    /// List registered plugins and their lifecycle state
    List {},
    /// Print the compatibility report of a plugin
    Check {
        /// Plugin id
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print a plugin's config, secrets removed
    Show {
        /// Plugin id
        id: String,
    },
    /// Serialize a plugin's config
    Export {
        /// Plugin id
        id: String,
        /// json, yaml or toml
        #[arg(long, default_value = "json")]
        format: String,
        #[arg(long)]
        include_secrets: bool,
    },
    /// Set one settings key
    Set {
        /// Plugin id
        id: String,
        key: String,
        /// JSON value, falling back to a plain string
        value: String,
    },
    /// Print the change history of a plugin's config
    History {
        /// Plugin id
        id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if args.ping {
        println!("pong");
        return ExitCode::SUCCESS;
    }

    if let Err(e) = logging::init(args.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let provider: Arc<dyn StorageProvider> = match &args.data_dir {
        Some(dir) => match LocalStorageProvider::new(dir.clone()) {
            Ok(provider) => Arc::new(provider),
            Err(e) => {
                eprintln!("Error: cannot use data directory '{}': {}", dir.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Arc::new(MemoryStorageProvider::new()),
    };

    let mut app = Application::new(provider, Arc::new(LogAuditSink));
    if let Err(e) = app.run().await {
        eprintln!("Error: failed to start: {}", e);
        return ExitCode::FAILURE;
    }

    // --- Statically register and install the bundled plugins ---
    for source in [bmi_calculator::source(), gcs_calculator::source()] {
        if let Err(e) = app.register_plugin(Arc::new(source)) {
            eprintln!("Error: failed to register plugin: {}", e);
            return ExitCode::FAILURE;
        }
    }
    for id in app.registry().ids() {
        match app.install_plugin(&id).await {
            Ok(state) => info!("Plugin '{}' is {}", id, state),
            Err(e) => warn!("Plugin '{}' could not be installed: {}", id, e),
        }
    }

    let outcome = match args.command {
        Some(Commands::Plugin { command }) => match command {
            PluginCommand::List {} => cli::list_plugins(&app).await,
            PluginCommand::Check { id } => cli::check_plugin(&app, &id).await,
        },
        Some(Commands::Run { id, inputs, locale }) => cli::run_calculation(&app, &id, &inputs, &locale).await,
        Some(Commands::Config { command }) => match command {
            ConfigCommand::Show { id } => cli::show_config(&app, &id),
            ConfigCommand::Export {
                id,
                format,
                include_secrets,
            } => cli::export_config(&app, &id, &format, include_secrets),
            ConfigCommand::Set { id, key, value } => cli::set_config(&app, &id, &key, &value).await,
            ConfigCommand::History { id } => cli::config_history(&app, &id),
        },
        None => cli::list_plugins(&app).await,
    };

    if let Err(e) = app.shutdown().await {
        warn!("Shutdown reported an error: {}", e);
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
