mod app;
mod chat_commands;
mod config_commands;
mod db_commands;
mod user_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::{debug, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::app::AppOptions;

#[derive(Parser)]
#[command(name = "cadence", about = "Cadence: calendar assistant with preparation plans")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of ./cadence.toml and ~/.config/cadence/).
    #[arg(long, global = true, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    /// Use an in-process calendar and session store instead of Google and SQLite.
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    /// YAML file mapping phrasings to tool calls.
    #[arg(long, global = true, env = "CADENCE_INTENTS")]
    intents: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant (one message, or interactive from stdin).
    Chat {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Start a session for a user.
    Login {
        #[arg(short, long)]
        user: String,
    },
    /// End a user's session.
    Logout {
        #[arg(short, long)]
        user: String,
    },
    /// Show a user's upcoming events.
    Upcoming {
        #[arg(short, long)]
        user: String,
    },
    /// Call one tool directly with JSON arguments.
    Tool {
        #[arg(short, long)]
        user: String,
        name: String,
        /// JSON object of arguments.
        #[arg(default_value = "{}")]
        args: String,
    },
    /// List the available tools and their parameters.
    Tools,
    /// Stored per-user data (credential, profile, registry).
    User {
        #[command(subcommand)]
        action: user_commands::UserAction,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
    /// Database management (reset, migrate).
    Db {
        #[command(subcommand)]
        action: db_commands::DbAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<cadence_config::CadenceConfig> {
    match &cli.config {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            cadence_config::load_config(path)
        },
        None => Ok(cadence_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);
    info!(version = env!("CARGO_PKG_VERSION"), "cadence starting");

    let config = load_config(&cli)?;
    let options = AppOptions {
        offline: cli.offline,
        intents: cli.intents.clone(),
    };

    match cli.command {
        Commands::Config { action } => {
            config_commands::handle_config(action, cli.config.as_deref(), &config)
        },
        Commands::Db { action } => db_commands::handle_db(action, &config).await,
        Commands::Chat { user, message } => {
            chat_commands::chat(&config, &options, &user, message.as_deref()).await
        },
        Commands::Login { user } => chat_commands::login(&config, &options, &user).await,
        Commands::Logout { user } => chat_commands::logout(&config, &options, &user).await,
        Commands::Upcoming { user } => chat_commands::upcoming(&config, &options, &user).await,
        Commands::Tool { user, name, args } => {
            chat_commands::call_tool(&config, &options, &user, &name, &args).await
        },
        Commands::Tools => chat_commands::list_tools(&config, &options).await,
        Commands::User { action } => user_commands::handle_user(action, &config, &options).await,
    }
}
