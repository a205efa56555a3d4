mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::handlers;

#[derive(Parser)]
#[command(name = "sendtext")]
#[command(version)]
#[command(about = "Send text notifications through email, Slack and Telegram")]
#[command(
    help_template = "{name} - {version}\n{about}\n\n{usage-heading}\n  {usage}\n\n{all-args}{options}\n"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service
    ///
    /// Routes:
    ///   GET|POST /sendtext/{opt}
    ///   GET|POST /sendtext/{opt}/{text}
    ///   GET|POST /sendtext/{opt}/{subject_channel}/{text}
    ///   GET      /api/v1/health
    ///
    /// {opt} is one of: email, slack, telegram (or tg)
    Serve {
        /// Server bind address (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Server port number (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to configuration file
        #[arg(long)]
        config_file: Option<String>,
    },

    /// Send one text and print the result
    ///
    /// Examples:
    ///   sendtext send tg --text "disk almost full"
    ///   sendtext send slack --target ops --text "deploy done"
    ///   sendtext send email --target "Nightly report" --receivers "a@x.com,b@y.org"
    Send {
        /// Channel kind: email, slack, telegram (or tg)
        opt: String,

        /// Text to send (default: "test")
        #[arg(short, long)]
        text: Option<String>,

        /// Email subject or Slack channel
        #[arg(long)]
        target: Option<String>,

        /// Email recipients, any separator
        #[arg(long)]
        receivers: Option<String>,

        /// Path to configuration file
        #[arg(long)]
        config_file: Option<String>,
    },

    /// Send a text to every channel with alerts enabled
    Alert {
        /// Alert text
        text: String,

        /// Path to configuration file
        #[arg(long)]
        config_file: Option<String>,
    },

    /// Write a configuration file with defaults
    Config {
        /// Create the configuration file
        #[arg(long)]
        init: bool,

        /// Path to configuration file
        #[arg(long)]
        config_file: Option<String>,
    },

    /// Show the resolved database layout
    Db {
        /// Path to configuration file
        #[arg(long)]
        config_file: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            config_file,
        } => {
            handlers::handle_serve(host, port, config_file).await?;
        }
        Commands::Send {
            opt,
            text,
            target,
            receivers,
            config_file,
        } => {
            let delivered = handlers::handle_send(opt, text, target, receivers, config_file).await?;
            if !delivered {
                std::process::exit(1);
            }
        }
        Commands::Alert { text, config_file } => {
            handlers::handle_alert(text, config_file).await?;
        }
        Commands::Config { init, config_file } => {
            if init {
                handlers::handle_config_init(config_file)?;
            } else {
                println!("Config command requires --init flag");
                println!("Usage: sendtext config --init [--config-file PATH]");
            }
        }
        Commands::Db { config_file } => {
            handlers::handle_db(config_file)?;
        }
    }

    Ok(())
}
