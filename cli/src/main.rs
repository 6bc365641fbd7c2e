//! # taike CLI
//!
//! Command-line interface for tAIke, the child-welfare analytics assistant.
//!
//! ## Usage
//!
//! - `taike ask "질문"` - Answer one question with the QA agent
//! - `taike chat` - Interactive conversation with short-term memory
//! - `taike report --district 강남구 --end-year 2030` - District report
//! - `taike policy "요청"` - Policy proposals
//! - `taike serve` - Run the tool server
//! - `taike tools` - Show available tools
//! - `taike import --history history.json` - Load statistics into the database
//! - `taike bound-forecasts --input raw.json` - Bound raw predictions
//! - `taike switch-model base` - Load another model version on the generation server

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod output;

use commands::{
    ask_command, bound_forecasts_command, chat_command, import_command, policy_command,
    report_command, serve_command, switch_model_command, tools_command,
};
use config::CliConfigLoader;

/// taike - child-welfare analytics assistant for Seoul district child centers
#[derive(Parser)]
#[command(name = "taike")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Child-welfare analytics agent with tool calling over MCP")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file or directory path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Generation endpoint URL override
    #[arg(long, global = true)]
    generate_url: Option<String>,

    /// Tool server URL override ("local" runs tools in-process)
    #[arg(long, global = true)]
    mcp_url: Option<String>,

    /// Database path override
    #[arg(long, global = true)]
    db: Option<String>,

    /// Maximum number of LLM calls per agent run
    #[arg(long, global = true)]
    max_iterations: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one question
    Ask {
        /// The question to answer
        question: String,
    },

    /// Start an interactive conversation
    Chat,

    /// Write a district demand report
    Report {
        /// Target district, e.g. 강남구
        #[arg(long)]
        district: String,

        #[arg(long, default_value_t = 2023)]
        start_year: i32,

        #[arg(long)]
        end_year: i32,
    },

    /// Propose district policies
    Policy {
        /// What the policies should address
        prompt: String,
    },

    /// Run the tool server
    Serve {
        /// Address to bind, overriding mcp.bind_address
        #[arg(long)]
        bind: Option<String>,
    },

    /// Show available tools
    Tools {
        /// List the tools of the configured tool server instead
        #[arg(long)]
        remote: bool,
    },

    /// Replace stored statistics with rows from JSON files
    Import {
        /// JSON array of {district, year, child_user}
        #[arg(long)]
        history: Option<PathBuf>,

        /// JSON array of {district, year, predicted_child_user, model_version?}
        #[arg(long)]
        forecasts: Option<PathBuf>,
    },

    /// Bound raw predictions against history and store them
    BoundForecasts {
        /// JSON array of {district, year, child_user_raw}
        #[arg(long)]
        input: PathBuf,

        /// Model version recorded with the stored rows
        #[arg(long, default_value = "final")]
        model_version: String,

        /// Print the bounded values without writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Load another model version on the generation server
    SwitchModel {
        /// Model version to load, e.g. final or base
        model_version: String,
    },
}

/// Build a configuration loader from CLI arguments
fn build_config_loader(cli: &Cli) -> CliConfigLoader {
    let mut loader = CliConfigLoader::new();

    if let Some(config_path) = &cli.config {
        loader = loader.with_config_override(config_path.clone());
    }

    if let Some(url) = &cli.generate_url {
        loader = loader.with_generate_url_override(url.clone());
    }

    if let Some(url) = &cli.mcp_url {
        loader = loader.with_mcp_url_override(url.clone());
    }

    if let Some(db) = &cli.db {
        loader = loader.with_database_override(db.clone());
    }

    if let Some(max_iterations) = cli.max_iterations {
        loader = loader.with_max_iterations_override(max_iterations);
    }

    loader
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    taike_core::init_tracing_with_debug(cli.verbose);

    let config = build_config_loader(&cli).load()?;
    let verbose = cli.verbose;

    match cli.command {
        Commands::Ask { question } => ask_command(config, question, verbose).await,
        Commands::Chat => chat_command(config).await,
        Commands::Report {
            district,
            start_year,
            end_year,
        } => report_command(config, district, start_year, end_year).await,
        Commands::Policy { prompt } => policy_command(config, prompt).await,
        Commands::Serve { bind } => serve_command(config, bind).await,
        Commands::Tools { remote } => tools_command(config, remote).await,
        Commands::BoundForecasts {
            input,
            model_version,
            dry_run,
        } => bound_forecasts_command(config, input, model_version, dry_run).await,
        Commands::Import { history, forecasts } => {
            import_command(config, history, forecasts).await
        }
        Commands::SwitchModel { model_version } => {
            switch_model_command(config, model_version).await
        }
    }
}
