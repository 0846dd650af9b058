pub mod client;
pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "stockroom")]
#[command(about = "Stockroom CLI - inspect the resource registry and query a running Stockroom API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, help = "Output in YAML format")]
    pub yaml: bool,

    #[arg(
        long,
        global = true,
        env = "STOCKROOM_API_URL",
        default_value = "http://localhost:3000",
        help = "Base URL of the API"
    )]
    pub url: String,

    #[arg(long, global = true, env = "STOCKROOM_TOKEN", hide_env_values = true, help = "Supabase access token")]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "List the resources this build serves")]
    Resources,

    #[command(about = "Check API and database health")]
    Health,

    #[command(about = "Fetch one page of a resource list")]
    List(commands::list::ListArgs),

    #[command(about = "Show the effective configuration (secrets omitted)")]
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else if cli.yaml {
            OutputFormat::Yaml
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let client = client::ApiClient::new(&cli.url, cli.token.clone())?;

    match cli.command {
        Commands::Resources => commands::resources::handle(output_format),
        Commands::Health => commands::health::handle(&client, output_format).await,
        Commands::List(args) => commands::list::handle(&client, args, output_format).await,
        Commands::Config => commands::resources::show_config(output_format),
    }
}
