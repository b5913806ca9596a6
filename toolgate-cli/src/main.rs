//! Toolgate CLI - operate the tool authorization and confirmation gate.
//!
//! Inspects the configured Arcade catalog, walks the user through pending
//! authorizations and calls single tools behind the confirmation prompt.

#![allow(clippy::print_stdout)] // CLI program intentionally uses stdout

mod config;
mod error;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use toolgate::prelude::*;
use toolgate::provider::to_agent_name;
use toolgate::session::cancelled_message;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::{IssueLevel, ToolgateConfig};
use crate::error::Result;

/// Toolgate - authorization and human confirmation for agent tool calls
#[derive(Parser)]
#[command(name = "toolgate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "TOOLGATE_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init(InitArgs),

    /// Show configuration and environment status
    Status,

    /// Manage configuration
    Config(ConfigArgs),

    /// List the configured tool catalog with each tool's policy
    Tools,

    /// Authorize every catalog tool for the configured user
    Authorize,

    /// Call one tool through the gate
    Call(CallArgs),
}

/// Arguments for the init command
#[derive(Args)]
struct InitArgs {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    force: bool,
}

/// Arguments for the config command
#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the configuration file
    Show,
    /// Show configuration file path
    Path,
    /// Validate the effective configuration
    Validate,
}

/// Arguments for the call command
#[derive(Args)]
struct CallArgs {
    /// Tool name, e.g. `Gmail_SendEmail` or `Gmail.SendEmail`
    tool: String,

    /// Tool arguments as a JSON object
    #[arg(short, long, default_value = "{}")]
    args: String,
}

fn main() -> ExitCode {
    // Before parsing so `.env` can supply TOOLGATE_CONFIG.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with the given verbosity level.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "toolgate={level},{}",
            if verbosity >= 2 { "debug" } else { "warn" }
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let path = cli.config.unwrap_or_else(config::config_path);
    match cli.command {
        Commands::Init(args) => cmd_init(args, &path).await,
        Commands::Status => cmd_status(&path).await,
        Commands::Config(args) => cmd_config(args, &path).await,
        Commands::Tools => cmd_tools(&path).await,
        Commands::Authorize => cmd_authorize(&path).await,
        Commands::Call(args) => cmd_call(args, &path).await,
    }
}

/// Prints consent URLs for the operator to open.
#[derive(Debug, Clone, Copy, Default)]
struct ConsoleAuthListener;

#[async_trait]
impl AuthorizationListener for ConsoleAuthListener {
    async fn on_authorization_required(
        &self,
        tool_name: &str,
        _user_id: &str,
        authorization: &Authorization,
    ) {
        match authorization.url.as_deref() {
            Some(url) => {
                println!("Authorization required for {tool_name}. Open this URL to grant access:");
                println!("  {url}");
            }
            None => println!("Authorization required for {tool_name}."),
        }
        println!("Waiting for authorization to complete...");
    }

    async fn on_authorization_completed(&self, tool_name: &str, _user_id: &str) {
        println!("Authorization completed for {tool_name}.");
    }
}

/// Arcade client and gate configuration from the effective config.
fn connect(config: &ToolgateConfig) -> Result<(SharedToolProvider, GateConfig)> {
    let arcade = ArcadeClient::new(config.arcade_config()?)?;
    Ok((Arc::new(arcade), config.gate_config()?))
}

/// A gate that prompts on the terminal and prints consent URLs.
fn console_gate(provider: SharedToolProvider, gate_config: GateConfig) -> ToolGate {
    ToolGate::new(provider, Arc::new(ConsoleConfirmation::stdio()), gate_config)
        .with_listener(Arc::new(ConsoleAuthListener))
}

/// Write the default configuration.
async fn cmd_init(args: InitArgs, path: &Path) -> Result<()> {
    if path.exists() && !args.force {
        println!("Configuration already exists at: {}", path.display());
        println!("Use --force to overwrite.");
        return Ok(());
    }

    config::init_config(path, args.force).await?;

    println!("Configuration created: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. export ARCADE_API_KEY=<key>");
    println!("  2. export ARCADE_USER_ID=<your email>");
    println!("  3. toolgate authorize");

    Ok(())
}

/// Show status.
async fn cmd_status(path: &Path) -> Result<()> {
    println!("Toolgate Status\n");

    println!("Configuration:");
    println!("  Path:   {}", path.display());
    println!("  Exists: {}", if path.exists() { "yes" } else { "no" });

    match config::load_effective(path).await {
        Ok(config) => {
            let issues = config.validate();
            if issues.is_empty() {
                println!("  Valid:  yes");
            } else {
                let valid = if config.is_valid() {
                    "yes (with warnings)"
                } else {
                    "no"
                };
                println!("  Valid:  {valid}");
                for issue in &issues {
                    println!("    {issue}");
                }
            }
            println!();
            println!("Arcade:");
            println!("  Base URL: {}", config.arcade.base_url);
            println!("  User:     {}", config.user_id().unwrap_or("-"));
            println!();
            println!("Agent:");
            println!("  Name:  {}", config.agent.name);
            println!("  Model: {}", config.agent.model);
            println!();
            println!("Catalog:");
            println!("  Tools:    {}", config.catalog.tools.len());
            println!("  Toolkits: {}", config.catalog.toolkits.join(", "));
            println!("  Limit:    {}", config.catalog.limit);
            println!();
            println!("Gate:");
            println!(
                "  Confirm:   {}",
                config.gate.require_confirmation.join(", ")
            );
            if !config.gate.forbidden.is_empty() {
                println!("  Forbidden: {}", config.gate.forbidden.join(", "));
            }
        }
        Err(e) => println!("  Valid:  no ({e})"),
    }

    println!();
    println!("Environment:");
    print_env_status("ARCADE_API_KEY");
    print_env_status("ARCADE_BASE_URL");
    print_env_status("ARCADE_USER_ID");
    print_env_status("OPENAI_MODEL");

    Ok(())
}

/// Configuration management.
async fn cmd_config(args: ConfigArgs, path: &Path) -> Result<()> {
    match args.command {
        ConfigCommands::Path => {
            println!("{}", path.display());
        }
        ConfigCommands::Show => {
            if path.exists() {
                let content = tokio::fs::read_to_string(path).await?;
                println!("{content}");
            } else {
                println!("Configuration file does not exist.");
                println!("Run 'toolgate init' to create one.");
            }
        }
        ConfigCommands::Validate => {
            let config = config::load_effective(path).await?;
            let issues = config.validate();
            for issue in &issues {
                println!("{issue}");
            }
            if issues.iter().any(|i| i.level == IssueLevel::Error) {
                println!("Configuration is invalid");
            } else {
                println!("Configuration is valid");
            }
        }
    }

    Ok(())
}

/// List the catalog.
async fn cmd_tools(path: &Path) -> Result<()> {
    let config = config::load_effective(path).await?;
    let (provider, gate_config) = connect(&config)?;

    let tools = catalog(&provider, &config.tool_query(), &gate_config.user_id).await?;
    println!("{} tools from {}\n", tools.len(), provider.name());

    for tool in &tools {
        let definition = tool.definition();
        let summary = definition.description.lines().next().unwrap_or_default();
        let policy = gate_config.policy(tool.name()).to_string();
        println!("  {:<45} {policy:<21} {summary}", tool.name());
    }

    Ok(())
}

/// Authorize the whole catalog.
async fn cmd_authorize(path: &Path) -> Result<()> {
    let config = config::load_effective(path).await?;
    let (provider, gate_config) = connect(&config)?;
    let user = gate_config.user_id.clone();

    let tools = catalog(&provider, &config.tool_query(), &user).await?;
    let toolbox = console_gate(provider, gate_config).prepare(tools).await?;

    println!("{} tools authorized for {user}", toolbox.len());
    Ok(())
}

/// Call one tool.
async fn cmd_call(args: CallArgs, path: &Path) -> Result<()> {
    let config = config::load_effective(path).await?;
    let (provider, gate_config) = connect(&config)?;

    let name = to_agent_name(&args.tool);
    if gate_config.policy(&name).is_forbidden() {
        return Err(ToolError::forbidden(name).into());
    }
    let input: Value = serde_json::from_str(&args.args)
        .map_err(|e| ToolError::invalid_args(format!("--args is not valid JSON: {e}")))?;

    let user = gate_config.user_id.clone();
    let query = ToolQuery::new().with_tools([name.as_str()]);
    let tools = catalog(&provider, &query, &user).await?;

    let mut toolbox = console_gate(provider, gate_config).prepare(tools).await?;
    toolbox.set_hooks(Arc::new(LoggingAgentHooks::new(&config.agent.name)));

    let ctx = RunContext::new(user).with_profile(config.agent_profile());
    match toolbox.call(&ctx, &name, input).await {
        Ok(value) => {
            let rendered =
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
            println!("{rendered}");
        }
        Err(ToolError::Denied(tool)) => println!("{}", cancelled_message(&tool)),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Print environment variable status.
fn print_env_status(name: &str) {
    let status = if std::env::var(name).is_ok() {
        "set"
    } else {
        "-"
    };
    println!("  {name}: {status}");
}
