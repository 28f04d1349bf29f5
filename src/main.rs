use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use droidclaw::config::{load_config, load_config_from, AppConfig};
use droidclaw::errors::DroidClawResult;
use droidclaw::llm::history::trim_messages;
use droidclaw::llm::provider::collect_decision;
use droidclaw::llm::registry::ProviderRegistry;
use droidclaw::llm::types::ChatMessage;
use droidclaw::perception::pipeline::build_screen_context;

/// Minimal instruction text; the production prompt is supplied by the agent loop.
const SYSTEM_PROMPT: &str = "You control an Android device. Given the goal and the on-screen \
elements, reply with ONE JSON object: {\"action\": ..., \"reason\": ..., \"coordinates\": [x, y]} \
plus any fields the action needs. Use \"wait\" when unsure.";

#[derive(Parser, Debug)]
#[command(name = "droidclaw", version, about = "Android screen perception and LLM decision tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config.toml (default: next to the executable, then the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a uiautomator dump and print its fingerprint and compact elements
    Inspect {
        /// Accessibility XML dump
        dump: PathBuf,

        /// Maximum compact elements (default: [agent] max_elements)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Ask a provider for the next action on a dumped screen
    Decide {
        /// Accessibility XML dump
        dump: PathBuf,

        /// Goal to pursue
        #[arg(long)]
        goal: String,

        /// Provider id from config.toml (default: active provider)
        #[arg(long)]
        provider: Option<String>,

        /// Use the streaming call and accumulate the fragments
        #[arg(long)]
        stream: bool,
    },
}

fn resolve_config(path: Option<&Path>) -> DroidClawResult<AppConfig> {
    match path {
        Some(p) => load_config_from(p),
        None => load_config().or_else(|e| {
            tracing::warn!(error = %e, "no config.toml, using built-in defaults");
            Ok(AppConfig::default())
        }),
    }
}

fn cmd_inspect(config: &AppConfig, dump: &Path, limit: Option<usize>) -> DroidClawResult<()> {
    let xml = std::fs::read_to_string(dump)?;
    let limit = limit.unwrap_or(config.agent.max_elements);
    let ctx = build_screen_context(&xml, &config.ranking, limit);

    println!("fingerprint: {}", ctx.fingerprint);
    println!("elements: {} extracted, {} kept", ctx.elements.len(), ctx.compact.len());
    if let Some(warning) = &ctx.warning {
        println!("warning: {warning}");
    }
    println!("{}", ctx.to_prompt_json()?);
    Ok(())
}

async fn cmd_decide(
    config: &AppConfig,
    dump: &Path,
    goal: &str,
    provider: Option<String>,
    stream: bool,
) -> DroidClawResult<()> {
    let xml = std::fs::read_to_string(dump)?;
    let ctx = build_screen_context(&xml, &config.ranking, config.agent.max_elements);

    let mut registry = ProviderRegistry::from_config(config)?;
    if let Some(id) = provider {
        registry.set_active(id)?;
    }
    let provider = registry.get_active()?;

    let screen = if ctx.is_empty() {
        tracing::warn!("no accessibility elements; a screenshot would be needed");
        "No accessibility elements were found on this screen.".to_string()
    } else {
        format!("Screen elements:\n{}", ctx.to_prompt_json()?)
    };
    let history = vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!("Goal: {goal}\n\n{screen}")),
    ];
    let messages = trim_messages(&history, config.agent.max_history_steps);

    let use_stream = stream && config.agent.streaming_enabled && provider.capabilities().supports_streaming;
    let decision = if use_stream {
        collect_decision(provider.get_decision_stream(&messages).await?).await?
    } else {
        provider.get_decision(&messages).await?
    };

    tracing::info!(provider = %provider.name(), action = %decision.action, "decision");
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    droidclaw::init_tracing();

    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Inspect { dump, limit } => cmd_inspect(&config, &dump, limit)?,
        Commands::Decide {
            dump,
            goal,
            provider,
            stream,
        } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(cmd_decide(&config, &dump, &goal, provider, stream))?;
        }
    }
    Ok(())
}
