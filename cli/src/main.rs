// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # CHORUS CLI
//!
//! The `chorus` binary runs multi-provider collaborations from a YAML
//! provider manifest.
//!
//! ## Commands
//!
//! - `chorus collaborate <prompt>` - fan a prompt out per the manifest's
//!   collaboration section and print the synthesized result
//! - `chorus chat --provider <name> <prompt>` - talk to one registered
//!   provider directly, optionally streaming
//! - `chorus models` - list model ids per registered provider

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use futures::StreamExt;
use tracing::info;

use chorus_core::application::{response_metrics, CollaborationEngine};
use chorus_core::domain::collaboration::CollaborationStrategy;
use chorus_core::domain::llm::{ChatRequest, Message};
use chorus_core::domain::provider_config::CollaborationManifest;
use chorus_core::infrastructure::llm::ProviderRegistry;

/// CHORUS - multi-provider AI collaboration
#[derive(Parser)]
#[command(name = "chorus")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the provider manifest
    #[arg(
        short,
        long,
        global = true,
        env = "CHORUS_CONFIG_PATH",
        value_name = "FILE",
        default_value = "chorus.yaml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CHORUS_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a multi-provider collaboration
    Collaborate {
        /// The user prompt
        prompt: String,

        /// System prompt prepended to the conversation
        #[arg(long)]
        system: Option<String>,

        /// Strategy override (sequential, parallel, ensemble, validation)
        #[arg(long)]
        strategy: Option<CollaborationStrategy>,

        /// Per-branch timeout override in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print the raw result as JSON instead of the report
        #[arg(long)]
        json: bool,
    },

    /// Chat with a single registered provider
    Chat {
        /// Registered provider name from the manifest
        #[arg(long)]
        provider: String,

        /// The user prompt
        prompt: String,

        /// Print deltas as they arrive
        #[arg(long)]
        stream: bool,
    },

    /// List model ids per registered provider
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let manifest = CollaborationManifest::from_yaml_file(&cli.config)?;
    let registry = Arc::new(ProviderRegistry::from_configs(&manifest.providers));
    info!("Registry ready with {} provider(s)", registry.len());

    match cli.command {
        Commands::Collaborate {
            prompt,
            system,
            strategy,
            timeout_ms,
            json,
        } => {
            let mut collab = manifest
                .collaboration
                .clone()
                .context("Manifest has no collaboration section")?;
            if let Some(strategy) = strategy {
                collab.strategy = strategy;
            }
            if timeout_ms.is_some() {
                collab.timeout_ms = timeout_ms;
            }

            let mut messages = Vec::new();
            if let Some(system) = system {
                messages.push(Message::system(system));
            }
            messages.push(Message::user(prompt));
            let request = ChatRequest {
                messages,
                ..ChatRequest::default()
            };

            let engine = CollaborationEngine::new(registry);
            let result = engine
                .collaborate(&request, &collab)
                .await
                .context("Collaboration failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", response_metrics::format_collaboration_result(&result));
            }
        }

        Commands::Chat {
            provider,
            prompt,
            stream,
        } => {
            let backend = registry
                .get(&provider)
                .with_context(|| format!("Provider '{}' is not registered", provider))?;
            let request = ChatRequest::from_prompt(prompt);

            if stream {
                let mut deltas = backend
                    .stream_completion(&request)
                    .await
                    .with_context(|| format!("Streaming from '{}' failed", provider))?;
                let mut stdout = std::io::stdout();
                while let Some(delta) = deltas.next().await {
                    write!(stdout, "{}", delta?)?;
                    stdout.flush()?;
                }
                writeln!(stdout)?;
            } else {
                let response = backend
                    .chat_completion(&request)
                    .await
                    .with_context(|| format!("Completion from '{}' failed", provider))?;
                println!("{}", response.text());
            }
        }

        Commands::Models => {
            let models = registry.list_all_models().await;
            let mut names: Vec<&String> = models.keys().collect();
            names.sort();
            for name in names {
                let ids = &models[name];
                if ids.is_empty() {
                    println!("{}: {}", name.cyan(), "(unavailable)".yellow());
                } else {
                    println!("{}: {}", name.cyan(), ids.join(", "));
                }
            }
        }
    }

    Ok(())
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
