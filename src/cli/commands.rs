//! CLI commands

use std::io::Write;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;

use crate::config::Config;
use crate::core::AppState;
use crate::db::PromptRecord;
use crate::inference::{relay, GenerateRequest, RelayEvent};
use crate::prompt::{PromptInput, ServiceError};

#[derive(Parser)]
#[command(name = "sharpie")]
#[command(about = "Self-hostable AI prompt playground backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.sharpie/config.yml)
    #[arg(long)]
    config: Option<String>,

    /// Database path, overrides the config file
    #[arg(long)]
    database: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Port number
        #[arg(long)]
        port: Option<u16>,
    },

    /// Save a prompt and print its share link
    Save {
        #[arg(long)]
        system: String,

        #[arg(long)]
        user: String,

        /// Model name (default from config)
        #[arg(long)]
        model: Option<String>,

        /// Stored response text
        #[arg(long)]
        response: Option<String>,
    },

    /// Show a saved prompt (counts as a hit)
    Show {
        /// Prompt ID
        id: String,
    },

    /// Fork a saved prompt
    Fork {
        /// Parent prompt ID
        parent_id: String,

        #[arg(long)]
        system: String,

        #[arg(long)]
        user: String,

        #[arg(long)]
        model: Option<String>,
    },

    /// Replace the stored response of a prompt
    SetResponse {
        /// Prompt ID
        id: String,

        /// New response text
        response: String,
    },

    /// List saved prompts
    List {
        #[arg(long, value_enum, default_value_t = ListOrder::Recent)]
        order: ListOrder,

        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// List models available on Ollama
    Models,

    /// Stream a generation to stdout
    Generate {
        #[arg(long)]
        system: String,

        #[arg(long)]
        user: String,

        #[arg(long)]
        model: Option<String>,

        /// Save the prompt with the generated response
        #[arg(long)]
        save: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ListOrder {
    Recent,
    Popular,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    let state = AppState::from_config(&config)?;
    let default_model = config.inference.default_model.clone();

    // Create a multi-threaded runtime for CLI operations
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let addr: SocketAddr = format!("{}:{}", host, port)
                .parse()
                .with_context(|| format!("Invalid bind address {}:{}", host, port))?;

            tracing::info!("Using Ollama at {}", state.inference.base_url());
            crate::api::serve(addr, state, &config.allowed_origins).await
        }

        Commands::Save { system, user, model, response } => {
            let input = PromptInput {
                system_prompt: system,
                user_prompt: user,
                model: model.unwrap_or(default_model),
            };
            let shared = state.prompts.save(input, response.unwrap_or_default()).await?;

            println!("Saved prompt: {} ({})", shared.id, shared.url);
            Ok(())
        }

        Commands::Show { id } => {
            let prompt = state.prompts.fetch(&id).await?;
            let parent = state.prompts.parent_of(&id).await?;

            print_prompt(&prompt);
            if let Some(parent) = parent {
                println!("Forked from: {}", parent);
            }
            println!("\nSystem:\n{}\n\nUser:\n{}", prompt.system_prompt, prompt.user_prompt);
            if !prompt.response.is_empty() {
                println!("\nResponse:\n{}", prompt.response);
            }
            Ok(())
        }

        Commands::Fork { parent_id, system, user, model } => {
            let input = PromptInput {
                system_prompt: system,
                user_prompt: user,
                model: model.unwrap_or(default_model),
            };

            match state.prompts.fork(&parent_id, input).await {
                Ok(shared) => {
                    println!("Forked {} -> {} ({})", parent_id, shared.id, shared.url);
                    Ok(())
                }
                Err(ServiceError::LineageNotRecorded { prompt, reason }) => {
                    println!("Saved fork {} ({}) but lineage was not recorded: {}", prompt.id, prompt.url, reason);
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }

        Commands::SetResponse { id, response } => {
            state.prompts.update_response(&id, &response).await?;

            println!("Updated response for {}", id);
            Ok(())
        }

        Commands::List { order, limit } => {
            let prompts = match order {
                ListOrder::Recent => state.prompts.recent(limit).await?,
                ListOrder::Popular => state.prompts.popular(limit).await?,
            };

            if prompts.is_empty() {
                println!("No prompts found");
            } else {
                for prompt in &prompts {
                    print_prompt(prompt);
                }
            }
            Ok(())
        }

        Commands::Models => {
            let models = state.inference.list_models().await?;

            if models.is_empty() {
                println!("No models found");
            } else {
                for model in models {
                    println!("{}", model);
                }
            }
            Ok(())
        }

        Commands::Generate { system, user, model, save } => {
            let request = GenerateRequest {
                system_prompt: system,
                user_prompt: user,
                model: model.unwrap_or(default_model),
            };

            let mut events = Box::pin(relay(state.inference.clone(), request.clone()));
            let mut response = String::new();
            let mut stdout = std::io::stdout();

            while let Some(event) = events.next().await {
                match event {
                    RelayEvent::Text { text } => {
                        print!("{}", text);
                        stdout.flush()?;
                        response.push_str(&text);
                    }
                    RelayEvent::Done { .. } => println!(),
                    RelayEvent::Error { error } => anyhow::bail!("Generation failed: {}", error),
                }
            }

            if save {
                let input = PromptInput {
                    system_prompt: request.system_prompt,
                    user_prompt: request.user_prompt,
                    model: request.model,
                };
                let shared = state.prompts.save(input, response).await?;
                println!("Saved prompt: {} ({})", shared.id, shared.url);
            }
            Ok(())
        }
        }
    })
}

fn print_prompt(prompt: &PromptRecord) {
    println!(
        "[{}] {} - {} hits - {}",
        prompt.id,
        prompt.model,
        prompt.hits,
        prompt.created_at.format("%Y-%m-%d %H:%M:%S")
    );
}
