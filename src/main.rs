use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use goftar::{
    backends::{LlmBackend, MockBackend, OpenAICompatibleBackend, OpenAICompatibleConfig},
    cli::{Cli, Commands, ConfigAction},
    config::AppConfig,
    console::{console, init_console},
    context_management::TokenCounter,
    conversations::ConversationSession,
};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load().unwrap_or_default();

    let effective_verbosity = cli.get_effective_verbosity(config.get_verbosity());
    init_console(effective_verbosity);

    match cli.command {
        Some(Commands::Config { action }) => handle_config(action)?,
        None => handle_chat(cli.backend, cli.message, &config).await?,
    }

    Ok(())
}

fn create_backend(backend_name: &str, config: &AppConfig) -> Result<Arc<dyn LlmBackend>> {
    match backend_name {
        "mock" => Ok(Arc::new(MockBackend::new())),
        name => {
            let backend_config = config.get_backend_config(name);
            let openai_config = OpenAICompatibleConfig {
                name: name.to_string(),
                api_key: backend_config
                    .and_then(|c| c.resolve_api_key())
                    .unwrap_or_default(),
                model: backend_config
                    .and_then(|c| c.model.clone())
                    .unwrap_or_else(|| OpenAICompatibleConfig::default().model),
                base_url: backend_config
                    .and_then(|c| c.base_url.clone())
                    .unwrap_or_else(|| OpenAICompatibleConfig::default().base_url),
            };
            Ok(Arc::new(OpenAICompatibleBackend::new(openai_config)?))
        }
    }
}

async fn handle_chat(
    backend_name: Option<String>,
    message: Option<String>,
    config: &AppConfig,
) -> Result<()> {
    let backend_name = backend_name.unwrap_or_else(|| config.default_backend.clone());
    let backend = create_backend(&backend_name, config)?;

    let counter = TokenCounter::new()?;
    let strategy = config
        .context
        .clone()
        .into_strategy(counter, Arc::clone(&backend));
    let mut session = ConversationSession::new(backend, strategy);

    if let Some(msg) = message {
        let reply = session.send(&msg).await?;
        console().plain(&reply);
        return Ok(());
    }

    console().info("Starting the conversation. Type 'quit' to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n{} ", "You:".green().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("quit") {
            break;
        }

        match session.send(input).await {
            Ok(reply) => {
                println!("\n{} {}", "AI:".magenta().bold(), reply.magenta());
            }
            Err(e) => {
                // Errors are fatal to the interactive loop; a window
                // overrun in particular means the turn was not committed.
                console().error(&e.to_string());
                break;
            }
        }
    }

    Ok(())
}

fn handle_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = AppConfig::load()?;
            console().plain(&format!(
                "default_backend = \"{}\"",
                config.default_backend
            ));
            if let Some(ref verbosity) = config.verbosity {
                console().plain(&format!("verbosity = \"{}\"", verbosity));
            }

            for (backend_name, backend_config) in &config.backends {
                console().newline();
                console().plain(&format!("[{}]", backend_name));
                if let Some(ref api_key) = backend_config.api_key {
                    let masked_key = if api_key.len() > 8 {
                        format!("{}...{}", &api_key[..4], &api_key[api_key.len() - 4..])
                    } else {
                        "***".to_string()
                    };
                    console().plain(&format!("api_key = \"{}\"", masked_key));
                }
                if let Some(ref model) = backend_config.model {
                    console().plain(&format!("model = \"{}\"", model));
                }
                if let Some(ref base_url) = backend_config.base_url {
                    console().plain(&format!("base_url = \"{}\"", base_url));
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = AppConfig::load()?;

            if key == "default_backend" {
                config.default_backend = value;
            } else if key == "verbosity" {
                match value.as_str() {
                    "quiet" | "normal" | "verbose" | "debug" => {
                        config.verbosity = Some(value);
                    }
                    _ => anyhow::bail!(
                        "Invalid verbosity '{}'. Use quiet, normal, verbose, or debug",
                        value
                    ),
                }
            } else if let Some((backend_name, setting)) = key.split_once('.') {
                config.update_backend_setting(backend_name, setting, value)?;
            } else {
                anyhow::bail!("Unknown config key: {}", key);
            }

            config.save()?;
            console().success("Configuration updated successfully");
        }
    }

    Ok(())
}
