use anyhow::Context;
use chatstream::{
    ChatSessionBuilder, ChatTransport, HttpChatTransport, Outcome, ReplayTransport,
};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod config;
mod render;

use cli::Cli;
use config::Config;
use render::Renderer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    let transport: Arc<dyn ChatTransport> = match &cli.replay {
        Some(path) => {
            tracing::info!(path = %path.display(), "Replaying recorded stream");
            Arc::new(
                ReplayTransport::from_file(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
            )
        }
        None => {
            tracing::info!(base_url = %config.server.base_url, mode = %cli.mode, "Connecting");
            Arc::new(HttpChatTransport::new(config.server.clone())?)
        }
    };

    let mut builder = ChatSessionBuilder::new()
        .transport(transport)
        .mode(cli.mode)
        .session_config(config.session.clone());
    if let Some(agent) = &cli.agent {
        builder = builder.agent(agent.clone());
    }
    let mut chat = builder.build()?;

    let mut handle = chat.send(cli.request()).await?;

    // Ctrl-C stops the stream; whatever was shown stays on screen
    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut renderer = Renderer::new(std::io::stdout(), std::io::stderr(), cli.show_thinking);
    while let Some(update) = handle.recv().await {
        renderer.apply(&update)?;
    }

    let outcome = chat.wait().await?;
    let answer = chat.transcript().and_then(|t| t.last());
    renderer.finish(answer)?;

    if let Some(id) = chat.conversation_id() {
        tracing::info!(conversation_id = %id, "Continue with --conversation {}", id);
    }

    match outcome {
        Some(Outcome::Failed) => std::process::exit(1),
        Some(Outcome::Aborted) => std::process::exit(130),
        _ => Ok(()),
    }
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // stdout carries the answer, so logs go to stderr
    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
