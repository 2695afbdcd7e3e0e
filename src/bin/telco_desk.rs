//! Interactive desk on stdin/stdout.
//!
//! Usage: `telco-desk [config.toml]`. Without a file, configuration comes from
//! `TELCO_DESK_*` environment variables. Type `exit` or `quit` to leave.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use telco_desk::config::{self, DeskConfig};
use telco_desk::faq::{builtin_faqs, load_faqs};
use telco_desk::{
    agent_graph, default_guardrails, tool_registry, AgentsError, Collaborators,
    ConversationSession, CoverageMap, EmbeddingFaqIndex, OpenAIEmbedder, OpenAIProvider, Runner,
    SqlitePlanStore,
};

async fn build_runner(config: &DeskConfig) -> telco_desk::Result<Runner> {
    let coverage = match &config.coverage_path {
        Some(path) => CoverageMap::load(path)?,
        None => CoverageMap::builtin()?,
    }
    .with_home_market(&config.home_market);

    let faqs = match &config.faq_path {
        Some(path) => load_faqs(path)?,
        None => builtin_faqs()?,
    };
    let embedder = Arc::new(OpenAIEmbedder::new(config.embedding_model.clone()));
    let faq = EmbeddingFaqIndex::build(embedder, faqs).await?;
    info!(entries = faq.len(), "FAQ index ready");

    let store = SqlitePlanStore::new(&config.database_path).await?;
    info!(path = %config.database_path.display(), "Plan store ready");

    let collaborators = Collaborators {
        store: Arc::new(store),
        faq: Arc::new(faq),
        coverage: Arc::new(coverage),
    };

    let guardrail_model = Arc::new(OpenAIProvider::new(config.guardrail_model.clone()));
    let mut graph = agent_graph(default_guardrails(guardrail_model))?;
    graph.set_sampling(config.temperature, config.max_tokens);

    let provider = Arc::new(OpenAIProvider::new(config.model.clone()));
    Ok(Runner::new(graph, tool_registry(&collaborators), provider)?.with_config(config.run_config()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => config::from_file(path)?,
        None => config::from_env(),
    };
    config.validate()?;
    config::require_api_key()?;

    let runner = build_runner(&config).await?;
    let mut session = if config.demo_mode {
        ConversationSession::demo()
    } else {
        ConversationSession::new()
    };
    info!(session_id = %session.id(), demo = config.demo_mode, "Session started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        match runner.run_turn(&mut session, input).await {
            Ok(turn) => {
                debug!("{}", turn.usage.summary());
                println!("[{}] {}", turn.active_agent, turn.reply);
            }
            Err(e @ AgentsError::CollaboratorUnavailable { .. })
            | Err(e @ AgentsError::Timeout { .. })
            | Err(e @ AgentsError::ToolTimeout { .. }) => {
                error!(error = %e, "Turn failed");
                println!("Sorry, our systems are unavailable right now ({e}). Please try again.");
            }
            Err(e) => {
                error!(error = %e, "Turn failed");
                println!("Sorry, something went wrong: {e}");
            }
        }
    }

    info!(session_id = %session.id(), "Session ended");
    Ok(())
}
