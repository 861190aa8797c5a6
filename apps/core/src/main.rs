// Pulse entry point
// Reads one journal entry (or command) per stdin line, writes one JSON line per result.

use anyhow::Context;
use serde::Deserialize;
use serde_json::json;
use std::env;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use pulse_core::database::SqliteStore;
use pulse_core::dataset;
use pulse_core::fs_manager::PortablePathManager;
use pulse_core::{
    BrainAnalyzer, BrainConfig, FileStore, KeyValueStore, MemoryStore, StoreBackend, StoreConfig,
    UpstreamAnalysis, UserFeedback,
};

/// Structured stdin commands; any line not starting with `{` is a plain entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Command {
    Classify {
        text: String,
        #[serde(default)]
        user_id: Option<String>,
        #[serde(default)]
        upstream: Option<UpstreamAnalysis>,
    },
    Feedback(UserFeedback),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PULSE_LOG")
        .unwrap_or_else(|_| EnvFilter::new("pulse_core=info,pulse=info"));
    let json_output = env::var("PULSE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // stdout carries results, logs go to stderr
    let registry = tracing_subscriber::registry().with(filter);
    if json_output {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

async fn open_store(
    config: &StoreConfig,
    paths: &PortablePathManager,
) -> Option<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::File => Arc::new(FileStore::new(paths.feedback_dir())),
        StoreBackend::Sqlite => {
            let sqlite = match SqliteStore::connect(&paths.db_path()).await {
                Ok(sqlite) => sqlite,
                Err(e) => {
                    error!("Failed to open SQLite store, continuing in memory: {}", e);
                    return None;
                }
            };
            Arc::new(sqlite)
        }
    };
    info!("Feedback store: {:?} under {:?}", config.backend, paths.data_dir());
    Some(store)
}

fn handle_line(analyzer: &BrainAnalyzer, line: &str, default_user: &str) -> serde_json::Value {
    if !line.starts_with('{') {
        let result = analyzer.classify_entry(line, default_user);
        return json!({ "entry_id": Uuid::new_v4().to_string(), "result": result });
    }

    match serde_json::from_str::<Command>(line) {
        Ok(Command::Classify {
            text,
            user_id,
            upstream,
        }) => {
            let user_id = user_id.unwrap_or_else(|| default_user.to_string());
            let result = match upstream {
                Some(upstream) => analyzer.classify_with_upstream(&text, &user_id, &upstream),
                None => analyzer.classify_entry(&text, &user_id),
            };
            json!({ "entry_id": Uuid::new_v4().to_string(), "result": result })
        }
        Ok(Command::Feedback(feedback)) => {
            let entry_id = feedback.entry_id.clone();
            match analyzer.submit_feedback(feedback) {
                Ok(()) => json!({ "entry_id": entry_id, "status": "recorded" }),
                Err(e) => json!({ "entry_id": entry_id, "error": e.to_string() }),
            }
        }
        Err(e) => {
            warn!("Unreadable command: {}", e);
            json!({ "error": format!("unreadable command: {}", e) })
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = BrainConfig::from_env().context("Invalid brain configuration")?;
    let store_config = StoreConfig::from_env().context("Invalid store configuration")?;

    let paths = PortablePathManager::new(&store_config.data_dir);
    let store = match paths.init() {
        Ok(()) => open_store(&store_config, &paths).await,
        Err(e) => {
            error!("Failed to create data directories, feedback stays in memory: {}", e);
            None
        }
    };

    let corpus = match env::var("PULSE_CORPUS_PATH") {
        Ok(path) => dataset::load_corpus_from_path(&path)
            .await
            .with_context(|| format!("Failed to load training corpus from {}", path))?,
        Err(_) => dataset::default_corpus().context("Embedded training corpus is invalid")?,
    };

    let analyzer = BrainAnalyzer::new(config, corpus, store)?;
    analyzer.warm_up();
    analyzer.load_feedback().await;

    let user_id = env::var("PULSE_USER_ID").unwrap_or_else(|_| "local".to_string());
    info!("Reading journal entries from stdin as user {}", user_id);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let output = handle_line(&analyzer, line, &user_id);
        println!("{}", output);
    }

    if let Err(e) = analyzer.flush_feedback().await {
        warn!("Failed to flush feedback on shutdown: {}", e);
    }
    info!("Shutting down");
    Ok(())
}
