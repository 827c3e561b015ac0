//! Dynamic long-term memory: retrieval over run-time content

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;

/// Retrieval store for dynamic memory.
///
/// Real deployments back this with a vector store; the orchestrator only
/// needs save and query.
#[async_trait]
pub trait RecallStore: Send + Sync {
    /// Persist a piece of content for later recall
    async fn save_content(&self, text: &str) -> Result<()>;

    /// Retrieve content relevant to `context`, rendered as one blob
    async fn query(&self, context: &str) -> Result<String>;
}

/// In-process reference store scored by keyword overlap.
///
/// Good enough for tests and short runs; not a substitute for a real
/// retrieval backend.
pub struct KeywordRecall {
    entries: Mutex<Vec<String>>,
    /// Maximum entries returned per query
    top_k: usize,
}

impl Default for KeywordRecall {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordRecall {
    pub fn new() -> Self {
        KeywordRecall {
            entries: Mutex::new(Vec::new()),
            top_k: 5,
        }
    }

    /// Seed the store with preloaded test data
    pub fn with_seed(text: &str) -> Self {
        let seed = if text.trim().is_empty() {
            Vec::new()
        } else {
            vec![text.to_string()]
        };
        KeywordRecall {
            entries: Mutex::new(seed),
            top_k: 5,
        }
    }

    fn score(entry: &str, context_words: &[String]) -> usize {
        let entry_lower = entry.to_lowercase();
        context_words
            .iter()
            .filter(|w| entry_lower.contains(w.as_str()))
            .count()
    }
}

#[async_trait]
impl RecallStore for KeywordRecall {
    async fn save_content(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let mut entries = self.entries.lock().await;
        entries.push(text.to_string());
        debug!("Recall store now holds {} entries", entries.len());
        Ok(())
    }

    async fn query(&self, context: &str) -> Result<String> {
        let context_words: Vec<String> = context
            .split_whitespace()
            .filter(|w| w.len() > 2)
            .map(|w| w.to_lowercase())
            .collect();

        let entries = self.entries.lock().await;
        let mut scored: Vec<(usize, &String)> = entries
            .iter()
            .map(|e| (Self::score(e, &context_words), e))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(self.top_k)
            .map(|(_, e)| e.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
