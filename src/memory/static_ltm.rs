//! Static long-term memory: preloaded test data

use std::path::Path;

use tracing::info;

use crate::error::Result;

/// File extensions treated as test data; everything else is skipped
const TEXT_EXTENSIONS: [&str; 6] = ["txt", "json", "csv", "rft", "yaml", "yml"];

/// Consolidated test data, loaded once per orchestrator
#[derive(Debug, Clone, Default)]
pub struct StaticMemory {
    consolidated: Option<String>,
}

impl StaticMemory {
    /// Empty memory (prompts get no test-data substitution)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Memory from an already-assembled blob
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        StaticMemory {
            consolidated: if text.trim().is_empty() { None } else { Some(text) },
        }
    }

    /// Concatenate all text-ish files in a test-data directory.
    ///
    /// Non-text files are skipped rather than rejected; test-data folders
    /// routinely hold screenshots and fixtures next to the data files.
    pub fn load_dir(path: impl AsRef<Path>) -> Result<Self> {
        let mut consolidated = String::new();

        let mut entries: Vec<_> = std::fs::read_dir(path.as_ref())?
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let file_path = entry.path();
            if !file_path.is_file() {
                continue;
            }
            let is_text = file_path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| TEXT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                .unwrap_or(false);
            if !is_text {
                info!("Skipping non-text file: {}", file_path.display());
                continue;
            }
            consolidated.push_str(&std::fs::read_to_string(&file_path)?);
            consolidated.push('\n');
            info!("Test data loaded from: {}", file_path.display());
        }

        Ok(Self::from_text(consolidated))
    }

    /// The preloaded test data, if any
    pub fn get_user_ltm(&self) -> Option<&str> {
        self.consolidated.as_deref()
    }
}
