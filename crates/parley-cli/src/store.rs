//! Persistence of the current conversation id.
//!
//! The only state kept between runs: which conversation to resume, and for
//! which persona it was started.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parley_core::ConversationId;
use serde::{Deserialize, Serialize};

/// The saved conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedConversation {
    pub conversation_id: ConversationId,
    pub character_id: String,
}

/// JSON file holding at most one [`SavedConversation`].
#[derive(Debug, Clone)]
pub struct ConversationStore {
    path: PathBuf,
}

impl ConversationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/parley/conversation.json`, e.g.
    /// `~/.local/share/parley/conversation.json` on Linux.
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().context("Could not determine the user data directory")?;
        Ok(data_dir.join("parley").join("conversation.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved conversation, if any. A missing or unreadable file counts
    /// as nothing saved.
    pub fn load(&self) -> Option<SavedConversation> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Could not read saved conversation");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(saved) => Some(saved),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring corrupt saved conversation");
                None
            }
        }
    }

    /// The saved conversation id, but only if it was started with
    /// `character_id`.
    pub fn load_for(&self, character_id: &str) -> Option<ConversationId> {
        self.load()
            .filter(|saved| saved.character_id == character_id)
            .map(|saved| saved.conversation_id)
    }

    pub fn save(&self, saved: &SavedConversation) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(saved)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// Forget the saved conversation. Returns whether one was saved.
    pub fn clear(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to remove {}", self.path.display()))
            }
        }
    }
}
