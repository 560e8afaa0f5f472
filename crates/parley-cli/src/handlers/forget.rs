//! Forget command handler.

use anyhow::Result;

use crate::store::ConversationStore;

/// Delete the saved conversation id so the next `chat` starts fresh.
pub fn execute(store: &ConversationStore) -> Result<()> {
    if store.clear()? {
        println!("Forgot saved conversation ({})", store.path().display());
    } else {
        println!("No saved conversation");
    }
    Ok(())
}
