use crate::{chain::ChainStore, constants::TAMPER_MARKER, error::Result};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TamperReport {
    pub message: String,
}

fn short(hash: &str) -> &str {
    hash.get(..20).unwrap_or(hash)
}

/// Appends a marker to a stored block's data without re-mining, so the
/// recorded `block_hash` no longer matches.
pub fn tamper<S: ChainStore + ?Sized>(store: &S, block_number: u64) -> Result<TamperReport> {
    let mut message = String::new();
    store.update(block_number, &mut |block| {
        block.block_data.push_str(TAMPER_MARKER);
        message = format!(
            "Block {block_number} tampered! Stored hash {}... no longer matches actual hash {}...",
            short(&block.block_hash),
            short(&block.actual_hash()),
        );
    })?;
    info!(block = block_number, "block tampered");
    Ok(TamperReport { message })
}
