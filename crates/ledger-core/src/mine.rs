use crate::{
    constants::NONCES_PER_ROUND,
    error::{LedgerError, Result},
    pow::meets_difficulty,
    Block, BlockTemplate,
};
use rayon::prelude::*;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{info, warn};

/// Shared flag that stops an in-flight nonce search.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Finds the lowest nonce below `nonce_limit` whose block hash has at least
/// `template.difficulty` leading zero hex digits.
///
/// Nonces are searched in rounds of `NONCES_PER_ROUND` spread across rayon's
/// pool. Each round keeps the lowest hit, so the result matches a plain
/// `0, 1, 2, ...` scan. `cancel` is checked between rounds.
pub fn search_nonce(template: &BlockTemplate, nonce_limit: u64, cancel: &CancelToken) -> Result<u64> {
    let difficulty = template.difficulty;
    let mut start = 0u64;
    while start < nonce_limit {
        if cancel.is_cancelled() {
            warn!(block = template.block_number, tried = start, "nonce search cancelled");
            return Err(LedgerError::MiningCancelled);
        }
        let end = start.saturating_add(NONCES_PER_ROUND).min(nonce_limit);
        let found = (start..end)
            .into_par_iter()
            .find_first(|nonce| meets_difficulty(&template.hash_with(*nonce), difficulty));
        if let Some(nonce) = found {
            return Ok(nonce);
        }
        start = end;
    }
    Err(LedgerError::NonceSpaceExhausted {
        limit: nonce_limit,
        difficulty,
    })
}

/// Mines `template` into a finished block.
pub fn mine_block(template: &BlockTemplate, nonce_limit: u64, cancel: &CancelToken) -> Result<Block> {
    let nonce = search_nonce(template, nonce_limit, cancel)?;
    let block = template.finalize(nonce);
    info!(
        "Mined block {} with nonce {} and hash {}",
        block.block_number, block.nonce, block.block_hash
    );
    Ok(block)
}
