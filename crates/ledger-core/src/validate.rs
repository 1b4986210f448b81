//! Whole-chain consistency checks. Never mutates anything; inconsistencies
//! come back as data.

use crate::{
    constants::{GENESIS_PREVIOUS_HASH, MAX_DIFFICULTY, TAMPER_MARKER},
    pow::{check_difficulty, meets_difficulty},
    Block, Transaction,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// A block as rendered to callers, with the tamper flag derived at read time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockView {
    pub block_number: u64,
    pub nonce: u64,
    pub difficulty: u32,
    pub block_hash: String,
    pub previous_hash: String,
    pub transactions: Vec<Transaction>,
    pub block_data: String,
    pub is_tampered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_hash: Option<String>,
}

pub fn inspect(block: &Block) -> BlockView {
    let actual = block.actual_hash();
    let is_tampered = actual != block.block_hash;
    BlockView {
        block_number: block.block_number,
        nonce: block.nonce,
        difficulty: block.difficulty,
        block_hash: block.block_hash.clone(),
        previous_hash: block.previous_hash.clone(),
        transactions: block.transactions.clone(),
        block_data: block.block_data.clone(),
        is_tampered,
        actual_hash: is_tampered.then_some(actual),
    }
}

/// `block_data` with any tamper markers stripped off the end.
fn untampered_data(block_data: &str) -> &str {
    let mut data = block_data;
    while let Some(rest) = data.strip_suffix(TAMPER_MARKER) {
        data = rest;
    }
    data
}

/// Problems found in the block at position `i`.
fn block_errors(i: usize, block: &Block, previous: Option<&Block>, verify_signatures: bool) -> Vec<String> {
    let mut errors = Vec::new();
    if block.block_number != i as u64 {
        errors.push(format!(
            "Block {i}: Out of sequence (recorded block number {})",
            block.block_number
        ));
    }
    if check_difficulty(block.difficulty, MAX_DIFFICULTY).is_err() {
        errors.push(format!("Block {i}: Invalid difficulty ({})", block.difficulty));
    } else if !meets_difficulty(&block.block_hash, block.difficulty) {
        errors.push(format!("Block {i}: Invalid hash (doesn't meet difficulty)"));
    }
    if block.actual_hash() != block.block_hash {
        errors.push(format!("Block {i}: Hash mismatch (block was tampered)"));
    }
    // the tamper marker is reported as a hash mismatch; anything else is a
    // field that no longer matches what was mined
    if untampered_data(&block.block_data) != block.expected_data() {
        errors.push(format!("Block {i}: Contents don't match block data"));
    }
    match previous {
        Some(prev) if block.previous_hash != prev.block_hash => {
            errors.push(format!("Block {i}: Chain broken (previous hash doesn't match)"));
        }
        None if block.previous_hash != GENESIS_PREVIOUS_HASH => {
            errors.push(format!("Block {i}: Genesis block does not link to the sentinel hash"));
        }
        _ => {}
    }
    if verify_signatures {
        for (j, tx) in block.transactions.iter().enumerate() {
            if let Err(e) = tx.verify() {
                errors.push(format!("Block {i}: Invalid signature on transaction {j} ({e})"));
            }
        }
    }
    errors
}

pub fn validate_blocks(blocks: &[Block], verify_signatures: bool) -> ValidationReport {
    if blocks.is_empty() {
        return ValidationReport {
            valid: true,
            message: Some("Blockchain is empty".to_string()),
            errors: vec![],
        };
    }

    let errors: Vec<String> = blocks
        .iter()
        .enumerate()
        .flat_map(|(i, block)| {
            let previous = i.checked_sub(1).map(|p| &blocks[p]);
            block_errors(i, block, previous, verify_signatures)
        })
        .collect();
    debug!(blocks = blocks.len(), errors = errors.len(), "chain validated");

    if errors.is_empty() {
        ValidationReport {
            valid: true,
            message: Some(format!("Blockchain is valid ({} blocks)", blocks.len())),
            errors,
        }
    } else {
        ValidationReport {
            valid: false,
            message: None,
            errors,
        }
    }
}
