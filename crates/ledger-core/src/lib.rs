pub mod chain;
pub mod constants;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod mine;
pub mod pool;
pub mod tamper;
pub mod validate;

use constants::BLOCK_DATA_SEPARATOR;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use chain::{ChainStore, MemoryStore};
pub use error::{LedgerError, Result};
pub use identity::{Client, ClientInfo, IdentityService};
pub use ledger::{Ledger, LedgerConfig, MinedBlock};
pub use mine::CancelToken;
pub use pool::TransactionPool;
pub use tamper::TamperReport;
pub use validate::{BlockView, ValidationReport};

/// SHA-256 of `data` as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// A signed value transfer. Immutable once signed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub value: f64,
    /// Unix milliseconds at submission.
    pub time: u64,
    pub signature: String,
}

/// Signed fields of a transaction. Declaration order is the wire order, so
/// keys stay sorted no matter how `serde_json` maps are configured.
#[derive(Serialize)]
struct SigningPayload<'a> {
    recipient: &'a str,
    sender: &'a str,
    time: u64,
    value: f64,
}

impl Transaction {
    /// The bytes covered by `signature`: compact JSON with sorted keys.
    pub fn signing_payload(sender: &str, recipient: &str, value: f64, time: u64) -> Vec<u8> {
        let payload = SigningPayload {
            recipient,
            sender,
            time,
            value,
        };
        // strings and numbers into a Vec cannot fail to serialize
        serde_json::to_vec(&payload).unwrap_or_default()
    }

    pub fn payload(&self) -> Vec<u8> {
        Self::signing_payload(&self.sender, &self.recipient, self.value, self.time)
    }

    pub fn verify(&self) -> Result<()> {
        identity::verify_signature(&self.sender, &self.payload(), &self.signature)
    }
}

/// A mined block. `block_hash` is fixed at mining time; only the tamper
/// simulator ever touches `block_data` afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub block_number: u64,
    pub nonce: u64,
    pub difficulty: u32,
    pub previous_hash: String,
    pub transactions: Vec<Transaction>,
    pub block_data: String,
    pub block_hash: String,
}

impl Block {
    /// Hash of the current `block_data`, which differs from `block_hash` once tampered.
    pub fn actual_hash(&self) -> String {
        sha256_hex(self.block_data.as_bytes())
    }

    /// `block_data` as the stored fields would render it.
    pub fn expected_data(&self) -> String {
        build_block_data(
            self.block_number,
            self.difficulty,
            &self.previous_hash,
            &self.transactions,
            self.nonce,
        )
    }
}

/// Everything that goes into a block except the nonce.
///
/// `block_data` is `"{number} - {difficulty} - {sig} - ... - {previous_hash} - {nonce}"`;
/// the part before the nonce is rendered once so the miner only appends digits.
#[derive(Clone, Debug)]
pub struct BlockTemplate {
    pub block_number: u64,
    pub difficulty: u32,
    pub previous_hash: String,
    pub transactions: Vec<Transaction>,
    prefix: String,
}

impl BlockTemplate {
    pub fn new(
        block_number: u64,
        difficulty: u32,
        previous_hash: impl Into<String>,
        transactions: Vec<Transaction>,
    ) -> Self {
        let previous_hash = previous_hash.into();
        let mut prefix = format!("{block_number}{BLOCK_DATA_SEPARATOR}{difficulty}");
        for tx in &transactions {
            prefix.push_str(BLOCK_DATA_SEPARATOR);
            prefix.push_str(&tx.signature);
        }
        prefix.push_str(BLOCK_DATA_SEPARATOR);
        prefix.push_str(&previous_hash);
        prefix.push_str(BLOCK_DATA_SEPARATOR);
        Self {
            block_number,
            difficulty,
            previous_hash,
            transactions,
            prefix,
        }
    }

    pub fn block_data(&self, nonce: u64) -> String {
        format!("{}{}", self.prefix, nonce)
    }

    pub fn hash_with(&self, nonce: u64) -> String {
        sha256_hex(self.block_data(nonce).as_bytes())
    }

    pub fn finalize(&self, nonce: u64) -> Block {
        let block_data = self.block_data(nonce);
        let block_hash = sha256_hex(block_data.as_bytes());
        Block {
            block_number: self.block_number,
            nonce,
            difficulty: self.difficulty,
            previous_hash: self.previous_hash.clone(),
            transactions: self.transactions.clone(),
            block_data,
            block_hash,
        }
    }
}

/// Canonical block data for the given inputs.
pub fn build_block_data(
    block_number: u64,
    difficulty: u32,
    previous_hash: &str,
    transactions: &[Transaction],
    nonce: u64,
) -> String {
    BlockTemplate::new(block_number, difficulty, previous_hash, transactions.to_vec())
        .block_data(nonce)
}

pub mod pow {
    use crate::error::{LedgerError, Result};

    /// Number of leading `'0'` characters in a hex digest.
    pub fn leading_zero_hex_digits(hash_hex: &str) -> u32 {
        hash_hex.bytes().take_while(|b| *b == b'0').count() as u32
    }

    pub fn meets_difficulty(hash_hex: &str, difficulty: u32) -> bool {
        leading_zero_hex_digits(hash_hex) >= difficulty
    }

    pub fn check_difficulty(difficulty: u32, max: u32) -> Result<u32> {
        if difficulty == 0 || difficulty > max {
            return Err(LedgerError::InvalidDifficulty { difficulty, max });
        }
        Ok(difficulty)
    }
}
