//! The ledger context: identities, pending pool and chain owned together.
//! Construct one per independent chain.

use crate::{
    chain::{ChainStore, MemoryStore},
    constants::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY, NONCE_LIMIT},
    error::{LedgerError, Result},
    identity::{ClientInfo, IdentityService},
    mine::{mine_block, CancelToken},
    pool::TransactionPool,
    pow,
    tamper::{self, TamperReport},
    validate::{self, BlockView, ValidationReport},
    Block, BlockTemplate, Transaction,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Used by `mine` callers that do not pick a difficulty.
    pub default_difficulty: u32,
    pub max_difficulty: u32,
    /// Reject a second client with an existing name.
    pub unique_names: bool,
    /// Mine zero-transaction blocks instead of refusing with `EmptyPool`.
    pub allow_empty_blocks: bool,
    /// Re-verify every transaction signature during validation.
    pub verify_signatures: bool,
    pub nonce_limit: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_difficulty: DEFAULT_DIFFICULTY,
            max_difficulty: MAX_DIFFICULTY,
            unique_names: true,
            allow_empty_blocks: true,
            verify_signatures: true,
            nonce_limit: NONCE_LIMIT,
        }
    }
}

/// Summary returned by `mine`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinedBlock {
    pub block_number: u64,
    pub nonce: u64,
    pub block_hash: String,
    pub previous_hash: String,
    pub transactions_count: usize,
}

impl From<&Block> for MinedBlock {
    fn from(block: &Block) -> Self {
        Self {
            block_number: block.block_number,
            nonce: block.nonce,
            block_hash: block.block_hash.clone(),
            previous_hash: block.previous_hash.clone(),
            transactions_count: block.transactions.len(),
        }
    }
}

pub struct Ledger<S: ChainStore = MemoryStore> {
    config: LedgerConfig,
    identities: IdentityService,
    pool: TransactionPool,
    store: Arc<S>,
    // Held for a whole mine and for reset; data locks are only taken briefly.
    mining: Mutex<()>,
}

impl Ledger<MemoryStore> {
    pub fn new(config: LedgerConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }
}

impl Default for Ledger<MemoryStore> {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

impl<S: ChainStore> Ledger<S> {
    pub fn with_store(config: LedgerConfig, store: Arc<S>) -> Self {
        Self {
            identities: IdentityService::new(config.unique_names),
            pool: TransactionPool::new(),
            store,
            mining: Mutex::new(()),
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn create_client(&self, name: &str) -> Result<ClientInfo> {
        self.identities.create_client(name)
    }

    pub fn list_clients(&self) -> Vec<ClientInfo> {
        self.identities.list_clients()
    }

    /// Signs a transfer from `sender` (a registered name or identity) and
    /// queues it. `recipient` may be a registered name or any identity string.
    pub fn submit_transaction(&self, sender: &str, recipient: &str, value: f64) -> Result<Transaction> {
        if !value.is_finite() || value.is_sign_negative() {
            return Err(LedgerError::InvalidAmount(value));
        }
        let client = self
            .identities
            .find(sender)
            .ok_or_else(|| LedgerError::UnknownSender(sender.to_string()))?;
        let recipient = self.identities.resolve_identity(recipient);
        let time = now_millis();
        let payload = Transaction::signing_payload(client.identity(), &recipient, value, time);
        let tx = Transaction {
            sender: client.identity().to_string(),
            recipient,
            value,
            time,
            signature: self.identities.sign(&client, &payload),
        };
        self.pool.push(tx.clone());
        debug!(sender = client.name(), value, "transaction queued");
        Ok(tx)
    }

    pub fn list_pending(&self) -> Vec<Transaction> {
        self.pool.peek_pending()
    }

    pub fn mine(&self, difficulty: u32) -> Result<MinedBlock> {
        self.mine_with_cancel(difficulty, &CancelToken::new())
    }

    /// Drains the pool, searches for a nonce and appends the block.
    ///
    /// If the search is cancelled or exhausts the nonce limit, the drained
    /// transactions go back to the head of the pool and the chain is unchanged.
    pub fn mine_with_cancel(&self, difficulty: u32, cancel: &CancelToken) -> Result<MinedBlock> {
        let difficulty = pow::check_difficulty(difficulty, self.config.max_difficulty)?;
        let _mining = self.mining.lock();

        let txs = self.pool.drain();
        if txs.is_empty() && !self.config.allow_empty_blocks {
            return Err(LedgerError::EmptyPool);
        }
        let template = BlockTemplate::new(self.store.len(), difficulty, self.store.tail_hash(), txs);

        let block = match mine_block(&template, self.config.nonce_limit, cancel) {
            Ok(block) => block,
            Err(e) => {
                warn!(
                    block = template.block_number,
                    restored = template.transactions.len(),
                    "mining aborted: {e}"
                );
                self.pool.restore(template.transactions);
                return Err(e);
            }
        };
        let mined = MinedBlock::from(&block);
        self.store.append(block);
        Ok(mined)
    }

    pub fn get_block(&self, block_number: u64) -> Result<Block> {
        self.store.get(block_number)
    }

    pub fn get_chain(&self) -> Vec<BlockView> {
        self.store.snapshot().iter().map(validate::inspect).collect()
    }

    pub fn validate(&self) -> ValidationReport {
        validate::validate_blocks(&self.store.snapshot(), self.config.verify_signatures)
    }

    pub fn tamper(&self, block_number: u64) -> Result<TamperReport> {
        tamper::tamper(&*self.store, block_number)
    }

    /// Clears the chain, the pool and every registered client. Waits for an
    /// in-flight mine to finish.
    pub fn reset(&self) {
        let _mining = self.mining.lock();
        self.store.clear();
        self.pool.clear();
        self.identities.clear();
        info!("ledger reset");
    }
}
