use crate::{
    constants::GENESIS_PREVIOUS_HASH,
    error::{LedgerError, Result},
    Block,
};
use parking_lot::RwLock;

/// Storage the ledger appends mined blocks to.
pub trait ChainStore: Send + Sync {
    /// Adds a finished block at the tail.
    fn append(&self, block: Block);
    fn get(&self, block_number: u64) -> Result<Block>;
    fn len(&self) -> u64;
    /// `block_hash` of the tail, or `None` on an empty chain.
    fn tip_hash(&self) -> Option<String>;
    /// Every block, in order.
    fn snapshot(&self) -> Vec<Block>;
    /// Runs `f` on a stored block in place.
    fn update(&self, block_number: u64, f: &mut dyn FnMut(&mut Block)) -> Result<()>;
    fn clear(&self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hash the next block should link to.
    fn tail_hash(&self) -> String {
        self.tip_hash()
            .unwrap_or_else(|| GENESIS_PREVIOUS_HASH.to_string())
    }
}

/// Process-lifetime chain held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blocks: RwLock<Vec<Block>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChainStore for MemoryStore {
    fn append(&self, block: Block) {
        self.blocks.write().push(block);
    }

    fn get(&self, block_number: u64) -> Result<Block> {
        let blocks = self.blocks.read();
        usize::try_from(block_number)
            .ok()
            .and_then(|i| blocks.get(i))
            .cloned()
            .ok_or(LedgerError::BlockNotFound(block_number))
    }

    fn len(&self) -> u64 {
        self.blocks.read().len() as u64
    }

    fn tip_hash(&self) -> Option<String> {
        self.blocks.read().last().map(|b| b.block_hash.clone())
    }

    fn snapshot(&self) -> Vec<Block> {
        self.blocks.read().clone()
    }

    fn update(&self, block_number: u64, f: &mut dyn FnMut(&mut Block)) -> Result<()> {
        let mut blocks = self.blocks.write();
        let block = usize::try_from(block_number)
            .ok()
            .and_then(|i| blocks.get_mut(i))
            .ok_or(LedgerError::BlockNotFound(block_number))?;
        f(block);
        Ok(())
    }

    fn clear(&self) {
        self.blocks.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlockTemplate;

    fn block(number: u64, previous_hash: &str) -> Block {
        BlockTemplate::new(number, 1, previous_hash, vec![]).finalize(0)
    }

    #[test]
    fn empty_store_links_to_sentinel() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.tip_hash(), None);
        assert_eq!(store.tail_hash(), GENESIS_PREVIOUS_HASH);
    }

    #[test]
    fn append_get_and_tail() {
        let store = MemoryStore::new();
        let genesis = block(0, GENESIS_PREVIOUS_HASH);
        store.append(genesis.clone());
        let next = block(1, &genesis.block_hash);
        store.append(next.clone());
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0).unwrap(), genesis);
        assert_eq!(store.tail_hash(), next.block_hash);
        assert_eq!(store.snapshot(), vec![genesis, next]);
    }

    #[test]
    fn get_out_of_range_is_not_found() {
        let store = MemoryStore::new();
        store.append(block(0, GENESIS_PREVIOUS_HASH));
        assert_eq!(store.get(1), Err(LedgerError::BlockNotFound(1)));
        assert_eq!(store.get(u64::MAX), Err(LedgerError::BlockNotFound(u64::MAX)));
    }

    #[test]
    fn update_and_clear() {
        let store = MemoryStore::new();
        store.append(block(0, GENESIS_PREVIOUS_HASH));
        store.update(0, &mut |b| b.block_data.push('!')).unwrap();
        assert!(store.get(0).unwrap().block_data.ends_with('!'));
        assert_eq!(
            store.update(3, &mut |_| {}),
            Err(LedgerError::BlockNotFound(3))
        );
        store.clear();
        assert!(store.snapshot().is_empty());
    }
}
