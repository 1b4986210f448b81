//! Pending transactions, in submission order.

use crate::Transaction;
use parking_lot::Mutex;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct TransactionPool {
    pending: Mutex<VecDeque<Transaction>>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, tx: Transaction) {
        self.pending.lock().push_back(tx);
    }

    /// Snapshot of pending transactions.
    pub fn peek_pending(&self) -> Vec<Transaction> {
        self.pending.lock().iter().cloned().collect()
    }

    /// Remove and return everything pending in one cut. Submissions racing
    /// with this call land either wholly before or wholly after it.
    pub fn drain(&self) -> Vec<Transaction> {
        std::mem::take(&mut *self.pending.lock()).into()
    }

    /// Put drained transactions back ahead of anything submitted since.
    pub fn restore(&self, txs: Vec<Transaction>) {
        let mut pending = self.pending.lock();
        for tx in txs.into_iter().rev() {
            pending.push_front(tx);
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.pending.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(n: u64) -> Transaction {
        Transaction {
            sender: "a".into(),
            recipient: "b".into(),
            value: n as f64,
            time: n,
            signature: format!("sig{n}"),
        }
    }

    #[test]
    fn keeps_insertion_order() {
        let pool = TransactionPool::new();
        for n in 0..5 {
            pool.push(tx(n));
        }
        let times: Vec<u64> = pool.peek_pending().iter().map(|t| t.time).collect();
        assert_eq!(times, vec![0, 1, 2, 3, 4]);
        assert_eq!(pool.len(), 5);
    }

    #[test]
    fn drain_empties_the_pool() {
        let pool = TransactionPool::new();
        pool.push(tx(1));
        pool.push(tx(2));
        let drained = pool.drain();
        assert_eq!(drained, vec![tx(1), tx(2)]);
        assert!(pool.is_empty());
        assert!(pool.drain().is_empty());
    }

    #[test]
    fn restore_goes_ahead_of_newer_submissions() {
        let pool = TransactionPool::new();
        pool.push(tx(1));
        pool.push(tx(2));
        let drained = pool.drain();
        pool.push(tx(3));
        pool.restore(drained);
        assert_eq!(pool.peek_pending(), vec![tx(1), tx(2), tx(3)]);
    }
}
