use ledger_core::{pow, CancelToken, ChainStore, Ledger, LedgerConfig, LedgerError};
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

#[test]
fn tamper_is_detected_end_to_end() -> anyhow::Result<()> {
    let ledger = Ledger::default();
    let alice = ledger.create_client("Alice")?;
    let bob = ledger.create_client("Bob")?;

    // Block 0 first so the transfer lands in block 1.
    ledger.mine(2)?;
    let tx = ledger.submit_transaction("Alice", "Bob", 10.0)?;
    assert_eq!(tx.sender, alice.identity);
    assert_eq!(tx.recipient, bob.identity);

    let mined = ledger.mine(2)?;
    assert_eq!(mined.block_number, 1);
    assert_eq!(mined.transactions_count, 1);
    assert!(mined.block_hash.starts_with("00"));

    let report = ledger.validate();
    assert!(report.valid, "{:?}", report.errors);
    assert_eq!(report.message.as_deref(), Some("Blockchain is valid (2 blocks)"));

    ledger.tamper(1)?;
    let report = ledger.validate();
    assert!(!report.valid);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("Block 1:"));

    let chain = ledger.get_chain();
    assert!(!chain[0].is_tampered);
    assert!(chain[1].is_tampered);
    let actual = chain[1].actual_hash.as_deref().expect("tampered block has actual hash");
    assert_ne!(actual, chain[1].block_hash);
    Ok(())
}

#[test]
fn editing_a_mined_block_in_place_is_invalid() -> anyhow::Result<()> {
    let ledger = Ledger::default();
    ledger.create_client("Alice")?;
    ledger.submit_transaction("Alice", "Bob", 1.0)?;
    ledger.submit_transaction("Alice", "Bob", 2.0)?;
    ledger.mine(2)?;
    assert!(ledger.validate().valid);

    // drop a transfer and claim a trivial difficulty, leaving block_data as mined
    ledger.store().update(0, &mut |block| {
        block.transactions.pop();
        block.nonce = 999_999;
        block.difficulty = 0;
    })?;
    let report = ledger.validate();
    assert!(!report.valid);
    assert!(report.errors.iter().all(|e| e.starts_with("Block 0:")));
    assert!(report
        .errors
        .iter()
        .any(|e| e.contains("Contents don't match block data")));
    assert!(!ledger.get_chain()[0].is_tampered);
    Ok(())
}

#[test]
fn every_mined_block_meets_its_difficulty() -> anyhow::Result<()> {
    let ledger = Ledger::default();
    ledger.create_client("Alice")?;
    let mut rng = rand::thread_rng();
    for difficulty in 1..=3 {
        for _ in 0..rng.gen_range(0..4) {
            ledger.submit_transaction("Alice", "Bob", rng.gen_range(0.0..100.0))?;
        }
        ledger.mine(difficulty)?;
    }
    let blocks = ledger.store().snapshot();
    for (i, block) in blocks.iter().enumerate() {
        assert_eq!(block.block_number, i as u64);
        assert_eq!(block.actual_hash(), block.block_hash);
        assert!(pow::leading_zero_hex_digits(&block.block_hash) >= block.difficulty);
        if i > 0 {
            assert_eq!(block.previous_hash, blocks[i - 1].block_hash);
        }
    }
    Ok(())
}

#[test]
fn validation_is_idempotent() -> anyhow::Result<()> {
    let ledger = Ledger::default();
    ledger.create_client("Alice")?;
    ledger.submit_transaction("Alice", "Bob", 3.5)?;
    ledger.mine(1)?;
    ledger.mine(1)?;
    assert_eq!(ledger.validate(), ledger.validate());
    ledger.tamper(0)?;
    let first = ledger.validate();
    assert_eq!(first, ledger.validate());
    assert!(!first.valid);
    Ok(())
}

#[test]
fn mining_an_empty_pool_yields_an_empty_block() -> anyhow::Result<()> {
    let ledger = Ledger::default();
    let mined = ledger.mine(1)?;
    assert_eq!(mined.transactions_count, 0);
    assert!(ledger.get_chain()[0].transactions.is_empty());
    Ok(())
}

#[test]
fn reset_starts_over_at_block_zero() -> anyhow::Result<()> {
    let ledger = Ledger::default();
    ledger.mine(1)?;
    ledger.mine(1)?;
    ledger.reset();
    assert!(ledger.get_chain().is_empty());
    assert_eq!(ledger.mine(1)?.block_number, 0);
    Ok(())
}

#[test]
fn tamper_out_of_range_is_not_found() {
    let ledger = Ledger::default();
    assert_eq!(ledger.tamper(0), Err(LedgerError::BlockNotFound(0)));
}

#[test]
fn independent_ledgers_do_not_share_state() -> anyhow::Result<()> {
    let a = Ledger::default();
    let b = Ledger::new(LedgerConfig {
        unique_names: false,
        ..LedgerConfig::default()
    });
    a.create_client("Alice")?;
    a.mine(1)?;
    assert!(b.list_clients().is_empty());
    assert!(b.get_chain().is_empty());
    b.create_client("Alice")?;
    b.create_client("Alice")?;
    assert_eq!(b.list_clients().len(), 2);
    Ok(())
}

#[test]
fn concurrent_submissions_are_mined_exactly_once() -> anyhow::Result<()> {
    let ledger = Arc::new(Ledger::default());
    ledger.create_client("Alice")?;
    ledger.create_client("Bob")?;

    let submitter = {
        let ledger = Arc::clone(&ledger);
        thread::spawn(move || {
            let mut signatures = Vec::new();
            for i in 0..200 {
                let tx = ledger
                    .submit_transaction("Alice", "Bob", i as f64)
                    .expect("submit");
                signatures.push(tx.signature);
            }
            signatures
        })
    };

    for _ in 0..5 {
        ledger.mine(2)?;
    }
    let submitted = submitter.join().expect("submitter thread");
    ledger.mine(1)?;
    assert!(ledger.list_pending().is_empty());

    let mined: Vec<String> = ledger
        .store()
        .snapshot()
        .into_iter()
        .flat_map(|b| b.transactions)
        .map(|tx| tx.signature)
        .collect();
    assert_eq!(mined.len(), submitted.len());
    let unique: HashSet<_> = mined.iter().collect();
    assert_eq!(unique.len(), mined.len());
    assert_eq!(mined, submitted);
    assert!(ledger.validate().valid);
    Ok(())
}

#[test]
fn cancelling_from_another_thread_keeps_transactions() -> anyhow::Result<()> {
    let ledger = Arc::new(Ledger::default());
    ledger.create_client("Alice")?;
    ledger.submit_transaction("Alice", "Bob", 1.0)?;

    let cancel = CancelToken::new();
    let miner = {
        let ledger = Arc::clone(&ledger);
        let cancel = cancel.clone();
        thread::spawn(move || ledger.mine_with_cancel(64, &cancel))
    };
    cancel.cancel();
    let outcome = miner.join().expect("miner thread");
    assert_eq!(outcome, Err(LedgerError::MiningCancelled));
    assert_eq!(ledger.list_pending().len(), 1);
    assert!(ledger.get_chain().is_empty());
    Ok(())
}
