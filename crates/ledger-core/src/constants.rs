pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// `previous_hash` recorded on block 0.
pub const GENESIS_PREVIOUS_HASH: &str = "0000000000000000";
pub const DEFAULT_DIFFICULTY: u32 = 2;
pub const MAX_DIFFICULTY: u32 = HASH_HEX_SIZE as u32;
pub const NONCE_LIMIT: u64 = 10_000_000_000;
/// Nonces handed to rayon per round; the cancel token is polled between rounds.
pub const NONCES_PER_ROUND: u64 = 1 << 14;
pub const BLOCK_DATA_SEPARATOR: &str = " - ";
pub const TAMPER_MARKER: &str = " [TAMPERED]";
