pub(crate) const DEFAULT_LISTEN: &str = "127.0.0.1:5001";
pub(crate) const DEFAULT_MINE_TIMEOUT_SECS: u64 = 30;
pub(crate) const API_NAME: &str = "Blockchain Visualizer API";
