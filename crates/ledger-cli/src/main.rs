use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the proof-of-work ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:5001)
    #[arg(long, global = true, env = "LEDGER_NODE", default_value = "http://127.0.0.1:5001")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a client and generate its keypair
    CreateClient {
        name: String,
    },
    /// List registered clients
    Clients,
    /// Submit a signed transaction
    Submit {
        /// Sender name or identity
        #[arg(long)]
        from: String,
        /// Recipient name or identity
        #[arg(long)]
        to: String,
        /// Amount
        #[arg(long)]
        value: f64,
    },
    /// Show pending transactions
    Pending,
    /// Mine the pending transactions into a block
    Mine {
        /// Leading zero hex digits required (node default when omitted)
        #[arg(long)]
        difficulty: Option<u32>,
    },
    /// Print the chain
    Chain,
    /// Validate the whole chain
    Validate,
    /// Corrupt a mined block's data without re-mining it
    Tamper {
        block_number: u64,
    },
    /// Clear chain, pending pool and clients
    Reset,
}

#[derive(Serialize)]
struct NewClient {
    name: String,
}

#[derive(Serialize)]
struct Tx {
    sender: String,
    recipient: String,
    value: f64,
}

#[derive(Serialize)]
struct MineReq {
    difficulty: Option<u32>,
}

struct NodeClient {
    http: reqwest::Client,
    base: String,
}

impl NodeClient {
    fn new(base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_string(),
        }
    }

    async fn get(&self, path: &str) -> Result<Value> {
        debug!("GET {}{path}", self.base);
        let res = self.http.get(format!("{}{path}", self.base)).send().await?;
        Self::unwrap(res).await
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Value> {
        debug!("POST {}{path}", self.base);
        let res = self
            .http
            .post(format!("{}{path}", self.base))
            .json(body)
            .send()
            .await?;
        Self::unwrap(res).await
    }

    /// Pulls `data` out of the `{success, data}` envelope.
    async fn unwrap(res: reqwest::Response) -> Result<Value> {
        let status = res.status();
        let mut body: Value = res.json().await?;
        if !status.is_success() || body["success"] != Value::Bool(true) {
            let error = body["error"].as_str().unwrap_or("unknown error");
            bail!("node returned {status}: {error}");
        }
        Ok(body["data"].take())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = NodeClient::new(&cli.node);
    let data = match cli.cmd {
        Command::CreateClient { name } => node.post("/api/clients", &NewClient { name }).await?,
        Command::Clients => node.get("/api/clients").await?,
        Command::Submit { from, to, value } => {
            let tx = Tx {
                sender: from,
                recipient: to,
                value,
            };
            node.post("/api/transactions", &tx).await?
        }
        Command::Pending => node.get("/api/transactions/pending").await?,
        Command::Mine { difficulty } => node.post("/api/mine", &MineReq { difficulty }).await?,
        Command::Chain => node.get("/api/blockchain").await?,
        Command::Validate => node.get("/api/validate").await?,
        Command::Tamper { block_number } => {
            node.post(&format!("/api/tamper/{block_number}"), &serde_json::json!({}))
                .await?
        }
        Command::Reset => node.post("/api/reset", &serde_json::json!({})).await?,
    };
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}
