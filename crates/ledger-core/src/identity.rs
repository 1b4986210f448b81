//! Client key management, signing and signature verification (Ed25519).

use crate::error::{LedgerError, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// A registered client. The signing key never leaves this struct.
#[derive(Clone)]
pub struct Client {
    name: String,
    identity: String,
    signing: SigningKey,
}

impl Client {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate(name: impl Into<String>) -> Self {
        let signing = SigningKey::generate(&mut OsRng);
        let identity = identity_of(&signing.verifying_key());
        Self {
            name: name.into(),
            identity,
            signing,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hex of the verifying key; the externally visible address.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Sign `payload` and return the hex encoded signature.
    pub fn sign(&self, payload: &[u8]) -> String {
        hex::encode(self.signing.sign(payload).to_bytes())
    }

    pub fn info(&self) -> ClientInfo {
        ClientInfo {
            name: self.name.clone(),
            identity: self.identity.clone(),
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("name", &self.name)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Public view of a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub identity: String,
}

pub fn identity_of(key: &VerifyingKey) -> String {
    hex::encode(key.to_bytes())
}

/// Check a hex signature over `payload` against a hex identity.
pub fn verify_signature(identity: &str, payload: &[u8], signature: &str) -> Result<()> {
    let key_bytes: [u8; 32] = hex::decode(identity)
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| LedgerError::SignatureVerification(format!("malformed identity {identity}")))?;
    let key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| LedgerError::SignatureVerification(e.to_string()))?;
    let sig_bytes = hex::decode(signature)
        .map_err(|_| LedgerError::SignatureVerification("signature is not hex".into()))?;
    let sig = Signature::from_slice(&sig_bytes)
        .map_err(|e| LedgerError::SignatureVerification(e.to_string()))?;
    key.verify(payload, &sig)
        .map_err(|_| LedgerError::SignatureVerification("signature does not match sender".into()))
}

/// Registry of clients in registration order.
#[derive(Debug, Default)]
pub struct IdentityService {
    clients: RwLock<Vec<Client>>,
    unique_names: bool,
}

impl IdentityService {
    pub fn new(unique_names: bool) -> Self {
        Self {
            clients: RwLock::new(Vec::new()),
            unique_names,
        }
    }

    pub fn create_client(&self, name: &str) -> Result<ClientInfo> {
        let client = Client::generate(name);
        let mut clients = self.clients.write();
        if self.unique_names && clients.iter().any(|c| c.name == name) {
            return Err(LedgerError::DuplicateName(name.to_string()));
        }
        let info = client.info();
        clients.push(client);
        info!(name = %info.name, identity = %info.identity, "client created");
        Ok(info)
    }

    /// Resolve a client by name or identity. With duplicate names the most
    /// recent registration wins.
    pub fn find(&self, name_or_identity: &str) -> Option<Client> {
        self.clients
            .read()
            .iter()
            .rev()
            .find(|c| c.name == name_or_identity || c.identity == name_or_identity)
            .cloned()
    }

    /// Identity for a registered name, or the input itself when it names no client.
    pub fn resolve_identity(&self, name_or_identity: &str) -> String {
        self.find(name_or_identity)
            .map(|c| c.identity)
            .unwrap_or_else(|| name_or_identity.to_string())
    }

    pub fn sign(&self, client: &Client, payload: &[u8]) -> String {
        client.sign(payload)
    }

    pub fn list_clients(&self) -> Vec<ClientInfo> {
        self.clients.read().iter().map(Client::info).collect()
    }

    pub fn clear(&self) {
        self.clients.write().clear();
    }
}
