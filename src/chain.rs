//! Simulated chain submission.
//!
//! There is no chain client here. Submission validates its inputs, waits out
//! an artificial delay, and returns a random `0x`-prefixed 32-byte hex string
//! shaped like a transaction hash. A real client would sit behind the same
//! `submit_evidence` signature.

use rand::rngs::OsRng;
use rand::RngCore;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::hashing::is_address;
use crate::settings::ChainSettings;

/// Default artificial delay for a submission.
pub(crate) const SUBMIT_DELAY: Duration = Duration::from_millis(2000);
/// Default artificial delay for a connection test.
pub(crate) const CONNECT_DELAY: Duration = Duration::from_millis(1000);

const ADDRESS_LEN: usize = 42;
const KNOWN_PROVIDERS: &[&str] = &["infura", "alchemy", "localhost"];

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ChainError {
    #[error("Please fill in all blockchain fields (missing {0})")]
    MissingField(&'static str),
    #[error("Invalid contract address")]
    InvalidContractAddress,
    #[error("Invalid wallet address")]
    InvalidWalletAddress,
    #[error("Please enter an RPC URL")]
    EmptyRpcUrl,
    #[error("Could not connect to RPC endpoint")]
    ConnectionFailed,
}

/// Credentials for one submission. The key is only checked for presence.
#[derive(Debug, Clone)]
pub(crate) struct SubmissionRequest {
    pub(crate) contract_address: String,
    pub(crate) wallet_address: String,
    pub(crate) private_key: String,
}

/// Submit an evidence hash and return the (simulated) transaction id.
pub(crate) fn submit_evidence(
    hash: &str,
    metadata: &str,
    request: &SubmissionRequest,
    settings: &ChainSettings,
    delay: Duration,
) -> Result<String, ChainError> {
    let contract = request.contract_address.trim();
    let wallet = request.wallet_address.trim();
    if contract.is_empty() {
        return Err(ChainError::MissingField("contract address"));
    }
    if wallet.is_empty() {
        return Err(ChainError::MissingField("wallet address"));
    }
    if request.private_key.trim().is_empty() {
        return Err(ChainError::MissingField("private key"));
    }
    if !contract.starts_with("0x") || contract.len() != ADDRESS_LEN {
        return Err(ChainError::InvalidContractAddress);
    }
    if !wallet.starts_with("0x") || wallet.len() != ADDRESS_LEN {
        return Err(ChainError::InvalidWalletAddress);
    }
    for (label, address) in [("contract", contract), ("wallet", wallet)] {
        if !is_address(address) {
            warn!(label, address, "address contains non-hex characters");
        }
    }

    debug!(
        %hash,
        metadata_len = metadata.len(),
        network = ?settings.network_name,
        chain_id = settings.chain_id,
        "submitting evidence"
    );
    thread::sleep(delay);

    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let tx_hash = format!("0x{}", hex::encode(bytes));
    info!(%tx_hash, "evidence submitted (simulated)");
    Ok(tx_hash)
}

/// Simulated RPC reachability check.
pub(crate) fn test_connection(rpc_url: &str, delay: Duration) -> Result<(), ChainError> {
    let url = rpc_url.trim();
    if url.is_empty() {
        return Err(ChainError::EmptyRpcUrl);
    }
    thread::sleep(delay);
    if KNOWN_PROVIDERS.iter().any(|provider| url.contains(provider)) {
        Ok(())
    } else {
        Err(ChainError::ConnectionFailed)
    }
}
