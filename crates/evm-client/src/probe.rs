//! RPC endpoint probing
//!
//! Checks that an endpoint answers, reports the chain it claims to serve and
//! how far along it is.

use std::time::{Duration, Instant};

use alloy::providers::Provider;
use dexroute_core::RpcError;
use serde::{Deserialize, Serialize};

use crate::EvmClient;

/// Endpoint health classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum EndpointHealth {
    /// Answering on the expected chain within the latency budget
    Healthy,
    /// Answering on the expected chain, but slowly
    Slow,
    /// Answering for a different chain id
    WrongChain,
    Offline,
}

impl EndpointHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Slow => "Slow",
            Self::WrongChain => "WrongChain",
            Self::Offline => "Offline",
        }
    }
}

/// Probe result for one endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointStatus {
    pub url: String,
    pub expected_chain_id: u64,
    pub reported_chain_id: Option<u64>,
    pub block_number: Option<u64>,
    pub latency_ms: Option<u64>,
    pub health: EndpointHealth,
}

impl EndpointStatus {
    pub fn is_usable(&self) -> bool {
        matches!(self.health, EndpointHealth::Healthy | EndpointHealth::Slow)
    }

    /// Error describing why the endpoint cannot serve `expected_chain_id`
    pub fn check(&self) -> Result<(), RpcError> {
        match (self.health, self.reported_chain_id) {
            (EndpointHealth::WrongChain, Some(actual)) => Err(RpcError::ChainMismatch {
                expected: self.expected_chain_id,
                actual,
            }),
            (EndpointHealth::Offline, _) => Err(RpcError::Transport {
                url: self.url.clone(),
                message: "endpoint offline".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// Latency above which an endpoint is classified as slow
const SLOW_LATENCY: Duration = Duration::from_millis(1_500);

/// Probe `eth_chainId` and `eth_blockNumber` on the client's endpoint
pub async fn probe_endpoint(client: &EvmClient, expected_chain_id: u64) -> EndpointStatus {
    let url = client.endpoint().url.clone();
    let timeout = Duration::from_secs(client.endpoint().timeout_secs);
    let started = Instant::now();

    let reported = match tokio::time::timeout(timeout, client.provider().get_chain_id()).await {
        Ok(Ok(id)) => id,
        Ok(Err(e)) => {
            tracing::warn!(url = %url, error = %e, "RPC endpoint probe failed");
            return offline(url, expected_chain_id);
        }
        Err(_) => {
            tracing::warn!(url = %url, "RPC endpoint probe timed out");
            return offline(url, expected_chain_id);
        }
    };
    let latency = started.elapsed();

    let block_number = tokio::time::timeout(timeout, client.provider().get_block_number())
        .await
        .ok()
        .and_then(|r| r.ok());

    EndpointStatus {
        url,
        expected_chain_id,
        reported_chain_id: Some(reported),
        block_number,
        latency_ms: Some(latency.as_millis() as u64),
        health: classify(expected_chain_id, reported, latency),
    }
}

fn offline(url: String, expected_chain_id: u64) -> EndpointStatus {
    EndpointStatus {
        url,
        expected_chain_id,
        reported_chain_id: None,
        block_number: None,
        latency_ms: None,
        health: EndpointHealth::Offline,
    }
}

fn classify(expected: u64, reported: u64, latency: Duration) -> EndpointHealth {
    if expected != reported {
        EndpointHealth::WrongChain
    } else if latency > SLOW_LATENCY {
        EndpointHealth::Slow
    } else {
        EndpointHealth::Healthy
    }
}
