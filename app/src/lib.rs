//! dexroute server library

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dexroute_api::AppState;
use dexroute_core::{AppConfig, ChainRegistry};
use evm_client::{probe_endpoint, EndpointStatus, EvmClient};
use futures::future::join_all;
use router::Aggregator;

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dexroute=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .init();
    Ok(())
}

/// Build one client per configured endpoint. Chains missing from the
/// registry are skipped.
fn build_clients(
    config: &AppConfig,
    registry: &ChainRegistry,
) -> anyhow::Result<Vec<(u64, EvmClient)>> {
    let mut clients = Vec::with_capacity(config.rpc.len());
    for (&chain_id, endpoint) in &config.rpc {
        if registry.get(chain_id).is_err() {
            tracing::warn!(chain_id, url = %endpoint.url, "RPC endpoint for unknown chain ignored");
            continue;
        }
        let client = EvmClient::new(endpoint.clone())
            .with_context(|| format!("creating RPC client for chain {chain_id}"))?;
        clients.push((chain_id, client));
    }
    Ok(clients)
}

/// Probe every endpoint once and log the outcome
async fn probe_all(clients: &[(u64, EvmClient)]) -> Vec<(u64, EndpointStatus)> {
    join_all(clients.iter().map(|(chain_id, client)| async move {
        let status = probe_endpoint(client, *chain_id).await;
        match status.check() {
            Ok(()) => tracing::info!(
                chain_id,
                health = status.health.as_str(),
                block = ?status.block_number,
                latency_ms = ?status.latency_ms,
                "RPC endpoint ready"
            ),
            Err(e) => tracing::warn!(chain_id, error = %e, "RPC endpoint unusable"),
        }
        (*chain_id, status)
    }))
    .await
}

/// Load configuration, wire up the aggregator and serve the API
pub async fn run() -> anyhow::Result<()> {
    init_tracing()?;
    tracing::info!("Starting dexroute");

    let config = AppConfig::from_env().context("loading configuration")?;
    let registry = Arc::new(ChainRegistry::embedded().context("loading chain registry")?);
    tracing::info!(chains = registry.len(), "chain registry loaded");

    let clients = build_clients(&config, &registry)?;
    let statuses = probe_all(&clients).await;

    let mut aggregator = Aggregator::new(registry, config.quote.clone());
    for (chain_id, client) in clients {
        aggregator = aggregator.with_reader(chain_id, Arc::new(client));
    }

    let state = AppState::new(aggregator);
    for (chain_id, status) in statuses {
        state.set_endpoint_status(chain_id, status).await;
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.server.host, config.server.port))?;
    dexroute_api::start_server(state, addr)
        .await
        .context("API server stopped")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dexroute_core::RpcEndpoint;

    #[test]
    fn test_build_clients_skips_unknown_chains() {
        let mut config = AppConfig::default();
        config.rpc.insert(8453, RpcEndpoint::new("http://127.0.0.1:8545"));
        config.rpc.insert(999, RpcEndpoint::new("http://127.0.0.1:8546"));
        let registry = ChainRegistry::embedded().unwrap();

        let clients = build_clients(&config, &registry).unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].0, 8453);
    }

    #[test]
    fn test_build_clients_rejects_bad_url() {
        let mut config = AppConfig::default();
        config.rpc.insert(8453, RpcEndpoint::new("not a url"));
        let registry = ChainRegistry::embedded().unwrap();
        assert!(build_clients(&config, &registry).is_err());
    }
}
