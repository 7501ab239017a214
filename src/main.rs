//! Path Validator Server
//!
//! Hosts the validator behind a WebSocket endpoint.
//! `--demo` instead runs the reference scenarios against an in-memory ledger.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use path_validator::{
    chained_digest,
    ledger::fee::UNITS_PER_COIN,
    network::{ServerConfig, ValidatorServer},
    AccountId, FeeLedger, InMemoryLedger, PathValidator, ValidatorConfig, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Path Validator v{}", VERSION);

    let config = ValidatorConfig::from_env().context("invalid validator configuration")?;
    info!(
        "Max step: {}, layout: {}, hash: {}, fee: {}",
        config.max_step, config.sample_layout, config.hash_scheme, config.fee
    );

    if std::env::args().any(|arg| arg == "--demo") {
        return demo(&config);
    }

    let server_config = ServerConfig::from_env().context("invalid server configuration")?;
    let ledger = Arc::new(InMemoryLedger::new());
    let server = ValidatorServer::new(server_config, PathValidator::new(&config, ledger));

    tokio::select! {
        result = server.run() => result.context("server failed")?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            server.shutdown();
        }
    }

    Ok(())
}

/// Run the five reference submissions and log their outcomes.
fn demo(config: &ValidatorConfig) -> anyhow::Result<()> {
    info!("=== Demo Submissions ===");

    let ledger = Arc::new(InMemoryLedger::new());
    let payer = AccountId::derive("demo-payer");
    ledger.fund(&payer, 10 * UNITS_PER_COIN)?;

    let validator = PathValidator::new(config, Arc::clone(&ledger));

    let good_path: Vec<u8> = (0..64u8).flat_map(|i| [0, i]).collect();
    let bad_path: Vec<u8> = (0..24u8).flat_map(|i| [0, 2 * i]).collect();
    let good_proof = chained_digest(config.hash_scheme, &good_path)?;
    let bad_proof = chained_digest(config.hash_scheme, &bad_path)?;
    let zero_proof = [0u8; 32];

    let scenarios: [(&str, &[u8; 32], &[u8]); 5] = [
        ("unit steps, matching proof", &good_proof, good_path.as_slice()),
        ("unit steps, zero proof", &zero_proof, good_path.as_slice()),
        ("double steps, matching proof", &bad_proof, bad_path.as_slice()),
        ("double steps, zero proof", &zero_proof, bad_path.as_slice()),
        ("empty path", &good_proof, &[][..]),
    ];

    for (name, proof, path) in scenarios {
        match validator.validate(&payer, proof, path) {
            Ok(receipt) => info!(
                "{}: accepted, digest {}, fee {}",
                name,
                hex::encode(receipt.digest),
                receipt.fee.amount
            ),
            Err(e) => warn!("{}: rejected [{}] {}", name, e.code(), e),
        }
    }

    info!("=== Balances ===");
    info!("Payer {}: {}", payer.short(), ledger.balance(&payer)?);
    let treasury = validator.fee_gate().treasury;
    info!("Treasury {}: {}", treasury.short(), ledger.balance(&treasury).unwrap_or(0));

    Ok(())
}
