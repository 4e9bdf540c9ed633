//! A self-driving local chain: each validator emits one transfer event,
//! the in-process engine decides a block, and the result is printed.

use anyhow::Context;
use node_runtime::{build_node, GenesisSpec};
use shared_types::{Rules, SignedTransaction, Timestamp, ValidatorId, NANOS_PER_SEC, U256};
use tracing::info;
use tracing_subscriber::EnvFilter;

const VALIDATORS: u32 = 3;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Some(path) = std::env::args().nth(1) {
        // An external genesis carries no local validator keys: bootstrap
        // the state, report it, and leave emission to real peers.
        let spec = GenesisSpec::load(path.as_ref()).context("loading genesis spec")?;
        let node = build_node(Rules::default(), &spec, spec.validators.len().max(1));
        let pair = node.store.block_epoch_state();
        info!(
            path = %path,
            validators = spec.validators.len(),
            epoch = pair.1.epoch,
            "bootstrapped from external genesis; no local keys, nothing to emit"
        );
        node.service.stop();
        return Ok(());
    }

    let (spec, keys) = GenesisSpec::demo(VALIDATORS);
    let genesis_time = spec.time;
    let node = build_node(Rules::default(), &spec, VALIDATORS as usize);
    let mut blocks = node.feed.subscribe_blocks();

    // One transfer per validator, all towards the first validator's account.
    for i in 1..=VALIDATORS {
        let time = genesis_time + i as Timestamp * NANOS_PER_SEC;
        let tx = SignedTransaction {
            from: [i as u8; 20],
            to: Some([1u8; 20]),
            nonce: 0,
            value: U256::from(1_000),
            gas_limit: 21_000,
            max_fee_per_gas: U256::one(),
            max_priority_fee_per_gas: U256::zero(),
            data: Vec::new(),
            signature: [0u8; 64],
        };
        node.emit(&keys[i as usize - 1], ValidatorId(i), vec![tx], time)
            .with_context(|| format!("emitting from validator {i}"))?;
    }

    while let Ok(block) = blocks.try_recv() {
        info!(
            height = block.height,
            events = block.events.len(),
            txs = block.transactions.len(),
            "observed finalized block"
        );
    }
    let pair = node.store.block_epoch_state();
    info!(
        last_block = pair.0.last_block,
        epoch = pair.1.epoch,
        "demo chain complete"
    );
    node.service.stop();
    Ok(())
}
