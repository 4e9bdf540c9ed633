//! Genesis specification: validators, funded accounts, start time.

use serde::{Deserialize, Serialize};
use shared_crypto::Keypair;
use shared_types::{
    Address, PublicKey, Timestamp, Validator, ValidatorId, ValidatorSet, NANOS_PER_SEC, U256,
};
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisValidator {
    pub id: u32,
    pub pubkey: PublicKey,
    pub weight: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub address: Address,
    pub balance: u64,
}

/// The chain's starting point, loadable from JSON.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisSpec {
    /// Chain start time in nanoseconds.
    pub time: Timestamp,
    pub validators: Vec<GenesisValidator>,
    pub accounts: Vec<GenesisAccount>,
}

impl GenesisSpec {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn validator_set(&self) -> ValidatorSet {
        ValidatorSet::build(self.validators.iter().map(|v| Validator {
            id: ValidatorId(v.id),
            pubkey: v.pubkey,
            weight: v.weight,
        }))
    }

    pub fn balances(&self) -> impl Iterator<Item = (Address, U256)> + '_ {
        self.accounts
            .iter()
            .map(|a| (a.address, U256::from(a.balance)))
    }

    /// A deterministic local network: `n` equal-stake validators with
    /// seed-derived keys, each funded under the address `[id; 20]`.
    pub fn demo(n: u32) -> (Self, Vec<Keypair>) {
        let keys: Vec<Keypair> = (1..=n)
            .map(|i| {
                let mut seed = [0u8; 32];
                seed[0] = i as u8;
                Keypair::from_seed(seed)
            })
            .collect();
        let spec = Self {
            time: 1_700_000_000 * NANOS_PER_SEC,
            validators: keys
                .iter()
                .enumerate()
                .map(|(i, kp)| GenesisValidator {
                    id: i as u32 + 1,
                    pubkey: kp.public(),
                    weight: 10,
                })
                .collect(),
            accounts: (1..=n)
                .map(|i| GenesisAccount {
                    address: [i as u8; 20],
                    balance: 1_000_000_000,
                })
                .collect(),
        };
        (spec, keys)
    }
}
