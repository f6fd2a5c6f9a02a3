use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Network address of a storage host, e.g. `host1.example.com:9982`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetAddress(String);

impl NetAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NetAddress {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ContractIdParseError {
    #[error("contract id is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("contract id must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractId([u8; 32]);

impl ContractId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl FromStr for ContractId {
    type Err = ContractIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let actual = bytes.len();
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ContractIdParseError::InvalidLength {
                expected: 32,
                actual,
            })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContractId({self})")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contract {
    pub net_address: NetAddress,
    pub id: ContractId,
}

/// Host to contract bindings captured when a download is admitted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContractSnapshot(HashMap<NetAddress, ContractId>);

impl ContractSnapshot {
    pub fn get(&self, address: &NetAddress) -> Option<&ContractId> {
        self.0.get(address)
    }

    pub fn contains(&self, address: &NetAddress) -> bool {
        self.0.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Later contracts for the same address replace earlier ones.
impl FromIterator<Contract> for ContractSnapshot {
    fn from_iter<I: IntoIterator<Item = Contract>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|contract| (contract.net_address, contract.id))
                .collect(),
        )
    }
}
