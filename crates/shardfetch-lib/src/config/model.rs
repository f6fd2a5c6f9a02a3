use crate::contracts::NetAddress;
use crate::fetch::FetchOptions;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HostDef {
    pub address: NetAddress,
    /// Base URL chunk objects are fetched from.
    pub endpoint: String,
    /// Hex encoded contract id. Hosts without one are known but not contracted.
    #[serde(default)]
    pub contract_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChunkDef {
    pub object: String,
    pub length: u64,
    pub hosts: Vec<NetAddress>,
    #[serde(default)]
    pub sha256: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileDef {
    pub path: String,
    pub size: u64,
    /// Chunks in file order; offsets follow from the lengths.
    pub chunks: Vec<ChunkDef>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub hosts: Vec<HostDef>,
    pub files: Vec<FileDef>,
    #[serde(default)]
    pub engine: FetchOptions,
}
