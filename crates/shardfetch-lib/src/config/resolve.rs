use super::model::{Config, FileDef};
use crate::catalog::{ChunkLayout, FileEntry};
use crate::contracts::{Contract, ContractId, NetAddress};
use crate::error::ShardFetchError;
use itertools::Itertools;
use std::collections::HashSet;
use url::Url;

fn invalid(details: String) -> ShardFetchError {
    ShardFetchError::ConfigValidation { details }
}

impl Config {
    /// Checks every host and file definition without building anything.
    pub fn validate(&self) -> Result<(), ShardFetchError> {
        self.endpoints()?;
        self.contracts()?;
        self.file_entries()?;
        Ok(())
    }

    /// `(address, endpoint)` for every configured host.
    pub fn endpoints(&self) -> Result<Vec<(NetAddress, String)>, ShardFetchError> {
        if let Some(duplicate) = self.hosts.iter().map(|host| &host.address).duplicates().next() {
            return Err(invalid(format!("Host {duplicate} is defined more than once")));
        }

        self.hosts
            .iter()
            .map(|host| -> Result<_, ShardFetchError> {
                Url::parse(&host.endpoint).map_err(|e| {
                    invalid(format!(
                        "Invalid endpoint {} for host {}: {}",
                        host.endpoint, host.address, e
                    ))
                })?;
                Ok((host.address.clone(), host.endpoint.clone()))
            })
            .collect()
    }

    pub fn contracts(&self) -> Result<Vec<Contract>, ShardFetchError> {
        self.hosts
            .iter()
            .filter_map(|host| host.contract_id.as_ref().map(|id| (host, id)))
            .map(|(host, id)| -> Result<_, ShardFetchError> {
                let id: ContractId = id.parse().map_err(|e| {
                    invalid(format!("Invalid contract id for host {}: {}", host.address, e))
                })?;
                Ok(Contract {
                    net_address: host.address.clone(),
                    id,
                })
            })
            .collect()
    }

    pub fn file_entries(&self) -> Result<Vec<FileEntry>, ShardFetchError> {
        let known_hosts: HashSet<&NetAddress> = self.hosts.iter().map(|host| &host.address).collect();

        if let Some(duplicate) = self.files.iter().map(|file| &file.path).duplicates().next() {
            return Err(invalid(format!("File {duplicate} is defined more than once")));
        }

        self.files
            .iter()
            .map(|file| file_entry(file, &known_hosts))
            .collect()
    }
}

fn file_entry(file: &FileDef, known_hosts: &HashSet<&NetAddress>) -> Result<FileEntry, ShardFetchError> {
    let mut chunks = Vec::with_capacity(file.chunks.len());
    let mut offset = 0u64;

    for chunk in &file.chunks {
        if chunk.length == 0 {
            return Err(invalid(format!(
                "Chunk {} of {} has zero length",
                chunk.object, file.path
            )));
        }
        if let Some(unknown) = chunk.hosts.iter().find(|host| !known_hosts.contains(host)) {
            return Err(invalid(format!(
                "Chunk {} of {} refers to unknown host {}",
                chunk.object, file.path, unknown
            )));
        }
        let sha256 = chunk
            .sha256
            .as_deref()
            .map(|digest| match hex::decode(digest) {
                Ok(bytes) if bytes.len() == 32 => Ok(bytes),
                _ => Err(invalid(format!(
                    "Chunk {} of {} has an invalid SHA-256 digest {}",
                    chunk.object, file.path, digest
                ))),
            })
            .transpose()?;

        chunks.push(ChunkLayout {
            offset,
            length: chunk.length,
            object: chunk.object.clone(),
            hosts: chunk.hosts.clone(),
            sha256,
        });
        offset = offset.checked_add(chunk.length).ok_or_else(|| {
            invalid(format!("Chunk lengths of {} overflow", file.path))
        })?;
    }

    if offset != file.size {
        return Err(invalid(format!(
            "Chunks of {} cover {} bytes but the file size is {}",
            file.path, offset, file.size
        )));
    }

    Ok(FileEntry {
        path: file.path.clone(),
        size: file.size,
        chunks,
    })
}
