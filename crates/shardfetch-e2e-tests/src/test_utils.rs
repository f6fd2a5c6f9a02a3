use eyre::Result;
use opendal::Operator;
use opendal::services::Memory;
use sha2::{Digest, Sha256};
use shardfetch_lib::config::{ChunkDef, Config, FileDef, HostDef};
use shardfetch_lib::contracts::NetAddress;
use shardfetch_lib::fetch::{FetchEngine, FetchOptions};
use std::collections::HashMap;
use tempfile::TempDir;

pub const HOST1: &str = "host1.example.com:9982";
pub const HOST2: &str = "host2.example.com:9982";
pub const HOST3: &str = "host3.example.com:9982";

/// Deterministic content for a catalog path.
pub fn test_content(path: &str, size: usize) -> Vec<u8> {
    let seed = path.bytes().fold(0u8, |acc, b| acc.wrapping_add(b));
    (0..size)
        .map(|i| seed.wrapping_add((i % 251) as u8))
        .collect()
}

fn chunk(path: &str, index: usize, length: u64, hosts: &[&str], content: &[u8]) -> ChunkDef {
    ChunkDef {
        object: format!("{path}/{index}"),
        length,
        hosts: hosts.iter().map(|host| NetAddress::from(*host)).collect(),
        sha256: Some(hex::encode(Sha256::digest(content))),
    }
}

/// Three hosts; the first two hold contracts. `docs.txt` is split 600/400 over hosts 1
/// and 2, `notes.md` lives only on the uncontracted host 3.
pub fn create_test_config() -> Config {
    let docs = test_content("docs.txt", 1000);
    let notes = test_content("notes.md", 300);

    Config {
        hosts: vec![
            HostDef {
                address: HOST1.into(),
                endpoint: "http://host1.example.com/objects/".to_string(),
                contract_id: Some("01".repeat(32)),
            },
            HostDef {
                address: HOST2.into(),
                endpoint: "http://host2.example.com/objects/".to_string(),
                contract_id: Some("02".repeat(32)),
            },
            HostDef {
                address: HOST3.into(),
                endpoint: "http://host3.example.com/objects/".to_string(),
                contract_id: None,
            },
        ],
        files: vec![
            FileDef {
                path: "docs.txt".to_string(),
                size: 1000,
                chunks: vec![
                    chunk("docs.txt", 0, 600, &[HOST3, HOST1], &docs[..600]),
                    chunk("docs.txt", 1, 400, &[HOST2], &docs[600..]),
                ],
            },
            FileDef {
                path: "notes.md".to_string(),
                size: 300,
                chunks: vec![chunk("notes.md", 0, 300, &[HOST3], &notes)],
            },
        ],
        engine: FetchOptions::default(),
    }
}

/// Fetch engine whose hosts are in-memory operators preloaded with every chunk the
/// config assigns to them.
pub async fn create_memory_engine(config: &Config) -> Result<FetchEngine> {
    let mut hosts = HashMap::new();
    for host in &config.hosts {
        hosts.insert(
            host.address.clone(),
            Operator::new(Memory::default())?.finish(),
        );
    }

    for file in &config.files {
        let content = test_content(&file.path, file.size as usize);
        let mut offset = 0usize;
        for chunk in &file.chunks {
            let end = offset + chunk.length as usize;
            for address in &chunk.hosts {
                if let Some(op) = hosts.get(address) {
                    op.write(&chunk.object, content[offset..end].to_vec()).await?;
                }
            }
            offset = end;
        }
    }

    Ok(FetchEngine::new(hosts, config.engine))
}

pub fn setup_test_environment() -> Result<TempDir> {
    let temp_dir = tempfile::tempdir()?;

    let config = create_test_config();
    let config_path = temp_dir.path().join("config.json");
    std::fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;

    Ok(temp_dir)
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("shardfetch_lib=debug,shardfetch_e2e_tests=debug")
        .with_test_writer()
        .try_init()
        .ok();
}
