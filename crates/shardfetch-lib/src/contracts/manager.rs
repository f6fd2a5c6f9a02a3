use super::{Contract, ContractManager, NetAddress};
use tokio::sync::RwLock;

/// Contract list held in memory and edited explicitly.
///
/// Reads clone the list under the same lock that guards updates, so a snapshot never
/// sees a half-applied change.
#[derive(Debug, Default)]
pub struct StaticContractManager {
    contracts: RwLock<Vec<Contract>>,
}

impl StaticContractManager {
    pub fn new(contracts: Vec<Contract>) -> Self {
        Self {
            contracts: RwLock::new(contracts),
        }
    }

    /// Adds a contract, replacing any existing contract with the same host.
    pub async fn upsert(&self, contract: Contract) {
        let mut contracts = self.contracts.write().await;
        contracts.retain(|existing| existing.net_address != contract.net_address);
        tracing::debug!(host = %contract.net_address, id = %contract.id, "Contract added");
        contracts.push(contract);
    }

    pub async fn remove(&self, address: &NetAddress) -> Option<Contract> {
        let mut contracts = self.contracts.write().await;
        let index = contracts
            .iter()
            .position(|contract| &contract.net_address == address)?;
        tracing::debug!(host = %address, "Contract removed");
        Some(contracts.remove(index))
    }
}

impl ContractManager for StaticContractManager {
    async fn current_contracts(&self) -> Vec<Contract> {
        self.contracts.read().await.clone()
    }
}
