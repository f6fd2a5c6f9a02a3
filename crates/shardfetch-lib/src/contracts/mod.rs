mod manager;
mod types;

pub use manager::StaticContractManager;
pub use types::{Contract, ContractId, ContractIdParseError, ContractSnapshot, NetAddress};

use std::future::Future;

/// Source of the storage contracts the client currently holds.
pub trait ContractManager: Send + Sync {
    /// Contracts valid right now, in the manager's own order.
    fn current_contracts(&self) -> impl Future<Output = Vec<Contract>> + Send;
}
