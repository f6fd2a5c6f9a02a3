use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchOptions {
    /// Downloads transferred at the same time.
    pub workers: usize,
    pub max_retries: usize,
    pub max_concurrency_per_host: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            max_retries: 5,
            max_concurrency_per_host: 8,
        }
    }
}
