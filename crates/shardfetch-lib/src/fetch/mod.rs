mod engine;
mod types;

pub use engine::{FetchEngine, build_http_operator};
pub use types::FetchOptions;
