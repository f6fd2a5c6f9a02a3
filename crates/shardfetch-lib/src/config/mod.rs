mod loader;
mod model;
mod resolve;

pub use loader::load_config;
pub use model::{ChunkDef, Config, FileDef, HostDef};
