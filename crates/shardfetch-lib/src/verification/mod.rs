pub mod chunk_digest;
