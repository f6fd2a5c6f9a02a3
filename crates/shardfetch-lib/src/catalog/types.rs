use crate::contracts::NetAddress;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub size: u64,
    /// Chunks ordered by offset, covering `0..size` without gaps.
    pub chunks: Vec<ChunkLayout>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkLayout {
    /// Position of the chunk's first byte within the file.
    pub offset: u64,
    pub length: u64,
    /// Object key under which every listed host stores the chunk.
    pub object: String,
    pub hosts: Vec<NetAddress>,
    /// Expected SHA-256 of the whole chunk, as raw bytes.
    pub sha256: Option<Vec<u8>>,
}

impl ChunkLayout {
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}
