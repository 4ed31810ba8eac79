use thiserror::Error;

#[derive(Debug, Error)]
pub enum InospectError {
    #[error("device read failed at byte offset {offset}: {source}")]
    DeviceRead {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt superblock: {0}")]
    CorruptSuperblock(String),

    #[error("corrupt directory entry in block {block} at offset {offset}")]
    CorruptDirectoryEntry { block: u64, offset: u32 },

    #[error("path component not found: {0}")]
    PathComponentNotFound(String),

    #[error("not a directory while resolving component '{0}'")]
    NotADirectory(String),

    #[error("unsupported file type for inode {ino} (mode {mode:#06x})")]
    UnsupportedFileType { ino: u32, mode: u16 },

    #[error("invalid inode number: {0}")]
    InvalidInode(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
