// Classic (non-extent) ext2 read path: superblock, group descriptors,
// inode table, indirect block walking, directory scanning, path lookup.

pub mod blocks;
pub mod constants;
pub mod content;
pub mod directory;
pub mod metadata;
pub mod path;
pub mod structures;
pub mod volume;

pub use blocks::{pointer_slots, BlockWalk, PointerSlot, SlotKind};
pub use content::{classify, dir_entries, file_blocks, read_file_contents, NodeKind};
pub use directory::{DirBlockScanner, DirEntryRecord, DirFileType};
pub use metadata::{inode_view, InodeView};
pub use path::resolve_path;
pub use structures::{Ext2GroupDesc, Ext2Inode, Ext2Superblock};
pub use volume::{Ext2Volume, VolumeInfo};
