// Content projection for a resolved inode: a byte stream for regular files,
// a directory-entry stream for directories. Both drive the block walk and
// stay lazy; nothing buffers more than one block.

use log::debug;

use inospect_core::{BlockSource, InospectError};

use super::blocks::BlockWalk;
use super::directory::{DirBlockScanner, DirEntryRecord};
use super::structures::Ext2Inode;
use super::volume::Ext2Volume;

/// The two node kinds this decoder projects data for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    RegularFile,
    Directory,
}

/// Classify an inode for data projection. Anything that is neither a
/// regular file nor a directory is unsupported.
pub fn classify(ino: u32, inode: &Ext2Inode) -> Result<NodeKind, InospectError> {
    if inode.is_regular_file() {
        Ok(NodeKind::RegularFile)
    } else if inode.is_dir() {
        Ok(NodeKind::Directory)
    } else {
        Err(InospectError::UnsupportedFileType {
            ino,
            mode: inode.i_mode,
        })
    }
}

/// Stream of a regular file's data blocks, each yielded in full, in order.
pub struct FileBlocks<'v, S> {
    volume: &'v Ext2Volume<S>,
    walk: BlockWalk<'v, S>,
}

impl<S: BlockSource> Iterator for FileBlocks<'_, S> {
    type Item = Result<Vec<u8>, InospectError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.walk.next()? {
            Ok(addr) => Some(self.volume.read_block(addr)),
            Err(e) => Some(Err(e)),
        }
    }
}

/// Dump a regular file block by block: whole blocks, block order.
pub fn file_blocks<'v, S: BlockSource>(
    volume: &'v Ext2Volume<S>,
    inode: &Ext2Inode,
) -> FileBlocks<'v, S> {
    FileBlocks {
        volume,
        walk: volume.walk_blocks(inode),
    }
}

/// Stream of a directory's live entries across all of its data blocks.
pub struct DirEntries<'v, S> {
    volume: &'v Ext2Volume<S>,
    walk: BlockWalk<'v, S>,
    current: Option<DirBlockScanner>,
}

impl<S: BlockSource> Iterator for DirEntries<'_, S> {
    type Item = Result<DirEntryRecord, InospectError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(scanner) = self.current.as_mut() {
                match scanner.next() {
                    Some(item) => return Some(item),
                    None => self.current = None,
                }
            }
            match self.walk.next()? {
                Ok(addr) => match DirBlockScanner::new(self.volume, addr) {
                    Ok(scanner) => self.current = Some(scanner),
                    Err(e) => return Some(Err(e)),
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Enumerate a directory's entries in block order.
pub fn dir_entries<'v, S: BlockSource>(
    volume: &'v Ext2Volume<S>,
    inode: &Ext2Inode,
) -> DirEntries<'v, S> {
    DirEntries {
        volume,
        walk: volume.walk_blocks(inode),
        current: None,
    }
}

/// Read a regular file's exact contents: blocks concatenated in order and
/// truncated to the size recorded in the inode.
pub fn read_file_contents<S: BlockSource>(
    volume: &Ext2Volume<S>,
    inode: &Ext2Inode,
) -> Result<Vec<u8>, InospectError> {
    let size = inode.size() as usize;
    let mut data = Vec::with_capacity(size.min(1 << 20));
    for block in file_blocks(volume, inode) {
        let block = block?;
        if data.len() + block.len() >= size {
            let keep = size - data.len();
            data.extend_from_slice(&block[..keep]);
            break;
        }
        data.extend_from_slice(&block);
    }
    debug!("read {} of {} recorded bytes", data.len(), size);
    Ok(data)
}
