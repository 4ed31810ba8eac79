// Ext2 volume handle: the device source plus the parsed superblock and the
// constants derived from it. Every other component reads through this.

use log::{debug, info};

use inospect_core::{BlockSource, InospectError};

use super::blocks::BlockWalk;
use super::constants::*;
use super::structures::{Ext2GroupDesc, Ext2Inode, Ext2Superblock};

pub struct Ext2Volume<S> {
    source: S,
    superblock: Ext2Superblock,
}

impl<S: BlockSource> Ext2Volume<S> {
    /// Read and validate the superblock, then hand back the volume handle.
    /// The superblock is read exactly once for the life of the volume.
    pub fn open(source: S) -> Result<Self, InospectError> {
        let mut buf = vec![0u8; std::mem::size_of::<Ext2Superblock>()];
        source.read_exact_at(EXT2_SUPERBLOCK_OFFSET, &mut buf)?;
        let superblock = Ext2Superblock::from_bytes(&buf);
        superblock.validate()?;

        info!(
            "ext2 volume: block size {}, {} inodes ({} per group), inode record size {}",
            superblock.block_size(),
            superblock.s_inodes_count,
            superblock.s_inodes_per_group,
            superblock.inode_size()
        );

        Ok(Ext2Volume { source, superblock })
    }

    pub fn superblock(&self) -> &Ext2Superblock {
        &self.superblock
    }

    pub fn block_size(&self) -> u32 {
        self.superblock.block_size()
    }

    /// Read `len` bytes at an absolute byte offset.
    pub fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>, InospectError> {
        let mut buf = vec![0u8; len];
        self.source.read_exact_at(offset, &mut buf)?;
        Ok(buf)
    }

    /// Read one whole block by block address.
    pub fn read_block(&self, addr: u64) -> Result<Vec<u8>, InospectError> {
        self.read_at(addr * self.block_size() as u64, self.block_size() as usize)
    }

    /// Byte offset of the group descriptor table: it starts in the block
    /// immediately following the block that holds the superblock (block 2
    /// when blocks are 1 KiB, block 1 otherwise).
    fn descriptor_table_offset(&self) -> u64 {
        let block_size = self.block_size() as u64;
        if block_size == EXT2_MIN_BLOCK_SIZE as u64 {
            2 * block_size
        } else {
            block_size
        }
    }

    /// Fetch the descriptor for one block group. Looked up on demand and
    /// never cached; each call is a single fresh read.
    pub fn group_descriptor(&self, group_index: u32) -> Result<Ext2GroupDesc, InospectError> {
        let desc_size = self.superblock.descriptor_size();
        let offset =
            self.descriptor_table_offset() + group_index as u64 * desc_size as u64;
        debug!("reading descriptor for group {} at offset {:#x}", group_index, offset);
        let buf = self.read_at(offset, desc_size as usize)?;
        Ok(Ext2GroupDesc::from_bytes(&buf))
    }

    /// Materialize the on-disk inode record for a 1-based inode number.
    ///
    /// Numbers below the root inode (2) are reserved and never valid lookup
    /// targets for this decoder; numbers past the volume's inode count do
    /// not exist.
    pub fn inode_record(&self, ino: u32) -> Result<Ext2Inode, InospectError> {
        if ino < EXT2_ROOT_INO || ino > self.superblock.s_inodes_count {
            return Err(InospectError::InvalidInode(ino));
        }

        let inodes_per_group = self.superblock.s_inodes_per_group;
        let group = (ino - 1) / inodes_per_group;
        let index = (ino - 1) % inodes_per_group;

        let desc = self.group_descriptor(group)?;
        let table_offset = desc.bg_inode_table as u64 * self.block_size() as u64;
        let offset = table_offset + index as u64 * self.superblock.inode_size() as u64;

        debug!("inode {}: group {}, index {}, offset {:#x}", ino, group, index, offset);
        let buf = self.read_at(offset, std::mem::size_of::<Ext2Inode>())?;
        Ok(Ext2Inode::from_bytes(&buf))
    }

    /// Lazy walk over every data block the inode addresses, in logical order.
    pub fn walk_blocks<'v>(&'v self, inode: &Ext2Inode) -> BlockWalk<'v, S> {
        BlockWalk::new(self, inode)
    }

    /// Filesystem-wide summary for presentation.
    pub fn info(&self) -> VolumeInfo {
        let sb = &self.superblock;
        VolumeInfo {
            label: sb.volume_label(),
            uuid: sb.uuid_string(),
            block_size: sb.block_size(),
            block_count: sb.s_blocks_count,
            free_blocks: sb.s_free_blocks_count,
            reserved_blocks: sb.s_r_blocks_count,
            total_inodes: sb.s_inodes_count,
            free_inodes: sb.s_free_inodes_count,
            inodes_per_group: sb.s_inodes_per_group,
            revision: sb.s_rev_level,
        }
    }
}

/// Summary of an ext2 volume's superblock-level facts.
#[derive(Debug)]
pub struct VolumeInfo {
    pub label: Option<String>,
    pub uuid: Option<String>,
    pub block_size: u32,
    pub block_count: u32,
    pub free_blocks: u32,
    pub reserved_blocks: u32,
    pub total_inodes: u32,
    pub free_inodes: u32,
    pub inodes_per_group: u32,
    pub revision: u32,
}
