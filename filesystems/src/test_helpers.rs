// Test helpers: synthetic ext2 images built in memory.
//
// The builder lays out a minimal single-group volume with 1 KiB blocks:
// boot block, superblock at offset 1024, group descriptor table in block 2,
// inode table in blocks 8..16 (64 records of 128 bytes), data blocks
// allocated from block 16 up. Tests that need specific low block addresses
// for pointer blocks can still use blocks 3..8 directly.

use crate::ext2::constants::*;

pub fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

const BLOCK_SIZE: usize = 1024;
const INODE_SIZE: usize = 128;
const INODE_COUNT: u32 = 64;
const INODE_TABLE_BLOCK: u32 = 8;
const FIRST_FREE_BLOCK: u32 = 16;

/// A directory entry to pack into a directory data block.
pub struct RawDirEntry {
    pub inode: u32,
    pub file_type: u8,
    pub name: Vec<u8>,
}

impl RawDirEntry {
    pub fn new(inode: u32, file_type: u8, name: &[u8]) -> Self {
        RawDirEntry {
            inode,
            file_type,
            name: name.to_vec(),
        }
    }
}

pub struct ImageBuilder {
    image: Vec<u8>,
    next_free_block: u32,
}

impl ImageBuilder {
    pub fn new(total_blocks: u32) -> Self {
        let mut image = vec![0u8; total_blocks as usize * BLOCK_SIZE];

        // Superblock at byte offset 1024.
        let sb = &mut image[1024..2048];
        put_u32(sb, 0x000, INODE_COUNT); // s_inodes_count
        put_u32(sb, 0x004, total_blocks); // s_blocks_count
        put_u32(sb, 0x014, 1); // s_first_data_block
        put_u32(sb, 0x018, 0); // s_log_block_size -> 1024
        put_u32(sb, 0x020, total_blocks); // s_blocks_per_group
        put_u32(sb, 0x028, INODE_COUNT); // s_inodes_per_group
        put_u16(sb, 0x038, EXT2_SUPER_MAGIC);
        put_u32(sb, 0x04C, EXT2_DYNAMIC_REV);
        put_u32(sb, 0x054, 11); // s_first_ino
        put_u16(sb, 0x058, INODE_SIZE as u16);

        // Group descriptor table in block 2; one group.
        let gd = &mut image[2 * BLOCK_SIZE..2 * BLOCK_SIZE + 32];
        put_u32(gd, 0x08, INODE_TABLE_BLOCK); // bg_inode_table

        let mut builder = ImageBuilder {
            image,
            next_free_block: FIRST_FREE_BLOCK,
        };

        // Root directory inode exists on every image; tests that need root
        // contents point it at real blocks with set_dir_inode.
        builder.set_inode(EXT2_ROOT_INO, 0o40755, 0, &[0; EXT2_N_BLOCKS]);
        builder
    }

    /// Hand out the next unused data block address.
    pub fn alloc_block(&mut self) -> u32 {
        let addr = self.next_free_block;
        self.next_free_block += 1;
        assert!(
            (addr as usize + 1) * BLOCK_SIZE <= self.image.len(),
            "image too small for allocated block {}",
            addr
        );
        addr
    }

    pub fn write_block(&mut self, addr: u32, bytes: &[u8]) {
        assert!(bytes.len() <= BLOCK_SIZE);
        let start = addr as usize * BLOCK_SIZE;
        self.image[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Write a pointer block: little-endian addresses, zero-filled tail.
    pub fn write_pointer_block(&mut self, addr: u32, addrs: &[u32]) {
        let mut block = vec![0u8; BLOCK_SIZE];
        for (i, &a) in addrs.iter().enumerate() {
            put_u32(&mut block, i * 4, a);
        }
        self.write_block(addr, &block);
    }

    /// Pack directory entries into one block. Record lengths are the
    /// 4-aligned minimum, except the final record, which is stretched so
    /// the lengths sum exactly to the block size.
    pub fn write_dir_block(&mut self, addr: u32, entries: &[RawDirEntry]) {
        assert!(!entries.is_empty());
        let mut block = vec![0u8; BLOCK_SIZE];
        let mut offset = 0usize;
        for (i, entry) in entries.iter().enumerate() {
            let minimal = (EXT2_DIR_ENTRY_HEADER_SIZE + entry.name.len() + 3) & !3;
            let rec_len = if i == entries.len() - 1 {
                BLOCK_SIZE - offset
            } else {
                minimal
            };
            assert!(offset + rec_len <= BLOCK_SIZE, "directory block overflow");

            put_u32(&mut block, offset, entry.inode);
            put_u16(&mut block, offset + 4, rec_len as u16);
            block[offset + 6] = entry.name.len() as u8;
            block[offset + 7] = entry.file_type;
            block[offset + EXT2_DIR_ENTRY_HEADER_SIZE
                ..offset + EXT2_DIR_ENTRY_HEADER_SIZE + entry.name.len()]
                .copy_from_slice(&entry.name);

            offset += rec_len;
        }
        self.write_block(addr, &block);
    }

    /// Write an inode record into the table.
    pub fn set_inode(&mut self, ino: u32, mode: u16, size: u32, slots: &[u32; EXT2_N_BLOCKS]) {
        assert!((1..=INODE_COUNT).contains(&ino), "inode {} outside table", ino);
        let offset =
            INODE_TABLE_BLOCK as usize * BLOCK_SIZE + (ino as usize - 1) * INODE_SIZE;
        let record = &mut self.image[offset..offset + INODE_SIZE];
        record.fill(0);
        put_u16(record, 0x00, mode);
        put_u32(record, 0x04, size);
        put_u16(record, 0x1A, 1); // i_links_count
        for (i, &slot) in slots.iter().enumerate() {
            put_u32(record, 0x28 + i * 4, slot);
        }
    }

    /// Write a directory inode whose data sits in the given blocks.
    pub fn set_dir_inode(&mut self, ino: u32, blocks: &[u32]) {
        assert!(blocks.len() <= EXT2_NDIR_BLOCKS);
        let mut slots = [0u32; EXT2_N_BLOCKS];
        slots[..blocks.len()].copy_from_slice(blocks);
        self.set_inode(ino, 0o40755, (blocks.len() * BLOCK_SIZE) as u32, &slots);
    }

    pub fn build(self) -> Vec<u8> {
        self.image
    }
}
