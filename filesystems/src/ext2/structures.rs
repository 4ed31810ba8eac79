// Classic ext2 on-disk structures
// These must match the ext2 layout exactly; every field is little-endian.

use static_assertions::assert_eq_size;

use inospect_core::InospectError;

use super::constants::*;

/// ext2 superblock (1024 bytes), located at byte offset 1024 from the
/// beginning of the device.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Ext2Superblock {
    /* 0x000 */ pub s_inodes_count: u32,        // Total inodes count
    /* 0x004 */ pub s_blocks_count: u32,        // Total blocks count
    /* 0x008 */ pub s_r_blocks_count: u32,      // Reserved blocks count
    /* 0x00C */ pub s_free_blocks_count: u32,   // Free blocks count
    /* 0x010 */ pub s_free_inodes_count: u32,   // Free inodes count
    /* 0x014 */ pub s_first_data_block: u32,    // First data block
    /* 0x018 */ pub s_log_block_size: u32,      // Block size = 1024 << s_log_block_size
    /* 0x01C */ pub s_log_frag_size: u32,       // Fragment size
    /* 0x020 */ pub s_blocks_per_group: u32,    // Blocks per group
    /* 0x024 */ pub s_frags_per_group: u32,     // Fragments per group
    /* 0x028 */ pub s_inodes_per_group: u32,    // Inodes per group
    /* 0x02C */ pub s_mtime: u32,               // Mount time
    /* 0x030 */ pub s_wtime: u32,               // Write time
    /* 0x034 */ pub s_mnt_count: u16,           // Mount count
    /* 0x036 */ pub s_max_mnt_count: u16,       // Max mount count
    /* 0x038 */ pub s_magic: u16,               // Magic (0xEF53)
    /* 0x03A */ pub s_state: u16,               // Filesystem state
    /* 0x03C */ pub s_errors: u16,              // Error handling behavior
    /* 0x03E */ pub s_minor_rev_level: u16,     // Minor revision
    /* 0x040 */ pub s_lastcheck: u32,           // Last check time
    /* 0x044 */ pub s_checkinterval: u32,       // Check interval
    /* 0x048 */ pub s_creator_os: u32,          // Creator OS
    /* 0x04C */ pub s_rev_level: u32,           // Revision level
    /* 0x050 */ pub s_def_resuid: u16,          // Default UID for reserved blocks
    /* 0x052 */ pub s_def_resgid: u16,          // Default GID for reserved blocks

    // -- Dynamic revision fields (only valid if s_rev_level > 0) --
    /* 0x054 */ pub s_first_ino: u32,           // First non-reserved inode
    /* 0x058 */ pub s_inode_size: u16,          // Inode record size
    /* 0x05A */ pub s_block_group_nr: u16,      // Group holding this superblock
    /* 0x05C */ pub s_feature_compat: u32,      // Compatible features
    /* 0x060 */ pub s_feature_incompat: u32,    // Incompatible features
    /* 0x064 */ pub s_feature_ro_compat: u32,   // Read-only compatible features
    /* 0x068 */ pub s_uuid: [u8; 16],           // Filesystem UUID
    /* 0x078 */ pub s_volume_name: [u8; 16],    // Volume name
    /* 0x088 */ pub s_last_mounted: [u8; 64],   // Last mount path
    /* 0x0C8 */ pub s_algo_bitmap: u32,         // Compression algorithms used

    // -- Performance hints --
    /* 0x0CC */ pub s_prealloc_blocks: u8,      // Blocks to preallocate
    /* 0x0CD */ pub s_prealloc_dir_blocks: u8,  // Blocks to preallocate for dirs
    /* 0x0CE */ pub s_padding1: u16,            // Alignment padding

    // -- Journaling support (ext3 compatibility; unused by this decoder) --
    /* 0x0D0 */ pub s_journal_uuid: [u8; 16],   // UUID of journal superblock
    /* 0x0E0 */ pub s_journal_inum: u32,        // Inode number of journal file
    /* 0x0E4 */ pub s_journal_dev: u32,         // Device number of journal file
    /* 0x0E8 */ pub s_last_orphan: u32,         // Head of orphan inode list
    /* 0x0EC */ pub s_hash_seed: [u32; 4],      // HTREE hash seed
    /* 0x0FC */ pub s_def_hash_version: u8,     // Default hash version
    /* 0x0FD */ pub s_jnl_backup_type: u8,      // Journal backup type
    /* 0x0FE */ pub s_desc_size: u16,           // Group descriptor size (64-bit volumes)
    /* 0x100 */ pub s_default_mount_opts: u32,  // Default mount options
    /* 0x104 */ pub s_first_meta_bg: u32,       // First metablock block group
    /* 0x108 */ pub s_reserved: [u32; 190],     // Padding to 1024 bytes
}

assert_eq_size!(Ext2Superblock, [u8; 1024]);

impl Ext2Superblock {
    /// Decode a superblock from a raw 1024-byte record.
    pub fn from_bytes(buf: &[u8]) -> Self {
        debug_assert!(buf.len() >= core::mem::size_of::<Self>());
        unsafe { std::ptr::read_unaligned(buf.as_ptr() as *const Self) }
    }

    /// Block size in bytes.
    pub fn block_size(&self) -> u32 {
        EXT2_MIN_BLOCK_SIZE << self.s_log_block_size
    }

    /// Number of 32-bit block addresses that fit in one block.
    pub fn addresses_per_block(&self) -> u32 {
        self.block_size() / EXT2_BLOCK_ADDR_SIZE
    }

    /// On-disk inode record size. Revision 0 volumes always use 128 bytes.
    pub fn inode_size(&self) -> u32 {
        if self.s_rev_level == EXT2_GOOD_OLD_REV {
            EXT2_GOOD_OLD_INODE_SIZE as u32
        } else {
            self.s_inode_size as u32
        }
    }

    /// Group descriptor record size. 32 bytes unless the 64-bit feature
    /// is set, which never happens on a classic ext2 volume.
    pub fn descriptor_size(&self) -> u32 {
        if self.s_feature_incompat & EXT2_FEATURE_INCOMPAT_64BIT != 0
            && self.s_desc_size >= EXT2_MIN_DESC_SIZE
        {
            self.s_desc_size as u32
        } else {
            EXT2_MIN_DESC_SIZE as u32
        }
    }

    /// Structural sanity checks applied once at open.
    pub fn validate(&self) -> Result<(), InospectError> {
        if self.s_magic != EXT2_SUPER_MAGIC {
            return Err(InospectError::CorruptSuperblock(format!(
                "bad magic {:#06x}",
                self.s_magic
            )));
        }
        if self.s_log_block_size > EXT2_MAX_LOG_BLOCK_SIZE {
            return Err(InospectError::CorruptSuperblock(format!(
                "log block size {} out of range",
                self.s_log_block_size
            )));
        }
        if self.s_inodes_count == 0 || self.s_inodes_per_group == 0 {
            return Err(InospectError::CorruptSuperblock(
                "zero inode count or inodes per group".to_string(),
            ));
        }
        let inode_size = self.inode_size();
        if inode_size == 0 || inode_size % 32 != 0 || inode_size > self.block_size() {
            return Err(InospectError::CorruptSuperblock(format!(
                "inode record size {} is not a multiple of 32 fitting in a block",
                inode_size
            )));
        }
        Ok(())
    }

    /// Volume label, if one is set.
    pub fn volume_label(&self) -> Option<String> {
        let label = String::from_utf8_lossy(&self.s_volume_name)
            .trim_end_matches('\0')
            .trim()
            .to_string();
        if label.is_empty() {
            None
        } else {
            Some(label)
        }
    }

    /// Filesystem UUID formatted as the usual hex string.
    pub fn uuid_string(&self) -> Option<String> {
        let uuid = &self.s_uuid;
        if uuid.iter().all(|&b| b == 0) {
            return None;
        }
        Some(format!(
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            uuid[0], uuid[1], uuid[2], uuid[3],
            uuid[4], uuid[5],
            uuid[6], uuid[7],
            uuid[8], uuid[9],
            uuid[10], uuid[11], uuid[12], uuid[13], uuid[14], uuid[15]
        ))
    }
}

/// ext2 group descriptor (32 bytes). One per block group, packed in the
/// descriptor table that starts in the block after the superblock's block.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Ext2GroupDesc {
    /* 0x00 */ pub bg_block_bitmap: u32,      // Block bitmap block address
    /* 0x04 */ pub bg_inode_bitmap: u32,      // Inode bitmap block address
    /* 0x08 */ pub bg_inode_table: u32,       // Inode table first block address
    /* 0x0C */ pub bg_free_blocks_count: u16, // Free blocks in group
    /* 0x0E */ pub bg_free_inodes_count: u16, // Free inodes in group
    /* 0x10 */ pub bg_used_dirs_count: u16,   // Directories in group
    /* 0x12 */ pub bg_pad: u16,               // Padding
    /* 0x14 */ pub bg_reserved: [u8; 12],     // Reserved
}

assert_eq_size!(Ext2GroupDesc, [u8; 32]);

impl Ext2GroupDesc {
    pub fn from_bytes(buf: &[u8]) -> Self {
        debug_assert!(buf.len() >= core::mem::size_of::<Self>());
        unsafe { std::ptr::read_unaligned(buf.as_ptr() as *const Self) }
    }
}

/// ext2 inode record (classic 128-byte layout). Larger on-disk records on
/// dynamic-revision volumes only append extra fields after this prefix.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Ext2Inode {
    /* 0x00 */ pub i_mode: u16,        // File type and permission bits
    /* 0x02 */ pub i_uid: u16,         // Owner UID
    /* 0x04 */ pub i_size: u32,        // Size in bytes
    /* 0x08 */ pub i_atime: u32,       // Access time
    /* 0x0C */ pub i_ctime: u32,       // Change time
    /* 0x10 */ pub i_mtime: u32,       // Modification time
    /* 0x14 */ pub i_dtime: u32,       // Deletion time
    /* 0x18 */ pub i_gid: u16,         // Group ID
    /* 0x1A */ pub i_links_count: u16, // Hard link count
    /* 0x1C */ pub i_blocks: u32,      // 512-byte sectors allocated
    /* 0x20 */ pub i_flags: u32,       // File flags
    /* 0x24 */ pub i_osd1: u32,        // OS dependent
    /* 0x28 */ pub i_block: [u32; EXT2_N_BLOCKS], // 12 direct + single/double/triple indirect
    /* 0x64 */ pub i_generation: u32,  // File version (NFS)
    /* 0x68 */ pub i_file_acl: u32,    // Extended attribute block
    /* 0x6C */ pub i_dir_acl: u32,     // High 32 size bits for regular files
    /* 0x70 */ pub i_faddr: u32,       // Fragment address
    /* 0x74 */ pub i_osd2: [u8; 12],   // OS dependent
}

assert_eq_size!(Ext2Inode, [u8; 128]);

impl Ext2Inode {
    /// Decode the classic 128-byte prefix of an inode record.
    pub fn from_bytes(buf: &[u8]) -> Self {
        debug_assert!(buf.len() >= core::mem::size_of::<Self>());
        unsafe { std::ptr::read_unaligned(buf.as_ptr() as *const Self) }
    }

    /// Type nibble of the mode field.
    pub fn file_type_bits(&self) -> u16 {
        self.i_mode & S_IFMT
    }

    /// Permission bits of the mode field.
    pub fn permissions(&self) -> u16 {
        self.i_mode & !S_IFMT
    }

    pub fn is_dir(&self) -> bool {
        self.file_type_bits() == S_IFDIR
    }

    pub fn is_regular_file(&self) -> bool {
        self.file_type_bits() == S_IFREG
    }

    /// File size in bytes. Regular files store the high half in i_dir_acl.
    pub fn size(&self) -> u64 {
        if self.is_regular_file() {
            self.i_size as u64 | ((self.i_dir_acl as u64) << 32)
        } else {
            self.i_size as u64
        }
    }
}
