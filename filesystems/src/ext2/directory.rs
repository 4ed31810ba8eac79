// Directory data block scanning: the variable-length entry records packed
// inside one block, walked by declared record length.

use byteorder::{ByteOrder, LittleEndian};

use inospect_core::{BlockSource, InospectError};

use super::constants::*;
use super::volume::Ext2Volume;

/// File type tag carried by a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirFileType {
    Unknown = 0,
    Regular = 1,
    Directory = 2,
    CharDevice = 3,
    BlockDevice = 4,
    Fifo = 5,
    Socket = 6,
    Symlink = 7,
}

impl From<u8> for DirFileType {
    fn from(val: u8) -> Self {
        match val {
            EXT2_FT_REG_FILE => DirFileType::Regular,
            EXT2_FT_DIR => DirFileType::Directory,
            EXT2_FT_CHRDEV => DirFileType::CharDevice,
            EXT2_FT_BLKDEV => DirFileType::BlockDevice,
            EXT2_FT_FIFO => DirFileType::Fifo,
            EXT2_FT_SOCK => DirFileType::Socket,
            EXT2_FT_SYMLINK => DirFileType::Symlink,
            _ => DirFileType::Unknown,
        }
    }
}

impl DirFileType {
    /// Display label for directory listings.
    pub fn label(&self) -> &'static str {
        match self {
            DirFileType::Unknown => "Unknown",
            DirFileType::Regular => "Regular",
            DirFileType::Directory => "Directory",
            DirFileType::CharDevice => "Character",
            DirFileType::BlockDevice => "Block",
            DirFileType::Fifo => "Fifo",
            DirFileType::Socket => "Socket",
            DirFileType::Symlink => "Softlink",
        }
    }
}

/// One live directory entry. Names are length-delimited byte strings, not
/// null-terminated and not guaranteed to be UTF-8.
#[derive(Debug, Clone)]
pub struct DirEntryRecord {
    pub inode: u32,
    pub rec_len: u16,
    pub file_type: DirFileType,
    pub name: Vec<u8>,
}

impl DirEntryRecord {
    /// Lossy name for display.
    pub fn name_string(&self) -> String {
        String::from_utf8_lossy(&self.name).to_string()
    }
}

/// Iterator over the live entries of one directory data block.
///
/// The block is read once up front; scanning then advances by each entry's
/// declared record length and stops exactly at the block boundary. Entries
/// with inode 0 are unused slots: skipped, but the cursor still advances by
/// their record length. A record length that would walk past the block
/// boundary is reported as corruption rather than read.
pub struct DirBlockScanner {
    block_addr: u64,
    data: Vec<u8>,
    offset: usize,
}

impl DirBlockScanner {
    pub fn new<S: BlockSource>(
        volume: &Ext2Volume<S>,
        block_addr: u64,
    ) -> Result<Self, InospectError> {
        let data = volume.read_block(block_addr)?;
        Ok(DirBlockScanner {
            block_addr,
            data,
            offset: 0,
        })
    }

    fn corrupt(&mut self, at: usize) -> InospectError {
        // Poison the cursor so the iterator fuses after an error.
        self.offset = self.data.len();
        InospectError::CorruptDirectoryEntry {
            block: self.block_addr,
            offset: at as u32,
        }
    }
}

impl Iterator for DirBlockScanner {
    type Item = Result<DirEntryRecord, InospectError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.offset >= self.data.len() {
                return None;
            }
            let at = self.offset;
            if at + EXT2_DIR_ENTRY_HEADER_SIZE > self.data.len() {
                return Some(Err(self.corrupt(at)));
            }

            let inode = LittleEndian::read_u32(&self.data[at..at + 4]);
            let rec_len = LittleEndian::read_u16(&self.data[at + 4..at + 6]);
            let name_len = self.data[at + 6] as usize;
            let file_type = DirFileType::from(self.data[at + 7]);

            if (rec_len as usize) < EXT2_DIR_ENTRY_HEADER_SIZE
                || at + rec_len as usize > self.data.len()
                || EXT2_DIR_ENTRY_HEADER_SIZE + name_len > rec_len as usize
            {
                return Some(Err(self.corrupt(at)));
            }

            self.offset = at + rec_len as usize;

            if inode == 0 {
                // Unused or deleted slot; keep scanning.
                continue;
            }

            let name_start = at + EXT2_DIR_ENTRY_HEADER_SIZE;
            return Some(Ok(DirEntryRecord {
                inode,
                rec_len,
                file_type,
                name: self.data[name_start..name_start + name_len].to_vec(),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ImageBuilder, RawDirEntry};

    fn scan(img: ImageBuilder, block: u64) -> Vec<Result<DirEntryRecord, InospectError>> {
        let volume = Ext2Volume::open(img.build()).unwrap();
        DirBlockScanner::new(&volume, block).unwrap().collect()
    }

    #[test]
    fn dense_block_yields_one_entry_per_record() {
        let mut img = ImageBuilder::new(64);
        let block = img.alloc_block();
        img.write_dir_block(
            block,
            &[
                RawDirEntry::new(2, EXT2_FT_DIR, b"."),
                RawDirEntry::new(2, EXT2_FT_DIR, b".."),
                RawDirEntry::new(12, EXT2_FT_REG_FILE, b"foo"),
                RawDirEntry::new(13, EXT2_FT_DIR, b"subdir"),
            ],
        );

        let entries: Vec<_> = scan(img, block as u64)
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].name, b".");
        assert_eq!(entries[2].name, b"foo");
        assert_eq!(entries[2].inode, 12);
        assert_eq!(entries[2].file_type, DirFileType::Regular);
        assert_eq!(entries[3].name, b"subdir");
        assert_eq!(entries[3].file_type, DirFileType::Directory);
    }

    #[test]
    fn record_lengths_cover_block_exactly() {
        let mut img = ImageBuilder::new(64);
        let block = img.alloc_block();
        img.write_dir_block(
            block,
            &[
                RawDirEntry::new(2, EXT2_FT_DIR, b"."),
                RawDirEntry::new(14, EXT2_FT_REG_FILE, b"trailing"),
            ],
        );

        let entries: Vec<_> = scan(img, block as u64)
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        let total: usize = entries.iter().map(|e| e.rec_len as usize).sum();
        assert_eq!(total, 1024);
    }

    #[test]
    fn unused_slots_are_skipped_but_scanning_continues() {
        let mut img = ImageBuilder::new(64);
        let block = img.alloc_block();
        img.write_dir_block(
            block,
            &[
                RawDirEntry::new(2, EXT2_FT_DIR, b"."),
                RawDirEntry::new(0, EXT2_FT_UNKNOWN, b"gone"),
                RawDirEntry::new(15, EXT2_FT_REG_FILE, b"kept"),
            ],
        );

        let entries: Vec<_> = scan(img, block as u64)
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].name, b"kept");
    }

    #[test]
    fn record_length_past_block_boundary_is_corruption() {
        let mut img = ImageBuilder::new(64);
        let block = img.alloc_block();
        let mut raw = vec![0u8; 1024];
        // inode 12, rec_len far beyond the block, name "x"
        raw[0..4].copy_from_slice(&12u32.to_le_bytes());
        raw[4..6].copy_from_slice(&2000u16.to_le_bytes());
        raw[6] = 1;
        raw[7] = EXT2_FT_REG_FILE;
        raw[8] = b'x';
        img.write_block(block, &raw);

        let results = scan(img, block as u64);
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(InospectError::CorruptDirectoryEntry { offset: 0, .. })
        ));
    }

    #[test]
    fn undersized_record_length_is_corruption_not_a_spin() {
        let mut img = ImageBuilder::new(64);
        let block = img.alloc_block();
        let mut raw = vec![0u8; 1024];
        raw[0..4].copy_from_slice(&12u32.to_le_bytes());
        raw[4..6].copy_from_slice(&4u16.to_le_bytes()); // shorter than the header
        img.write_block(block, &raw);

        let results = scan(img, block as u64);
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }
}
