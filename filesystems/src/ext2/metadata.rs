// Inode metadata view: the decoded record plus the classified list of its
// occupied pointer slots, ready for presentation.

use inospect_core::{BlockSource, InospectError};

use super::blocks::{pointer_slots, PointerSlot};
use super::structures::Ext2Inode;
use super::volume::Ext2Volume;

/// Everything the inode request surfaces about one inode.
#[derive(Debug)]
pub struct InodeView {
    pub ino: u32,
    pub file_type_bits: u16,
    pub permissions: u16,
    pub flags: u32,
    pub generation: u32,
    pub uid: u16,
    pub gid: u16,
    pub size: u64,
    pub file_acl: u32,
    pub links_count: u16,
    pub sector_count: u32,
    pub ctime: u32,
    pub atime: u32,
    pub mtime: u32,
    pub slots: Vec<PointerSlot>,
}

/// Materialize the metadata view for an inode number.
pub fn inode_view<S: BlockSource>(
    volume: &Ext2Volume<S>,
    ino: u32,
) -> Result<InodeView, InospectError> {
    let inode = volume.inode_record(ino)?;
    Ok(InodeView::from_record(ino, &inode))
}

impl InodeView {
    pub fn from_record(ino: u32, inode: &Ext2Inode) -> Self {
        InodeView {
            ino,
            file_type_bits: inode.file_type_bits(),
            permissions: inode.permissions(),
            flags: inode.i_flags,
            generation: inode.i_generation,
            uid: inode.i_uid,
            gid: inode.i_gid,
            size: inode.size(),
            file_acl: inode.i_file_acl,
            links_count: inode.i_links_count,
            sector_count: inode.i_blocks,
            ctime: inode.i_ctime,
            atime: inode.i_atime,
            mtime: inode.i_mtime,
            slots: pointer_slots(inode),
        }
    }
}
