// Path resolution: walk an absolute path component by component from the
// root inode, searching each directory's data blocks for the next name.

use log::{debug, trace};

use inospect_core::{BlockSource, InospectError};

use super::constants::EXT2_ROOT_INO;
use super::directory::DirBlockScanner;
use super::volume::Ext2Volume;

/// Resolve an absolute path to an inode number.
///
/// The path is split on '/'; empty components from leading, duplicate, or
/// trailing separators are skipped, so "/a//b/" resolves like "a/b". A path
/// with no components resolves to the root inode.
pub fn resolve_path<S: BlockSource>(
    volume: &Ext2Volume<S>,
    path: &str,
) -> Result<u32, InospectError> {
    debug!("resolving path: {}", path);

    let mut ino = EXT2_ROOT_INO;
    for component in path.split('/').filter(|s| !s.is_empty()) {
        ino = lookup_child(volume, ino, component)?;
    }
    Ok(ino)
}

/// Find `name` among the entries of the directory with inode `dir_ino`.
///
/// The directory's data blocks are visited in logical order and each is
/// scanned front to back; the first byte-exact name match wins. Names are
/// unique within a directory, so there is nothing to tie-break.
fn lookup_child<S: BlockSource>(
    volume: &Ext2Volume<S>,
    dir_ino: u32,
    name: &str,
) -> Result<u32, InospectError> {
    let inode = volume.inode_record(dir_ino)?;
    if !inode.is_dir() {
        return Err(InospectError::NotADirectory(name.to_string()));
    }

    trace!("searching directory inode {} for '{}'", dir_ino, name);
    for block in volume.walk_blocks(&inode) {
        for entry in DirBlockScanner::new(volume, block?)? {
            let entry = entry?;
            if entry.name == name.as_bytes() {
                trace!("'{}' -> inode {}", name, entry.inode);
                return Ok(entry.inode);
            }
        }
    }

    Err(InospectError::PathComponentNotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ext2::constants::{EXT2_FT_DIR, EXT2_FT_REG_FILE};
    use crate::test_helpers::{ImageBuilder, RawDirEntry};

    /// Root directory with one file and one subdirectory holding a file.
    fn sample_tree() -> ImageBuilder {
        let mut img = ImageBuilder::new(128);

        let root_block = img.alloc_block();
        img.write_dir_block(
            root_block,
            &[
                RawDirEntry::new(2, EXT2_FT_DIR, b"."),
                RawDirEntry::new(2, EXT2_FT_DIR, b".."),
                RawDirEntry::new(12, EXT2_FT_REG_FILE, b"foo"),
                RawDirEntry::new(13, EXT2_FT_DIR, b"subdir"),
            ],
        );
        img.set_dir_inode(2, &[root_block]);

        img.set_inode(12, 0o100644, 3, &[0; 15]);

        let sub_block = img.alloc_block();
        img.write_dir_block(
            sub_block,
            &[
                RawDirEntry::new(13, EXT2_FT_DIR, b"."),
                RawDirEntry::new(2, EXT2_FT_DIR, b".."),
                RawDirEntry::new(14, EXT2_FT_REG_FILE, b"inner.txt"),
            ],
        );
        img.set_dir_inode(13, &[sub_block]);
        img.set_inode(14, 0o100644, 5, &[0; 15]);

        img
    }

    #[test]
    fn zero_component_paths_resolve_to_root() {
        let volume = Ext2Volume::open(sample_tree().build()).unwrap();
        assert_eq!(resolve_path(&volume, "/").unwrap(), EXT2_ROOT_INO);
        assert_eq!(resolve_path(&volume, "").unwrap(), EXT2_ROOT_INO);
        assert_eq!(resolve_path(&volume, "///").unwrap(), EXT2_ROOT_INO);
    }

    #[test]
    fn single_component_lookup() {
        let volume = Ext2Volume::open(sample_tree().build()).unwrap();
        assert_eq!(resolve_path(&volume, "/foo").unwrap(), 12);
    }

    #[test]
    fn absent_component_is_not_found() {
        let volume = Ext2Volume::open(sample_tree().build()).unwrap();
        assert!(matches!(
            resolve_path(&volume, "/bar"),
            Err(InospectError::PathComponentNotFound(name)) if name == "bar"
        ));
    }

    #[test]
    fn nested_lookup_descends_directories() {
        let volume = Ext2Volume::open(sample_tree().build()).unwrap();
        assert_eq!(resolve_path(&volume, "/subdir/inner.txt").unwrap(), 14);
    }

    #[test]
    fn empty_components_are_skipped() {
        let volume = Ext2Volume::open(sample_tree().build()).unwrap();
        assert_eq!(resolve_path(&volume, "//subdir///inner.txt/").unwrap(), 14);
    }

    #[test]
    fn file_in_the_middle_of_a_path_fails() {
        let volume = Ext2Volume::open(sample_tree().build()).unwrap();
        assert!(matches!(
            resolve_path(&volume, "/foo/deeper"),
            Err(InospectError::NotADirectory(name)) if name == "deeper"
        ));
    }

    #[test]
    fn final_component_may_be_any_type() {
        // The parent must be a directory; the target itself is not checked.
        let volume = Ext2Volume::open(sample_tree().build()).unwrap();
        assert_eq!(resolve_path(&volume, "/subdir").unwrap(), 13);
        assert_eq!(resolve_path(&volume, "/foo").unwrap(), 12);
    }

    #[test]
    fn dot_and_dotdot_resolve_like_any_entry() {
        let volume = Ext2Volume::open(sample_tree().build()).unwrap();
        assert_eq!(resolve_path(&volume, "/subdir/..").unwrap(), 2);
        assert_eq!(resolve_path(&volume, "/subdir/.").unwrap(), 13);
    }
}
