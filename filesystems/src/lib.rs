pub mod ext2;
pub mod test_helpers;
