// Byte-addressed read access to a raw device or image file.
//
// Every read the decoder performs goes through BlockSource: production code
// uses positioned reads on a File, tests substitute an in-memory image.

use std::fs::File;
use std::io;
use std::path::Path;

use log::info;

use crate::error::InospectError;

/// Read-only, byte-addressed access to an ext2 device or image.
///
/// A short read is an error: the decoder always knows exactly how many bytes
/// a record occupies, so anything less means the device lied about its size.
pub trait BlockSource {
    /// Fill `buf` from the absolute byte `offset`.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), InospectError>;
}

/// Open a block device or image file for reading.
pub fn open_device(path: &Path) -> Result<File, InospectError> {
    info!("Opening device for reading: {}", path.display());
    let file = File::open(path)?;
    Ok(file)
}

impl BlockSource for File {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), InospectError> {
        positioned_read(self, offset, buf)
            .map_err(|source| InospectError::DeviceRead { offset, source })
    }
}

#[cfg(unix)]
fn positioned_read(file: &File, offset: u64, buf: &mut [u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    FileExt::read_exact_at(file, buf, offset)
}

#[cfg(windows)]
fn positioned_read(file: &File, offset: u64, mut buf: &mut [u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    let mut pos = offset;
    while !buf.is_empty() {
        match file.seek_read(buf, pos)? {
            0 => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "short read from device",
                ))
            }
            n => {
                buf = &mut buf[n..];
                pos += n as u64;
            }
        }
    }
    Ok(())
}

impl BlockSource for Vec<u8> {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), InospectError> {
        self.as_slice().read_exact_at(offset, buf)
    }
}

impl BlockSource for &[u8] {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), InospectError> {
        let start = usize::try_from(offset).map_err(|_| InospectError::DeviceRead {
            offset,
            source: io::Error::new(io::ErrorKind::UnexpectedEof, "offset beyond end of image"),
        })?;
        let end = start.checked_add(buf.len()).filter(|&end| end <= self.len());
        match end {
            Some(end) => {
                buf.copy_from_slice(&self[start..end]);
                Ok(())
            }
            None => Err(InospectError::DeviceRead {
                offset,
                source: io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of image"),
            }),
        }
    }
}
