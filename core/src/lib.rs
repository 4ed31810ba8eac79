pub mod device;
pub mod error;

pub use device::{open_device, BlockSource};
pub use error::InospectError;
