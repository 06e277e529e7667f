pub mod compress;
pub mod init;

pub use compress::{compress, CompressArgs};
pub use init::{init, InitArgs};
