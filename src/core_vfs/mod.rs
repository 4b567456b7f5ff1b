pub mod listing;
pub mod path;
pub mod storage;

pub use path::Vfs;
pub use storage::{OpenHandle, OpenMode, Storage};
