pub mod logger;

pub use logger::{ScreenLog, ScreenLogCallback};
