/// Hot reload module - filesystem watching and watch-loop cancellation

pub mod file_watcher;

pub use file_watcher::*;
pub use tokio_util::sync::CancellationToken;
