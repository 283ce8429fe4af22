//! The delivery daemon core: session pool, source fan-in, per-message
//! delivery workers, and the orchestrator that ties them together.

pub mod daemon;
pub mod error;
pub mod fanin;
pub mod pool;
mod worker;

pub use daemon::Daemon;
pub use error::PoolError;
pub use fanin::{MessageSource, fan_in};
pub use pool::SessionPool;
