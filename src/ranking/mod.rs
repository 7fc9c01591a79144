#[cfg(feature = "concurrency")]
pub mod concurrent;
pub mod sequential;
pub mod snapshot;
#[cfg(feature = "concurrency")]
pub mod synchronized;
