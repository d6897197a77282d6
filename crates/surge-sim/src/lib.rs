pub mod error;
pub mod process;
pub mod server;

pub use error::{SimError, SimResult};
pub use process::{CompletionCallback, Process};
pub use server::{BucketChangeCallback, Server};

/// Boxed future type used by the callback seams between processes,
/// servers, and their owning controller.
pub type BoxFuture = std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>;
