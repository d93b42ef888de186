//! Teamdb Remote - remote index store client with retry and blob codec

pub mod codec;
pub mod http;
pub mod retry;
pub mod store;

pub use http::{HttpRemoteStore, Timeouts};
pub use retry::RetryPolicy;
pub use store::{RemoteError, RemoteResult, RemoteStore, ResultUpload};
