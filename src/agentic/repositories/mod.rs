pub mod backend_repository;
pub mod error;
pub mod http_backend_repository;
pub mod in_memory_backend_repository;

pub use backend_repository::{BackendRepository, BoxFuture};
pub use error::{BackendError, BackendResult};
pub use http_backend_repository::HttpBackendRepository;
pub use in_memory_backend_repository::{InMemoryBackendRepository, InjectedFailure, Operation};
