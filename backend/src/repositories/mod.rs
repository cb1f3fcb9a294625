pub mod attendance;
pub mod class_session;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod pg;
pub mod signature_token;
pub mod store;
pub mod transaction;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemorySignatureStore;
pub use pg::PgSignatureStore;
pub use store::{
    AttendanceStore, PendingSessionQuery, SessionDirectory, SignatureStore, StoreError, TokenStore,
};
