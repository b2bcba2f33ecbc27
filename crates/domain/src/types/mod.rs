//! Domain types and models

pub mod credential;
pub mod event;

pub use credential::{Credential, IdentityKind, TokenGrant};
pub use event::{Event, EventRecord, GeoPoint};
