// backoffice-api: Async Rust client for the HR + accounting back-office REST API

pub mod attachments;
pub mod auth;
pub mod client;
pub mod envelope;
pub mod error;
pub mod resources;
pub mod transport;

pub use attachments::AttachmentUpload;
pub use auth::{Language, StaticToken, TokenProvider};
pub use client::ApiClient;
pub use envelope::{Mutation, Page, PageMeta};
pub use error::Error;
pub use resources::{EffectiveRateQuery, ListQuery};
pub use transport::{TlsMode, TransportConfig};
