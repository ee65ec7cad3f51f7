// ── Client-side state ──

mod data_store;
pub mod session;
mod status;

pub use data_store::{DataStore, ResourceSlot};
pub use session::{
    FileSessionStore, KeyringSessionStore, MemorySessionStore, SESSION_KEY, SessionHandle,
    SessionStore,
};
pub use status::{Outcome, RequestId, RequestState, StatusBoard, StatusFlags};
