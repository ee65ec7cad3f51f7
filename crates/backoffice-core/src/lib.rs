// backoffice-core: Reactive data layer between backoffice-api and consumers (CLI/TUI).

pub mod backoffice;
pub mod command;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backoffice::BackOffice;
pub use command::{Command, CommandResult};
pub use config::{ClientConfig, DEFAULT_PER_PAGE, TlsVerification};
pub use error::{CoreError, ValidationFields};
pub use store::{
    DataStore, FileSessionStore, KeyringSessionStore, MemorySessionStore, Outcome, RequestId,
    RequestState, ResourceSlot, SessionHandle, SessionStore, StatusBoard, StatusFlags,
};
pub use stream::SlotStream;

// Wire-level types consumers need alongside the core API.
pub use backoffice_api::{AttachmentUpload, Language, ListQuery};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    // Catalog
    Column, DomainAction, Resource, ResourceGroup,
    // Records
    Entity, EntityId, Session,
    // Lists
    PageSlot, Pagination, page_window,
    // Attachments
    Attachment, AttachmentDraft, PreviewRegistry, attachments_of,
    // Hierarchies
    FlatNode, TreeNode, TreeSnapshot, TreeView,
    // Journal entries
    Balance, JournalLine, JournalTotals, edit_body, format_amount, lines_of, parse_amount,
    // Account links
    AccountLinkForm, LinkChange, LinkRole,
};
