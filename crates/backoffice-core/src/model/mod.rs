// ── Domain model ──
//
// Server records stay opaque JSON (`Entity`); the types here are the few
// shapes the client owns or has to normalize.

pub mod account_links;
pub mod attachment;
pub mod entity;
pub mod entity_id;
pub mod journal;
pub mod pagination;
pub mod resource;
pub mod session;
pub mod tree;

pub use account_links::{AccountLinkForm, LinkChange, LinkRole, changes_to_value};
pub use attachment::{
    Attachment, AttachmentDraft, PendingUpload, PreviewHandle, PreviewRegistry, attachments_of,
};
pub use entity::Entity;
pub use entity_id::EntityId;
pub use journal::{
    Balance, JournalLine, JournalTotals, edit_body, format_amount, lines_of, parse_amount,
};
pub use pagination::{PageSlot, Pagination, page_window};
pub use resource::{Column, DomainAction, Resource, ResourceGroup};
pub use session::Session;
pub use tree::{FlatNode, TreeNode, TreeSnapshot, TreeView, flatten, tree_from_values};
