// ── Command API ──
//
// Every server interaction of the resource modules flows through the
// `Command` enum. `BackOffice` routes each variant to the API client
// and merges the result into the DataStore.

use backoffice_api::{AttachmentUpload, ListQuery};
use chrono::NaiveDate;
use serde_json::Value;

use crate::error::CoreError;
use crate::model::{DomainAction, Entity, EntityId, LinkChange, Pagination, Resource};
use crate::store::RequestId;

/// A command envelope sent through the command channel.
pub(crate) struct CommandEnvelope {
    pub id: RequestId,
    pub command: Command,
    /// List ticket reserved at dispatch time, so request order decides
    /// which response wins.
    pub ticket: Option<u64>,
    /// `None` for fire-and-forget dispatches; the outcome is still
    /// published on the status board.
    pub response_tx: Option<tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>>,
}

#[derive(Debug, Clone)]
pub enum Command {
    // ── Generic resource operations ──────────────────────────────────
    FetchPage {
        resource: Resource,
        query: ListQuery,
    },
    FetchDetails {
        resource: Resource,
        id: EntityId,
    },
    Create {
        resource: Resource,
        body: Value,
    },
    Update {
        resource: Resource,
        id: EntityId,
        body: Value,
    },
    Delete {
        resource: Resource,
        id: EntityId,
    },
    ToggleStatus {
        resource: Resource,
        id: EntityId,
    },
    Perform {
        resource: Resource,
        id: EntityId,
        action: DomainAction,
        body: Option<Value>,
    },

    // ── Hierarchies ──────────────────────────────────────────────────
    FetchTree {
        resource: Resource,
    },

    // ── Attachments ──────────────────────────────────────────────────
    CreateWithAttachments {
        resource: Resource,
        body: Value,
        files: Vec<AttachmentUpload>,
    },
    UpdateWithAttachments {
        resource: Resource,
        id: EntityId,
        body: Value,
        files: Vec<AttachmentUpload>,
    },
    DeleteAttachment {
        resource: Resource,
        id: EntityId,
        attachment_id: EntityId,
    },

    // ── Treasury & ledger settings ───────────────────────────────────
    EffectiveRate {
        currency_id: EntityId,
        date: Option<NaiveDate>,
    },
    FetchAccountLinks,
    SaveAccountLinks {
        changes: Vec<LinkChange>,
    },
}

impl Command {
    pub fn resource(&self) -> Option<Resource> {
        match self {
            Self::FetchPage { resource, .. }
            | Self::FetchDetails { resource, .. }
            | Self::Create { resource, .. }
            | Self::Update { resource, .. }
            | Self::Delete { resource, .. }
            | Self::ToggleStatus { resource, .. }
            | Self::Perform { resource, .. }
            | Self::FetchTree { resource }
            | Self::CreateWithAttachments { resource, .. }
            | Self::UpdateWithAttachments { resource, .. }
            | Self::DeleteAttachment { resource, .. } => Some(*resource),
            Self::EffectiveRate { .. } => Some(Resource::ExchangeRates),
            Self::FetchAccountLinks | Self::SaveAccountLinks { .. } => Some(Resource::AccountLinks),
        }
    }

    /// Short description used in logs and the status history.
    pub fn label(&self) -> String {
        let name = self.resource().map_or("", Resource::path);
        match self {
            Self::FetchPage { query, .. } => {
                format!("load {name} page {}", query.page.unwrap_or(1))
            }
            Self::FetchDetails { id, .. } => format!("load {name} #{id}"),
            Self::Create { .. } | Self::CreateWithAttachments { .. } => format!("create {name}"),
            Self::Update { id, .. } | Self::UpdateWithAttachments { id, .. } => {
                format!("update {name} #{id}")
            }
            Self::Delete { id, .. } => format!("delete {name} #{id}"),
            Self::ToggleStatus { id, .. } => format!("toggle {name} #{id}"),
            Self::Perform { id, action, .. } => format!("{action} {name} #{id}"),
            Self::FetchTree { .. } => format!("load {name} tree"),
            Self::DeleteAttachment {
                id, attachment_id, ..
            } => format!("delete attachment {attachment_id} of {name} #{id}"),
            Self::EffectiveRate { currency_id, .. } => {
                format!("effective rate for currency {currency_id}")
            }
            Self::FetchAccountLinks => "load account links".into(),
            Self::SaveAccountLinks { changes } => format!("save {} account links", changes.len()),
        }
    }

    /// Reads are silent on success; writes produce a toast.
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            Self::FetchPage { .. }
                | Self::FetchDetails { .. }
                | Self::FetchTree { .. }
                | Self::EffectiveRate { .. }
                | Self::FetchAccountLinks
        )
    }

    /// Reject commands the resource does not support before any I/O.
    pub(crate) fn validate(&self) -> Result<(), CoreError> {
        let unsupported = |what: &str, resource: Resource| {
            Err(CoreError::InvalidInput {
                message: format!("{} does not support {what}", resource.label()),
            })
        };
        match self {
            Self::ToggleStatus { resource, .. } if !resource.supports_toggle() => {
                unsupported("status toggling", *resource)
            }
            Self::Perform {
                resource, action, ..
            } if !resource.supports_action(*action) => unsupported(action.as_path(), *resource),
            Self::FetchTree { resource } if !resource.is_tree() => {
                unsupported("a tree view", *resource)
            }
            Self::CreateWithAttachments { resource, .. }
            | Self::UpdateWithAttachments { resource, .. }
            | Self::DeleteAttachment { resource, .. }
                if !resource.accepts_attachments() =>
            {
                unsupported("attachments", *resource)
            }
            _ => Ok(()),
        }
    }
}

/// Result of a successfully executed command.
#[derive(Debug, Clone)]
pub enum CommandResult {
    Ok,
    Page {
        items: Vec<Entity>,
        pagination: Option<Pagination>,
        /// `false` when a newer list request had already landed.
        applied: bool,
    },
    Entity(Entity),
    Mutation {
        entity: Option<Entity>,
        message: String,
    },
    Deleted {
        /// Page the list was refetched at.
        next_page: u32,
        message: String,
    },
    Tree(Vec<crate::model::TreeNode>),
    Rate(Value),
    AccountLinks(Vec<Value>),
}

impl CommandResult {
    /// Success message for a toast, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Mutation { message, .. } | Self::Deleted { message, .. } => Some(message),
            _ => None,
        }
    }
}
