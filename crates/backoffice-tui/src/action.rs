//! All possible UI actions. Actions are the sole mechanism for state mutation.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use secrecy::SecretString;

use backoffice_core::{
    AttachmentUpload, Command, CommandResult, CoreError, DomainAction, EntityId, Language,
    Outcome, RequestState, Resource, ResourceSlot,
};

use crate::screen::ScreenId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// A toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Success,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Error,
        }
    }

    pub fn info(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Info,
        }
    }

    /// One toast per finished request; silent loads produce none.
    pub fn from_outcome(outcome: &Outcome) -> Option<Self> {
        match &outcome.state {
            RequestState::Pending | RequestState::Succeeded { message: None } => None,
            RequestState::Succeeded {
                message: Some(message),
            } => Some(Self::success(message.clone())),
            RequestState::Failed { message, .. } => Some(Self::error(message.clone())),
        }
    }
}

/// Destructive operations wait here for a y/n answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    Delete {
        resource: Resource,
        id: EntityId,
        name: String,
    },
    DeleteAttachment {
        resource: Resource,
        id: EntityId,
        attachment_id: EntityId,
        name: String,
    },
    Perform {
        resource: Resource,
        id: EntityId,
        action: DomainAction,
        name: String,
    },
}

impl ConfirmAction {
    pub fn into_command(self) -> Command {
        match self {
            Self::Delete { resource, id, .. } => Command::Delete { resource, id },
            Self::DeleteAttachment {
                resource,
                id,
                attachment_id,
                ..
            } => Command::DeleteAttachment {
                resource,
                id,
                attachment_id,
            },
            Self::Perform {
                resource,
                id,
                action,
                ..
            } => Command::Perform {
                resource,
                id,
                action,
                body: None,
            },
        }
    }
}

impl fmt::Display for ConfirmAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete { name, .. } => write!(f, "Delete {name}? This cannot be undone."),
            Self::DeleteAttachment { name, .. } => write!(f, "Delete attachment {name} now?"),
            Self::Perform { action, name, .. } => {
                write!(f, "{} {name}?", capitalize(action.as_path()))
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

/// An awaited command that failed, with per-field validation messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl Failure {
    pub fn from_error(error: &CoreError) -> Self {
        let fields = match error {
            CoreError::Validation { fields, .. } => fields
                .iter()
                .filter_map(|(name, messages)| Some((name.clone(), messages.first()?.clone())))
                .collect(),
            _ => Vec::new(),
        };
        Self {
            message: error.user_message(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, m)| m.as_str())
    }
}

/// Which view asked for an awaited command, so only it reacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Form(Resource),
    Tree(Resource),
    Attachments(Resource),
    Links,
}

/// Every state transition in the TUI is expressed as an Action.
#[derive(Debug)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    Tick,
    Render,
    Resize(u16, u16),

    // ── Navigation ────────────────────────────────────────────────
    SwitchScreen(ScreenId),
    OpenResource(Resource),
    ToggleHelp,
    ToggleLanguage,
    LanguageChanged(Language),

    // ── Session ───────────────────────────────────────────────────
    Login {
        email: String,
        password: SecretString,
    },
    LoginResult(Result<String, String>),
    Logout,
    SignedOut,

    // ── Data events (from the back-office store) ─────────────────
    SlotUpdated(Resource, Arc<ResourceSlot>),
    RequestFinished(Outcome),
    /// Drop the open detail record of a resource.
    CloseDetails(Resource),

    // ── Commands ──────────────────────────────────────────────────
    /// Fire and forget; the outcome arrives as a toast.
    Dispatch(Command),
    /// Await the result and report it back to `origin`.
    Execute { origin: Origin, command: Command },
    Executed {
        origin: Origin,
        result: Result<CommandResult, Failure>,
    },

    // ── Attachments ───────────────────────────────────────────────
    StageUpload(PathBuf),
    UploadStaged(Result<AttachmentUpload, String>),

    // ── Confirm dialog ────────────────────────────────────────────
    /// With an origin, the confirmed command is awaited and reported
    /// back as `Executed`.
    ShowConfirm {
        confirm: ConfirmAction,
        origin: Option<Origin>,
    },
    ConfirmYes,
    ConfirmNo,

    // ── Search ────────────────────────────────────────────────────
    OpenSearch,
    CloseSearch,
    SearchSubmit(String),

    // ── Notifications ─────────────────────────────────────────────
    Notify(Notification),
    DismissNotification,
}

impl Action {
    /// Store and session events every mounted view sees, not only the
    /// focused one.
    pub fn is_broadcast(&self) -> bool {
        matches!(
            self,
            Self::SlotUpdated(..)
                | Self::Executed { .. }
                | Self::LanguageChanged(_)
                | Self::SignedOut
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use backoffice_core::RequestId;

    use super::*;

    #[test]
    fn delete_confirmation_maps_to_delete_command() {
        let confirm = ConfirmAction::Delete {
            resource: Resource::Vendors,
            id: EntityId::from("31"),
            name: "Vendor 31".into(),
        };
        assert_eq!(confirm.to_string(), "Delete Vendor 31? This cannot be undone.");
        assert!(matches!(
            confirm.into_command(),
            Command::Delete {
                resource: Resource::Vendors,
                ..
            }
        ));
    }

    #[test]
    fn validation_failures_keep_the_first_message_per_field() {
        let mut fields = backoffice_core::ValidationFields::new();
        fields.insert("name".into(), vec!["Name is required".into(), "Too short".into()]);
        fields.insert("code".into(), vec![]);
        let failure = Failure::from_error(&CoreError::Validation {
            message: "The given data was invalid.".into(),
            fields,
        });
        assert_eq!(failure.message, "The given data was invalid.");
        assert_eq!(failure.field("name"), Some("Name is required"));
        assert_eq!(failure.field("code"), None);
    }

    #[test]
    fn transition_prompt_names_the_action() {
        let confirm = ConfirmAction::Perform {
            resource: Resource::JournalEntries,
            id: EntityId::from("7"),
            action: DomainAction::Post,
            name: "JE-0007".into(),
        };
        assert_eq!(confirm.to_string(), "Post JE-0007?");
    }

    fn outcome(state: RequestState) -> Outcome {
        let board = backoffice_core::StatusBoard::new();
        let id: RequestId = board.begin(Some(Resource::Vendors), "delete vendors #3");
        Outcome {
            id,
            resource: Some(Resource::Vendors),
            label: "delete vendors #3".into(),
            state,
        }
    }

    #[test]
    fn only_finished_requests_with_text_toast() {
        assert_eq!(
            Notification::from_outcome(&outcome(RequestState::Pending)),
            None
        );
        assert_eq!(
            Notification::from_outcome(&outcome(RequestState::Succeeded { message: None })),
            None
        );
        assert_eq!(
            Notification::from_outcome(&outcome(RequestState::Succeeded {
                message: Some("Deleted successfully".into())
            })),
            Some(Notification::success("Deleted successfully"))
        );
        let failed = Notification::from_outcome(&outcome(RequestState::Failed {
            message: "Name is required".into(),
            auth_expired: false,
        }))
        .unwrap();
        assert_eq!(failed.level, NotificationLevel::Error);
    }
}
