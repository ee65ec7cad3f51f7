// ── BackOffice facade ──
//
// Owns the API client, the session, the DataStore and the status board.
// Commands travel through a channel to a processor task that runs each
// one as its own task, so a slow list load never blocks a save.

use std::sync::Arc;

use backoffice_api::{ApiClient, EffectiveRateQuery, Language, ListQuery, Mutation, TokenProvider};
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::ClientConfig;
use crate::convert::{mutation_entity, page_into_model};
use crate::error::CoreError;
use crate::model::{
    DomainAction, Entity, EntityId, Resource, Session, changes_to_value, tree_from_values,
};
use crate::store::{
    DataStore, Outcome, RequestId, ResourceSlot, SessionHandle, SessionStore, StatusBoard,
};
use crate::stream::SlotStream;

const COMMAND_CHANNEL_SIZE: usize = 64;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<BackOfficeInner>`.
#[derive(Clone)]
pub struct BackOffice {
    inner: Arc<BackOfficeInner>,
}

struct BackOfficeInner {
    config: ClientConfig,
    api: ApiClient,
    session: Arc<SessionHandle>,
    store: DataStore,
    status: StatusBoard,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl BackOffice {
    /// Build the client and load any persisted session. Does not start
    /// the command processor; call [`start()`](Self::start).
    pub fn new(config: ClientConfig, sessions: Arc<dyn SessionStore>) -> Result<Self, CoreError> {
        let session = Arc::new(SessionHandle::load(sessions)?);
        let tokens: Arc<dyn TokenProvider> = Arc::clone(&session) as Arc<dyn TokenProvider>;
        let api = ApiClient::new(
            config.base_url.as_str(),
            &config.transport(),
            tokens,
            config.language,
        )?;
        Ok(Self::assemble(config, api, session))
    }

    /// Wrap an already-built API client (tests, custom transports).
    pub fn with_api(config: ClientConfig, api: ApiClient, session: Arc<SessionHandle>) -> Self {
        Self::assemble(config, api, session)
    }

    fn assemble(config: ClientConfig, api: ApiClient, session: Arc<SessionHandle>) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        Self {
            inner: Arc::new(BackOfficeInner {
                config,
                api,
                session,
                store: DataStore::new(),
                status: StatusBoard::new(),
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &DataStore {
        &self.inner.store
    }

    pub fn status(&self) -> &StatusBoard {
        &self.inner.status
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.inner.session.current()
    }

    pub fn is_signed_in(&self) -> bool {
        self.inner.session.is_signed_in()
    }

    pub fn language(&self) -> Language {
        self.inner.api.language()
    }

    pub fn set_language(&self, language: Language) {
        self.inner.api.set_language(language);
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the command processor. Calling it twice is a no-op.
    pub async fn start(&self) {
        let Some(rx) = self.inner.command_rx.lock().await.take() else {
            return;
        };
        let this = self.clone();
        let handle = tokio::spawn(command_processor_task(this, rx));
        self.inner.task_handles.lock().await.push(handle);
        debug!("command processor started");
    }

    /// Cancel in-flight work and join background tasks.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("shut down");
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Sign in and persist the returned payload as the session.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<Session, CoreError> {
        let payload = self.inner.api.login(email, password).await?;
        let session = Session::from_login_response(payload)?;
        self.inner.session.set(session.clone())?;
        info!(user = session.user_name().as_deref().unwrap_or("?"), "signed in");
        Ok(session)
    }

    /// Sign out. The local session and all cached data are cleared even
    /// when the server call fails.
    pub async fn logout(&self) -> Result<(), CoreError> {
        if self.inner.session.is_signed_in() {
            if let Err(e) = self.inner.api.logout().await {
                warn!(error = %e, "server logout failed (non-fatal)");
            }
        }
        self.inner.store.clear_all();
        self.inner.session.clear()?;
        info!("signed out");
        Ok(())
    }

    /// `GET /me` for the signed-in user.
    pub async fn me(&self) -> Result<Value, CoreError> {
        self.inner.api.me().await.map_err(|e| self.on_api_error(e))
    }

    // ── Command execution ────────────────────────────────────────────

    /// Queue a command without waiting. Its outcome is published on the
    /// status board under the returned id.
    pub async fn dispatch(&self, cmd: Command) -> Result<RequestId, CoreError> {
        let envelope = self.envelope(cmd, None);
        let id = envelope.id;
        self.send(envelope).await?;
        Ok(id)
    }

    /// Run a command and wait for its result.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        let (tx, rx) = oneshot::channel();
        let envelope = self.envelope(cmd, Some(tx));
        self.send(envelope).await?;
        rx.await.map_err(|_| CoreError::Disconnected)?
    }

    fn envelope(
        &self,
        command: Command,
        response_tx: Option<oneshot::Sender<Result<CommandResult, CoreError>>>,
    ) -> CommandEnvelope {
        let ticket = match &command {
            Command::FetchPage { resource, .. } => Some(self.inner.store.issue_ticket(*resource)),
            _ => None,
        };
        let id = self.inner.status.begin(command.resource(), command.label());
        CommandEnvelope {
            id,
            command,
            ticket,
            response_tx,
        }
    }

    async fn send(&self, envelope: CommandEnvelope) -> Result<(), CoreError> {
        let id = envelope.id;
        let listing = envelope.command.resource().filter(|_| envelope.ticket.is_some());
        let sent = !self.inner.cancel.is_cancelled()
            && self.inner.command_tx.send(envelope).await.is_ok();
        if sent {
            return Ok(());
        }
        if let Some(resource) = listing {
            self.inner.store.abandon_ticket(resource);
        }
        self.inner.status.fail(id, &CoreError::Disconnected);
        Err(CoreError::Disconnected)
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn slot(&self, resource: Resource) -> Arc<ResourceSlot> {
        self.inner.store.slot(resource)
    }

    pub fn subscribe(&self, resource: Resource) -> SlotStream {
        self.inner.store.subscribe(resource)
    }

    pub fn outcomes(&self) -> broadcast::Receiver<Outcome> {
        self.inner.status.subscribe()
    }

    // ── Convenience wrappers ─────────────────────────────────────────

    pub async fn fetch_page(
        &self,
        resource: Resource,
        query: ListQuery,
    ) -> Result<CommandResult, CoreError> {
        self.execute(Command::FetchPage { resource, query }).await
    }

    pub async fn perform(
        &self,
        resource: Resource,
        id: EntityId,
        action: DomainAction,
    ) -> Result<CommandResult, CoreError> {
        self.execute(Command::Perform {
            resource,
            id,
            action,
            body: None,
        })
        .await
    }

    // ── Error side effects ───────────────────────────────────────────

    /// A rejected token means the session is gone: forget it so the
    /// next screen is the sign-in form.
    fn on_api_error(&self, err: backoffice_api::Error) -> CoreError {
        let err = CoreError::from(err);
        if matches!(err, CoreError::AuthenticationFailed { .. }) {
            warn!("session rejected by server; signing out locally");
            self.inner.store.clear_all();
            if let Err(e) = self.inner.session.clear() {
                warn!(error = %e, "failed to clear session");
            }
        }
        err
    }
}

// ── Background tasks ─────────────────────────────────────────────────

async fn command_processor_task(office: BackOffice, mut rx: mpsc::Receiver<CommandEnvelope>) {
    let cancel = office.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                tokio::spawn(run_command(office.clone(), envelope));
            }
        }
    }

    // Anything still queued is resolved as disconnected.
    rx.close();
    while let Ok(envelope) = rx.try_recv() {
        office.inner.status.fail(envelope.id, &CoreError::Disconnected);
        if let Some(tx) = envelope.response_tx {
            let _ = tx.send(Err(CoreError::Disconnected));
        }
    }
}

async fn run_command(office: BackOffice, envelope: CommandEnvelope) {
    let CommandEnvelope {
        id,
        command,
        ticket,
        response_tx,
    } = envelope;
    let cancel = office.inner.cancel.clone();
    let is_write = command.is_write();

    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CoreError::Disconnected),
        result = route_command(&office, command, ticket) => result,
    };

    match &result {
        Ok(res) => {
            let message = is_write.then(|| res.message().map(String::from)).flatten();
            office.inner.status.succeed(id, message);
        }
        Err(e) => {
            debug!(%id, error = %e, "command failed");
            office.inner.status.fail(id, e);
        }
    }
    if let Some(tx) = response_tx {
        let _ = tx.send(result);
    }
}

// ── Command routing ──────────────────────────────────────────────────

async fn route_command(
    office: &BackOffice,
    cmd: Command,
    ticket: Option<u64>,
) -> Result<CommandResult, CoreError> {
    cmd.validate()?;
    let api = &office.inner.api;
    let store = &office.inner.store;
    let err = |e: backoffice_api::Error| office.on_api_error(e);

    match cmd {
        Command::FetchPage { resource, query } => {
            let ticket = ticket.unwrap_or_else(|| store.issue_ticket(resource));
            let query = with_page_size(query, office.inner.config.per_page);
            load_page(office, resource, ticket, query).await
        }

        Command::FetchDetails { resource, id } => {
            let value = api
                .fetch(resource.path(), &id.to_string())
                .await
                .map_err(err)?;
            let entity = Entity::new(value);
            store.set_details(resource, entity.clone());
            Ok(CommandResult::Entity(entity))
        }

        Command::Create { resource, body } => {
            let mutation = api.create(resource.path(), &body).await.map_err(err)?;
            Ok(apply_created(office, resource, &mutation))
        }

        Command::CreateWithAttachments {
            resource,
            body,
            files,
        } => {
            let mutation = api
                .create_with_attachments(resource.path(), &body, &files)
                .await
                .map_err(err)?;
            Ok(apply_created(office, resource, &mutation))
        }

        Command::Update { resource, id, body } => {
            let mutation = api
                .update(resource.path(), &id.to_string(), &body)
                .await
                .map_err(err)?;
            apply_updated(office, resource, &mutation, "Updated successfully").await
        }

        Command::UpdateWithAttachments {
            resource,
            id,
            body,
            files,
        } => {
            let mutation = api
                .update_with_attachments(resource.path(), &id.to_string(), &body, &files)
                .await
                .map_err(err)?;
            apply_updated(office, resource, &mutation, "Updated successfully").await
        }

        Command::Delete { resource, id } => {
            let mutation = api
                .remove(resource.path(), &id.to_string())
                .await
                .map_err(err)?;
            let message = mutation
                .message
                .unwrap_or_else(|| "Deleted successfully".into());
            let next_page = match store.remove_entity(resource, &id) {
                Some(p) => p.page_after_delete(0),
                None => store.slot(resource).current_page(),
            };
            let query = ListQuery {
                page: Some(next_page),
                ..store.slot(resource).query.clone()
            };
            refetch(office, resource, query).await;
            Ok(CommandResult::Deleted { next_page, message })
        }

        Command::ToggleStatus { resource, id } => {
            let mutation = api
                .toggle_status(resource.path(), &id.to_string())
                .await
                .map_err(err)?;
            apply_updated(office, resource, &mutation, "Status updated").await
        }

        Command::Perform {
            resource,
            id,
            action,
            body,
        } => {
            let mutation = api
                .action(resource.path(), &id.to_string(), action.as_path(), body.as_ref())
                .await
                .map_err(err)?;
            let fallback = format!("{} successfully", action.done_label());
            apply_updated(office, resource, &mutation, &fallback).await
        }

        Command::FetchTree { resource } => {
            let values = api.tree(resource.path()).await.map_err(err)?;
            let tree = tree_from_values(&values);
            store.set_tree(resource, tree.clone());
            Ok(CommandResult::Tree(tree))
        }

        Command::DeleteAttachment {
            resource,
            id,
            attachment_id,
        } => {
            let mutation = api
                .delete_attachment(resource.path(), &id.to_string(), &attachment_id.to_string())
                .await
                .map_err(err)?;
            // The server does not echo the parent; reload the open record.
            match api.fetch(resource.path(), &id.to_string()).await {
                Ok(value) => {
                    let entity = Entity::new(value);
                    store.merge_updated(resource, entity.clone());
                    store.set_details(resource, entity);
                }
                Err(e) => warn!(%resource, %id, error = %e, "reload after attachment delete failed"),
            }
            Ok(CommandResult::Mutation {
                entity: None,
                message: mutation
                    .message
                    .unwrap_or_else(|| "Attachment deleted".into()),
            })
        }

        Command::EffectiveRate { currency_id, date } => {
            let query = EffectiveRateQuery {
                currency_id: currency_id.to_string(),
                date,
            };
            let rate = api.effective_exchange_rate(&query).await.map_err(err)?;
            Ok(CommandResult::Rate(rate))
        }

        Command::FetchAccountLinks => {
            let links = api.account_links().await.map_err(err)?;
            Ok(CommandResult::AccountLinks(links))
        }

        Command::SaveAccountLinks { changes } => {
            if changes.is_empty() {
                return Ok(CommandResult::Mutation {
                    entity: None,
                    message: "No changes to save".into(),
                });
            }
            let mutation = api
                .save_account_links(&changes_to_value(&changes))
                .await
                .map_err(err)?;
            Ok(CommandResult::Mutation {
                entity: None,
                message: mutation
                    .message
                    .unwrap_or_else(|| "Account links saved".into()),
            })
        }
    }
}

// ── Routing helpers ──────────────────────────────────────────────────

fn with_page_size(mut query: ListQuery, per_page: u32) -> ListQuery {
    if query.per_page.is_none() {
        query.per_page = Some(per_page);
    }
    if query.page.is_none() {
        query.page = Some(1);
    }
    query
}

async fn load_page(
    office: &BackOffice,
    resource: Resource,
    ticket: u64,
    query: ListQuery,
) -> Result<CommandResult, CoreError> {
    let page = match office.inner.api.list(resource.path(), &query).await {
        Ok(page) => page,
        Err(e) => {
            office.inner.store.abandon_ticket(resource);
            return Err(office.on_api_error(e));
        }
    };
    let (items, pagination) = page_into_model(page);
    let applied =
        office
            .inner
            .store
            .apply_page(resource, ticket, items.clone(), pagination, query);
    Ok(CommandResult::Page {
        items,
        pagination,
        applied,
    })
}

/// Reload the list after a write. Skipped while another list request
/// is in flight: its response is newer than anything this one could add.
async fn refetch(office: &BackOffice, resource: Resource, query: ListQuery) {
    let store = &office.inner.store;
    if store.has_pending_page(resource) {
        debug!(%resource, "list request in flight; refetch skipped");
        return;
    }
    let query = with_page_size(query, office.inner.config.per_page);
    let ticket = store.issue_ticket(resource);
    if let Err(e) = load_page(office, resource, ticket, query).await {
        warn!(%resource, error = %e, "refetch after write failed");
    }
}

fn apply_created(office: &BackOffice, resource: Resource, mutation: &Mutation) -> CommandResult {
    let entity = mutation_entity(mutation);
    if let Some(entity) = &entity {
        office.inner.store.merge_created(resource, entity.clone());
    }
    CommandResult::Mutation {
        entity,
        message: mutation
            .message
            .clone()
            .unwrap_or_else(|| "Created successfully".into()),
    }
}

/// Merge the echoed entity; without one, reload the current page so
/// the change still shows up.
async fn apply_updated(
    office: &BackOffice,
    resource: Resource,
    mutation: &Mutation,
    fallback: &str,
) -> Result<CommandResult, CoreError> {
    let entity = mutation_entity(mutation);
    match &entity {
        Some(entity) => {
            office.inner.store.merge_updated(resource, entity.clone());
        }
        None => {
            let query = office.inner.store.slot(resource).query.clone();
            refetch(office, resource, query).await;
        }
    }
    Ok(CommandResult::Mutation {
        entity,
        message: mutation
            .message
            .clone()
            .unwrap_or_else(|| fallback.to_owned()),
    })
}
