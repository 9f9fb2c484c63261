//! Application state management for Citadesk.
//!
//! This module contains the core `App` struct owning the appointment
//! snapshot, filter and search state, session management, and background
//! task coordination. The UI layer never mutates remote state directly: it
//! dispatches `Action`s, and background tasks report back over an MPSC
//! channel whose results are folded into the snapshot on the main loop.

use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::api::ApiClient;
use crate::auth::{CredentialStore, Session};
use crate::cache::worker::{self, WorkerCommand};
use crate::config::Config;
use crate::export::{self, ExportError};
use crate::install::InstallPrompt;
use crate::models::{Cita, CitaFilter, CitaStatus, Stats};
use crate::realtime;

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
/// A handful of in-flight operations is the practical maximum.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Maximum length for email input in the login form
const MAX_EMAIL_LENGTH: usize = 64;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Number of rows to scroll on page up/down
pub const PAGE_SCROLL_SIZE: usize = 10;

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    Searching,
    EditingDateFilter,
    ShowingHelp,
    LoggingIn,
    ConfirmingQuit,
    ConfirmingInstall,
    /// Blocking warning for an export attempt on an empty snapshot
    ShowingExportWarning,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginFocus {
    Email,
    Password,
    Button,
}

/// Per-row affordances in the appointment table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    /// Mark the appointment confirmed
    Confirm,
    /// Cancel the appointment (removes the record)
    Cancel,
}

/// The capability set the surface can invoke on the controller.
/// Everything else is local UI state handled by the input layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Reload from the remote table with the current filters
    Load,
    /// Clear all filters and search, then reload
    ClearFilters,
    /// Export the snapshot to a spreadsheet file
    Export,
    /// Sign out and return to the login overlay
    Logout,
    /// A row-level action on one record
    Row { id: i64, action: RowAction },
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent back from background remote operations.
///
/// Each variant is sent through the MPSC channel from a spawned task and
/// folded into app state by `process_sync_result` on the main loop.
enum SyncResult {
    /// Authoritative snapshot from a load, in server order
    Loaded(Vec<Cita>),
    /// A remote status update succeeded
    StatusUpdated { id: i64, status: CitaStatus },
    /// A remote delete succeeded
    Deleted(i64),
    /// The offline shell finished installing
    Installed,
    /// Sign-out finished; the local session is discarded either way
    SignedOut,
    /// A remote operation failed
    Error(String),
}

// ============================================================================
// Main Application Struct
// ============================================================================

/// Main application state container.
/// Constructed once at startup and dropped on exit; there is no other owner
/// of the snapshot or the install-prompt handle.
pub struct App {
    // Core services
    pub config: Config,
    pub session: Session,
    pub api: ApiClient,

    // Appointment snapshot. Only ever replaced wholesale by a load, or
    // patched optimistically right before a forced reload.
    pub citas: Vec<Cita>,
    pub stats: Stats,

    // Filter and search state
    pub filter_date: String,
    pub filter_status: Option<CitaStatus>,
    pub search_query: String,

    // UI state
    pub state: AppState,
    pub selection: usize,
    pub status_message: Option<String>,

    // Login form state
    pub login_email: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // Install affordance
    pub install: InstallPrompt,
    shell_worker: Option<mpsc::Sender<WorkerCommand>>,

    // Background task channels
    sync_rx: mpsc::Receiver<SyncResult>,
    sync_tx: mpsc::Sender<SyncResult>,
    changes_rx: Option<mpsc::Receiver<()>>,

    // A successful write or a change-feed event forces an authoritative
    // reload on the next tick
    needs_reload: bool,
}

impl App {
    /// Create a new application instance
    pub async fn new() -> Result<Self> {
        debug!("App::new() starting");
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
        debug!(?cache_dir, "Cache directory configured");

        // Load session from disk if it exists
        let mut session = Session::new(cache_dir);
        let load_result = session.load();
        debug!(?load_result, has_data = session.data.is_some(), "Session loaded");

        let project_url = config.project_url.clone().unwrap_or_default();
        let api_key = config.api_key.clone().unwrap_or_default();
        let mut api = ApiClient::new(&project_url, &api_key)?;

        if let Some(token) = session.token() {
            api.set_token(token.to_string());
            debug!("Token set on API client");
        }

        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        // Prefill the login form from env vars or config
        let login_email = std::env::var("CITADESK_EMAIL")
            .ok()
            .or_else(|| config.last_email.clone())
            .unwrap_or_default();
        let mut login_password = std::env::var("CITADESK_PASSWORD").unwrap_or_default();

        // Reuse the keychain password for the last account so re-login is
        // a single keypress
        if login_password.is_empty()
            && !login_email.is_empty()
            && CredentialStore::has_credentials(&login_email)
        {
            if let Ok(password) = CredentialStore::get_password(&login_email) {
                login_password = password;
            }
        }

        let install = InstallPrompt::new(config.installed);

        Ok(Self {
            config,
            session,
            api,

            citas: Vec::new(),
            stats: Stats::default(),

            filter_date: String::new(),
            filter_status: None,
            search_query: String::new(),

            state: AppState::Normal,
            selection: 0,
            status_message: None,

            login_email,
            login_password,
            login_focus: LoginFocus::Email,
            login_error: None,

            install,
            shell_worker: None,

            sync_rx: rx,
            sync_tx: tx,
            changes_rx: None,

            needs_reload: false,
        })
    }

    // =========================================================================
    // Background services
    // =========================================================================

    /// Start the shell worker on its own task. Once registered, the
    /// platform considers the app installable.
    pub fn start_shell_worker(&mut self) {
        let site_url = match self.config.site_url.clone() {
            Some(url) => url,
            None => {
                debug!("No site URL configured, offline shell disabled");
                return;
            }
        };
        let store_root = match self.config.shell_store_root() {
            Ok(root) => root,
            Err(e) => {
                warn!(error = %e, "No cache directory, offline shell disabled");
                return;
            }
        };

        self.shell_worker = Some(worker::spawn(
            site_url,
            self.config.database_host(),
            store_root,
        ));
        self.install.on_prompt_available();
    }

    /// Subscribe to the remote change feed
    pub fn start_change_feed(&mut self) {
        let base_url = match self.config.project_url.clone() {
            Some(url) => url,
            None => {
                debug!("No project URL configured, change feed disabled");
                return;
            }
        };
        let api_key = self.config.api_key.clone().unwrap_or_default();
        self.changes_rx = Some(realtime::spawn_change_feed(base_url, api_key));
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Check if the user has a valid session
    pub fn is_authenticated(&self) -> bool {
        self.session.is_valid()
    }

    /// Start the login process (show login overlay)
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_focus = if self.login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) -> Result<()> {
        let email = self.login_email.clone();
        let password = self.login_password.clone();

        if email.is_empty() || password.is_empty() {
            self.login_error = Some("Email and password required".to_string());
            return Err(anyhow::anyhow!("Email and password required"));
        }

        self.login_error = None;

        match self.api.sign_in(&email, &password).await {
            Ok(session_data) => {
                if let Err(e) = CredentialStore::store(&email, &password) {
                    warn!(error = %e, "Failed to store credentials");
                }

                self.config.last_email = Some(email);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }

                self.session.update(session_data);
                if let Err(e) = self.session.save() {
                    warn!(error = %e, "Failed to save session");
                }

                if let Some(token) = self.session.token() {
                    self.api.set_token(token.to_string());
                }

                self.login_password.clear();
                self.state = AppState::Normal;
                info!("Login successful");

                // First load after login
                self.dispatch(Action::Load);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                let text = e.to_string();
                let lower = text.to_lowercase();
                let user_message = if text.contains("401") || lower.contains("unauthorized") {
                    "Invalid email or password".to_string()
                } else if lower.contains("network") || lower.contains("connect") {
                    "Unable to connect to server. Check your internet connection.".to_string()
                } else {
                    format!("Login failed: {}", e)
                };
                self.login_error = Some(user_message);
                Err(e)
            }
        }
    }

    // =========================================================================
    // Action dispatch
    // =========================================================================

    /// Entry point for everything the surface can ask the controller to do
    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::Load => self.spawn_load(),
            Action::ClearFilters => {
                self.filter_date.clear();
                self.filter_status = None;
                self.search_query.clear();
                self.spawn_load();
            }
            Action::Export => self.export_snapshot(),
            Action::Logout => self.spawn_logout(),
            Action::Row {
                id,
                action: RowAction::Confirm,
            } => self.spawn_status_update(id, CitaStatus::Confirmed),
            Action::Row {
                id,
                action: RowAction::Cancel,
            } => self.spawn_delete(id),
        }
    }

    /// Filters as they will be applied to the next load
    pub fn current_filter(&self) -> CitaFilter {
        let date = self.filter_date.trim();
        CitaFilter {
            date: (!date.is_empty()).then(|| date.to_string()),
            status: self.filter_status,
        }
    }

    fn spawn_load(&mut self) {
        let api = self.api.clone();
        let filter = self.current_filter();
        let tx = self.sync_tx.clone();
        debug!(filtered = !filter.is_empty(), "Loading appointments");

        tokio::spawn(async move {
            match api.fetch_citas(&filter).await {
                Ok(data) => {
                    debug!(count = data.len(), "Appointments fetched");
                    Self::send_result(&tx, SyncResult::Loaded(data)).await;
                }
                Err(e) => {
                    Self::send_result(&tx, SyncResult::Error(format!("Load: {}", e))).await;
                }
            }
        });
    }

    fn spawn_status_update(&mut self, id: i64, status: CitaStatus) {
        let api = self.api.clone();
        let tx = self.sync_tx.clone();

        tokio::spawn(async move {
            match api.update_status(id, status).await {
                Ok(()) => {
                    debug!(id, status = %status, "Status updated");
                    Self::send_result(&tx, SyncResult::StatusUpdated { id, status }).await;
                }
                Err(e) => {
                    Self::send_result(&tx, SyncResult::Error(format!("Update: {}", e))).await;
                }
            }
        });
    }

    fn spawn_delete(&mut self, id: i64) {
        let api = self.api.clone();
        let tx = self.sync_tx.clone();

        tokio::spawn(async move {
            match api.delete_cita(id).await {
                Ok(()) => {
                    debug!(id, "Appointment deleted");
                    Self::send_result(&tx, SyncResult::Deleted(id)).await;
                }
                Err(e) => {
                    Self::send_result(&tx, SyncResult::Error(format!("Delete: {}", e))).await;
                }
            }
        });
    }

    fn spawn_logout(&mut self) {
        let api = self.api.clone();
        let tx = self.sync_tx.clone();

        tokio::spawn(async move {
            // The local session is discarded regardless of the remote outcome
            if let Err(e) = api.sign_out().await {
                warn!(error = %e, "Sign-out request failed");
            }
            Self::send_result(&tx, SyncResult::SignedOut).await;
        });
    }

    fn export_snapshot(&mut self) {
        match export::export_citas(&self.citas, &export::default_export_dir()) {
            Ok(path) => {
                info!(path = %path.display(), count = self.citas.len(), "Exported appointments");
                self.status_message = Some(format!(
                    "Exported {} citas to {}",
                    self.citas.len(),
                    path.display()
                ));
            }
            Err(ExportError::Empty) => {
                warn!("Export requested with empty snapshot");
                self.state = AppState::ShowingExportWarning;
            }
            Err(e) => {
                error!(error = %e, "Export failed");
                self.status_message = Some(format!("Error: {}", e));
            }
        }
    }

    // =========================================================================
    // Install affordance
    // =========================================================================

    /// Replay the retained install prompt, if any
    pub fn request_install(&mut self) {
        if self.install.take_prompt().is_some() {
            self.state = AppState::ConfirmingInstall;
        }
    }

    /// User accepted the install prompt: run the shell worker's install
    pub fn confirm_install(&mut self) {
        self.state = AppState::Normal;

        let Some(worker_tx) = self.shell_worker.clone() else {
            self.status_message = Some("Offline shell unavailable".to_string());
            return;
        };
        let tx = self.sync_tx.clone();

        tokio::spawn(async move {
            let (done_tx, done_rx) = oneshot::channel();
            if worker_tx
                .send(WorkerCommand::Install { done: done_tx })
                .await
                .is_err()
            {
                Self::send_result(&tx, SyncResult::Error("Install: worker stopped".to_string()))
                    .await;
                return;
            }
            match done_rx.await {
                Ok(Ok(())) => Self::send_result(&tx, SyncResult::Installed).await,
                Ok(Err(e)) => {
                    Self::send_result(&tx, SyncResult::Error(format!("Install: {}", e))).await;
                }
                Err(_) => {
                    Self::send_result(&tx, SyncResult::Error("Install: worker stopped".to_string()))
                        .await;
                }
            }
        });

        self.status_message = Some("Installing offline shell...".to_string());
    }

    /// User dismissed the install prompt. The prompt was consumed when it
    /// was replayed; the affordance stays hidden until the platform offers
    /// it again.
    pub fn decline_install(&mut self) {
        self.state = AppState::Normal;
        info!("Install prompt dismissed");
    }

    // =========================================================================
    // Rendering projections
    // =========================================================================

    /// Rows currently visible: the snapshot filtered by the live search
    /// term over name, email, and phone. Regenerated from scratch each
    /// frame; there is no incremental diffing.
    pub fn visible_citas(&self) -> Vec<&Cita> {
        let needle = self.search_query.trim();
        self.citas
            .iter()
            .filter(|c| c.matches_search(needle))
            .collect()
    }

    /// Identifier of the currently selected visible row
    pub fn selected_cita_id(&self) -> Option<i64> {
        self.visible_citas().get(self.selection).map(|c| c.id)
    }

    pub fn move_selection_up(&mut self, rows: usize) {
        self.selection = self.selection.saturating_sub(rows);
    }

    pub fn move_selection_down(&mut self, rows: usize) {
        let len = self.visible_citas().len();
        self.selection = (self.selection + rows).min(len.saturating_sub(1));
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_citas().len();
        if self.selection >= len {
            self.selection = len.saturating_sub(1);
        }
    }

    // =========================================================================
    // Background task processing
    // =========================================================================

    /// Helper to send sync results, logging any channel errors
    async fn send_result(tx: &mpsc::Sender<SyncResult>, result: SyncResult) {
        if let Err(e) = tx.send(result).await {
            error!(error = %e, "Failed to send sync result - channel closed");
        }
    }

    /// Check for completed background tasks and process results.
    /// Called on every tick of the main loop.
    pub fn check_background_tasks(&mut self) {
        let mut results = Vec::new();
        while let Ok(result) = self.sync_rx.try_recv() {
            results.push(result);
        }
        for result in results {
            self.process_sync_result(result);
        }

        self.drain_change_feed();

        if self.needs_reload {
            self.needs_reload = false;
            self.spawn_load();
        }
    }

    /// Fold change-feed notifications into a single pending reload
    fn drain_change_feed(&mut self) {
        let mut changed = false;
        if let Some(ref mut rx) = self.changes_rx {
            while rx.try_recv().is_ok() {
                changed = true;
            }
        }
        if changed {
            debug!("Change feed event, scheduling reload");
            self.needs_reload = true;
        }
    }

    /// Fold a single background result into app state
    fn process_sync_result(&mut self, result: SyncResult) {
        match result {
            SyncResult::Loaded(data) => {
                // Wholesale replacement; ordering comes from the server
                self.citas = data;
                self.stats = Stats::from_citas(&self.citas);
                self.clamp_selection();
            }
            SyncResult::StatusUpdated { id, status } => {
                // Optimistic patch; the authoritative reload follows
                // unconditionally so the snapshot cannot drift
                if let Some(cita) = self.citas.iter_mut().find(|c| c.id == id) {
                    cita.status = Some(status);
                }
                self.stats = Stats::from_citas(&self.citas);
                self.needs_reload = true;
            }
            SyncResult::Deleted(id) => {
                self.citas.retain(|c| c.id != id);
                self.stats = Stats::from_citas(&self.citas);
                self.clamp_selection();
                self.needs_reload = true;
            }
            SyncResult::Installed => {
                self.install.on_installed();
                self.config.installed = true;
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                self.status_message = Some("Offline shell installed".to_string());
            }
            SyncResult::SignedOut => {
                if let Err(e) = self.session.clear() {
                    warn!(error = %e, "Failed to clear session");
                }
                self.api.clear_token();
                self.citas.clear();
                self.stats = Stats::default();
                // Back to the login overlay, the console's login page
                self.start_login();
            }
            SyncResult::Error(msg) => {
                error!(error = %msg, "Background task error");
                let lower = msg.to_lowercase();
                let user_message = if lower.contains("unauthorized") || lower.contains("401") {
                    "Session expired. Please log in again.".to_string()
                } else if lower.contains("network") || lower.contains("connect") {
                    "Network error. Check your connection.".to_string()
                } else {
                    format!("Error: {}", msg)
                };
                self.status_message = Some(user_message);
            }
        }
    }
}

// ============================================================================
// Login input guards
// ============================================================================

pub fn can_add_email_char(email: &str) -> bool {
    email.len() < MAX_EMAIL_LENGTH
}

pub fn can_add_password_char(password: &str) -> bool {
    password.len() < MAX_PASSWORD_LENGTH
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cita(id: i64, name: &str, date: &str, status: Option<CitaStatus>) -> Cita {
        Cita {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: (id % 2 == 0).then(|| format!("60011122{}", id)),
            date: date.to_string(),
            time: "10:00".to_string(),
            reason: None,
            status,
        }
    }

    async fn test_app() -> App {
        let mut app = App::new().await.unwrap();
        // Tests drive the controller directly; no background services, and
        // a known-clean install state regardless of any host config
        app.changes_rx = None;
        app.install = InstallPrompt::new(false);
        app
    }

    fn sample_snapshot() -> Vec<Cita> {
        vec![
            cita(1, "Ana", "2026-03-01", None),
            cita(2, "Luis", "2026-03-02", Some(CitaStatus::Pending)),
            cita(3, "Marta", "2026-03-03", Some(CitaStatus::Confirmed)),
        ]
    }

    #[tokio::test]
    async fn test_load_replaces_snapshot_preserving_order() {
        let mut app = test_app().await;
        app.citas = vec![cita(9, "Old", "2026-01-01", None)];

        app.process_sync_result(SyncResult::Loaded(sample_snapshot()));

        let ids: Vec<i64> = app.citas.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        // Server order (date ascending) is preserved as-is
        let dates: Vec<&str> = app.citas.iter().map(|c| c.date.as_str()).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
        assert_eq!(app.stats.total, 3);
        assert_eq!(app.stats.confirmed, 1);
        assert_eq!(app.stats.pending, 2);
    }

    #[tokio::test]
    async fn test_failed_load_leaves_snapshot_untouched() {
        let mut app = test_app().await;
        app.process_sync_result(SyncResult::Loaded(sample_snapshot()));

        app.process_sync_result(SyncResult::Error("Load: server error".to_string()));

        assert_eq!(app.citas.len(), 3);
        assert_eq!(app.stats.total, 3);
        assert!(app.status_message.is_some());
        assert!(!app.needs_reload);
    }

    #[tokio::test]
    async fn test_status_update_patches_then_forces_reload() {
        let mut app = test_app().await;
        app.process_sync_result(SyncResult::Loaded(sample_snapshot()));

        app.process_sync_result(SyncResult::StatusUpdated {
            id: 1,
            status: CitaStatus::Confirmed,
        });

        assert_eq!(app.citas[0].status, Some(CitaStatus::Confirmed));
        assert_eq!(app.stats.confirmed, 2);
        assert!(app.needs_reload);

        // The authoritative reload lands and agrees
        let mut reloaded = sample_snapshot();
        reloaded[0].status = Some(CitaStatus::Confirmed);
        app.process_sync_result(SyncResult::Loaded(reloaded));
        assert_eq!(app.citas[0].status, Some(CitaStatus::Confirmed));
    }

    #[tokio::test]
    async fn test_delete_removes_optimistically_and_forces_reload() {
        let mut app = test_app().await;
        app.process_sync_result(SyncResult::Loaded(sample_snapshot()));

        app.process_sync_result(SyncResult::Deleted(2));

        assert!(app.citas.iter().all(|c| c.id != 2));
        assert_eq!(app.stats.total, 2);
        assert!(app.needs_reload);

        // Still absent after the authoritative reload
        let reloaded: Vec<Cita> = sample_snapshot().into_iter().filter(|c| c.id != 2).collect();
        app.process_sync_result(SyncResult::Loaded(reloaded));
        assert!(app.citas.iter().all(|c| c.id != 2));
    }

    #[tokio::test]
    async fn test_visible_rows_follow_search_term() {
        let mut app = test_app().await;
        app.process_sync_result(SyncResult::Loaded(sample_snapshot()));

        app.search_query = "LUIS".to_string();
        let visible: Vec<i64> = app.visible_citas().iter().map(|c| c.id).collect();
        assert_eq!(visible, vec![2]);

        // Search over email too
        app.search_query = "marta@".to_string();
        let visible: Vec<i64> = app.visible_citas().iter().map(|c| c.id).collect();
        assert_eq!(visible, vec![3]);

        // Phone digits (only even ids carry a phone here)
        app.search_query = "600111222".to_string();
        let visible: Vec<i64> = app.visible_citas().iter().map(|c| c.id).collect();
        assert_eq!(visible, vec![2]);

        app.search_query.clear();
        assert_eq!(app.visible_citas().len(), 3);
    }

    #[tokio::test]
    async fn test_export_with_empty_snapshot_warns_once() {
        let mut app = test_app().await;
        assert!(app.citas.is_empty());

        app.dispatch(Action::Export);

        assert_eq!(app.state, AppState::ShowingExportWarning);
        // No status message: the warning overlay is the single surfaced signal
        assert!(app.status_message.is_none());
    }

    #[tokio::test]
    async fn test_clear_filters_resets_everything() {
        let mut app = test_app().await;
        app.filter_date = "2026-03-01".to_string();
        app.filter_status = Some(CitaStatus::Confirmed);
        app.search_query = "ana".to_string();

        app.dispatch(Action::ClearFilters);

        assert!(app.filter_date.is_empty());
        assert!(app.filter_status.is_none());
        assert!(app.search_query.is_empty());
        assert!(app.current_filter().is_empty());
    }

    #[tokio::test]
    async fn test_current_filter_trims_date_input() {
        let mut app = test_app().await;
        app.filter_date = "  2026-03-01  ".to_string();
        app.filter_status = Some(CitaStatus::Pending);

        let filter = app.current_filter();
        assert_eq!(filter.date.as_deref(), Some("2026-03-01"));
        assert_eq!(filter.status, Some(CitaStatus::Pending));
    }

    #[tokio::test]
    async fn test_change_feed_event_schedules_reload() {
        let mut app = test_app().await;
        let (tx, rx) = mpsc::channel(4);
        app.changes_rx = Some(rx);

        tx.send(()).await.unwrap();
        tx.send(()).await.unwrap();
        app.drain_change_feed();

        // Many notifications collapse into one pending reload
        assert!(app.needs_reload);
    }

    #[tokio::test]
    async fn test_selection_clamped_after_shrinking_load() {
        let mut app = test_app().await;
        app.process_sync_result(SyncResult::Loaded(sample_snapshot()));
        app.selection = 2;

        app.process_sync_result(SyncResult::Loaded(vec![cita(
            1,
            "Ana",
            "2026-03-01",
            None,
        )]));

        assert_eq!(app.selection, 0);
    }

    #[tokio::test]
    async fn test_install_flow_hides_affordance() {
        let mut app = test_app().await;
        app.install.on_prompt_available();
        assert!(app.install.trigger_visible());

        app.request_install();
        assert_eq!(app.state, AppState::ConfirmingInstall);
        // Prompt consumed on replay
        assert!(!app.install.trigger_visible());

        app.process_sync_result(SyncResult::Installed);
        assert!(app.install.is_standalone());
        assert!(!app.install.trigger_visible());
    }

    #[tokio::test]
    async fn test_signed_out_returns_to_login() {
        let mut app = test_app().await;
        app.process_sync_result(SyncResult::Loaded(sample_snapshot()));

        app.process_sync_result(SyncResult::SignedOut);

        assert_eq!(app.state, AppState::LoggingIn);
        assert!(app.citas.is_empty());
        assert_eq!(app.stats, Stats::default());
    }
}
