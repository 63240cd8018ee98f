//! Application state management for uimscache.
//!
//! This module contains the core `App` struct that owns the storage
//! handle, the navigation history, the tab selection, the dashboard data
//! and the channel on which fetched data arrives.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use uimscache_core::api::{ApiClient, ApiError, Credentials};
use uimscache_core::auth::{CredentialStore, Session};
use uimscache_core::cache::CacheStamp;
use uimscache_core::config::Config;
use uimscache_core::fetch::HttpFetcher;
use uimscache_core::models::{parse_attendance, parse_timetable, AttendanceRecord, TimetableEntry};
use uimscache_core::storage::{FileStore, KeyValueStore};
use uimscache_core::{
    Activation, Dashboard, DashboardUpdate, FetchCollaborator, History, Navigation, Route,
    StateSetters, Tab, TabNav,
};

// ============================================================================
// Constants
// ============================================================================

/// Maximum length for UID input.
/// UIMS UIDs look like "20BCS1234"; 20 chars leaves room for staff IDs.
const MAX_UID_LENGTH: usize = 20;

/// Maximum length for password input.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Number of items to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

/// Attendance percentage UIMS requires for exam eligibility.
pub const ELIGIBILITY_THRESHOLD: f64 = 75.0;

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    SigningIn,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// Sign-in form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Uid,
    Password,
    Button,
}

impl LoginFocus {
    pub fn next(&self) -> Self {
        match self {
            LoginFocus::Uid => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::Button,
            LoginFocus::Button => LoginFocus::Uid,
        }
    }
}

// ============================================================================
// Fetch collaborator
// ============================================================================

/// Looks up the signed-in UID and its keychain password only when a fetch
/// is actually needed, then hands off to `HttpFetcher`.
struct KeychainFetcher {
    api: ApiClient,
    store: Arc<dyn KeyValueStore>,
}

impl FetchCollaborator for KeychainFetcher {
    fn fetch(&self, setters: StateSetters) {
        let uid = match Session::uid(self.store.as_ref()) {
            Ok(Some(uid)) => uid,
            Ok(None) => {
                setters.fail("Not signed in");
                return;
            }
            Err(e) => {
                error!(error = %e, "Failed to read session");
                setters.fail("Could not read local storage");
                return;
            }
        };

        let credentials = match CredentialStore::load(&uid) {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(error = %e, "No stored password");
                setters.fail("Stored password not found - press [l] and sign in again");
                return;
            }
        };

        HttpFetcher::new(self.api.clone(), credentials, Arc::clone(&self.store)).fetch(setters);
    }
}

/// Stands in for the fetcher while a fetch is already running.
struct InFlight;

impl FetchCollaborator for InFlight {
    fn fetch(&self, _setters: StateSetters) {
        debug!("Fetch already in flight");
    }
}

// ============================================================================
// Main Application Struct
// ============================================================================

/// Main application state container
pub struct App {
    // Core services
    pub config: Config,
    store: Arc<dyn KeyValueStore>,
    api: ApiClient,
    dashboard: Dashboard,

    // Navigation
    history: History,
    tabs: TabNav,

    // UI State
    pub state: AppState,

    // Sign-in form state
    pub login_uid: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // Selection indices
    pub attendance_selection: usize,
    pub timetable_selection: usize,

    // Dashboard data
    pub attendance: Vec<AttendanceRecord>,
    pub full_attendance: Vec<AttendanceRecord>,
    pub timetable: Vec<TimetableEntry>,

    // Background fetch channel
    setters: StateSetters,
    updates_rx: mpsc::UnboundedReceiver<DashboardUpdate>,
    pub fetching: bool,

    // Status message
    pub status_message: Option<String>,

    // Cache age for status bar
    pub cache_stamp: Option<CacheStamp>,
}

impl App {
    /// Create a new application instance backed by the on-disk store
    pub fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let cache_dir = config
            .cache_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("./cache"));
        debug!(?cache_dir, "Cache directory configured");

        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&cache_dir)?);
        let api = ApiClient::new(config.api_base_url())?;
        debug!(api = api.base_url(), "API client configured");

        Ok(Self::with_store(config, store, api))
    }

    pub fn with_store(config: Config, store: Arc<dyn KeyValueStore>, api: ApiClient) -> Self {
        let (setters, updates_rx) = StateSetters::channel();

        let login_uid = std::env::var("UIMSCACHE_UID")
            .ok()
            .or_else(|| config.last_uid.clone())
            .unwrap_or_default();

        Self {
            config,
            store,
            api,
            dashboard: Dashboard::new(),

            history: History::new(Route::Root),
            tabs: TabNav::new(),

            state: AppState::Normal,

            login_uid,
            login_password: String::new(),
            login_focus: LoginFocus::Uid,
            login_error: None,

            attendance_selection: 0,
            timetable_selection: 0,

            attendance: Vec::new(),
            full_attendance: Vec::new(),
            timetable: Vec::new(),

            setters,
            updates_rx,
            fetching: false,

            status_message: None,
            cache_stamp: None,
        }
    }

    fn fetcher(&self) -> KeychainFetcher {
        KeychainFetcher {
            api: self.api.clone(),
            store: Arc::clone(&self.store),
        }
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub fn current_route(&self) -> Route {
        self.history.current()
    }

    pub fn current_tab(&self) -> Tab {
        self.tabs.selected()
    }

    fn navigate(&mut self, nav: Navigation) {
        debug!(route = %nav.route, replace = nav.replace, "Navigating");
        self.history.apply(nav);
        self.tabs.sync(nav.route);

        if nav.route == Route::Root {
            self.start_login();
        } else if self.state == AppState::SigningIn {
            self.state = AppState::Normal;
        }
    }

    /// Select a tab by index (0 Attendance, 1 Timetable)
    pub fn select_tab(&mut self, index: usize) {
        if let Some(nav) = self.tabs.select(index) {
            self.navigate(nav);
        }
    }

    pub fn next_tab(&mut self) {
        self.select_tab(self.current_tab().next().index());
    }

    pub fn prev_tab(&mut self) {
        self.select_tab(self.current_tab().prev().index());
    }

    /// Go back in history. Returns false at the start of history, or when
    /// the previous entry is the sign-in screen and a session exists.
    pub fn back(&mut self) -> bool {
        let current = self.history.current();
        match self.history.back() {
            Some(Route::Root) if self.uid().is_some() => {
                self.history.apply(Navigation::push(current));
                false
            }
            Some(route) => {
                self.tabs.sync(route);
                if route == Route::Root {
                    self.start_login();
                }
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Activation
    // =========================================================================

    /// Activate the dashboard: session gate, then cache or fetch.
    pub fn activate(&mut self) -> Result<()> {
        let now_ms = Utc::now().timestamp_millis();
        // A fetch already running delivers to the same setters
        let fetcher: Box<dyn FetchCollaborator> = if self.fetching {
            Box::new(InFlight)
        } else {
            Box::new(self.fetcher())
        };
        let activation =
            self.dashboard
                .activate(self.store.as_ref(), now_ms, &self.setters, fetcher.as_ref())?;

        match activation {
            Activation::Redirect(nav) => {
                info!("Not signed in");
                self.navigate(nav);
            }
            Activation::Loaded(nav) => {
                info!("Dashboard loaded from cache");
                // Cached values were queued on the channel; apply them now
                self.check_background_tasks();
                self.navigate(nav);
            }
            Activation::Fetching(reason) => {
                info!(%reason, "Fetching dashboard data");
                self.fetching = true;
                self.status_message = Some("Fetching data...".to_string());
                // Stay on whichever dashboard tab is selected
                self.navigate(Navigation::push(Route::Dashboard(self.current_tab())));
            }
        }

        self.cache_stamp = CacheStamp::load(self.store.as_ref()).unwrap_or(None);
        Ok(())
    }

    /// Force a fetch regardless of cache freshness
    pub fn refresh(&mut self) {
        if self.fetching {
            return;
        }
        info!("Manual refresh requested");
        self.fetching = true;
        self.status_message = Some("Fetching data...".to_string());
        self.fetcher().fetch(self.setters.clone());
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Show the sign-in overlay
    pub fn start_login(&mut self) {
        self.state = AppState::SigningIn;
        self.login_focus = if self.login_uid.is_empty() {
            LoginFocus::Uid
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    /// Attempt sign-in with the credentials from the form
    pub async fn attempt_login(&mut self) -> Result<()> {
        let uid = self.login_uid.trim().to_string();
        let password = self.login_password.clone();

        if uid.is_empty() || password.is_empty() {
            self.login_error = Some("UID and password required".to_string());
            return Err(anyhow::anyhow!("UID and password required"));
        }

        self.login_error = None;
        let credentials = Credentials {
            uid: uid.clone(),
            password,
        };

        if let Err(e) = self.api.verify(&credentials).await {
            error!(error = %e, "Sign-in failed");
            self.login_error = Some(match e.downcast_ref::<ApiError>() {
                Some(api_error) => api_error.user_message(),
                None => format!("Sign-in failed: {}", e),
            });
            return Err(e);
        }

        if let Err(e) = CredentialStore::save(&credentials) {
            warn!(error = %e, "Failed to store credentials");
        }

        self.config.last_uid = Some(uid.clone());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        self.complete_sign_in(&uid)
    }

    /// Persist the session and open the dashboard. On failure the form
    /// stays up with the reason shown.
    fn complete_sign_in(&mut self, uid: &str) -> Result<()> {
        let result = Session::sign_in(self.store.as_ref(), uid)
            .map_err(anyhow::Error::from)
            .and_then(|()| {
                self.login_password.clear();
                self.state = AppState::Normal;
                info!("Sign-in successful");
                self.activate()
            });

        if let Err(ref e) = result {
            error!(error = %e, "Could not open dashboard after sign-in");
            self.state = AppState::SigningIn;
            self.login_error = Some(format!("Sign-in failed: {}", e));
        }
        result
    }

    /// Sign out: forget the session and cached data, back to root
    pub fn sign_out(&mut self) -> Result<()> {
        if let Ok(Some(uid)) = Session::uid(self.store.as_ref()) {
            if let Err(e) = CredentialStore::forget(&uid) {
                debug!(error = %e, "No credentials to delete");
            }
        }
        Session::sign_out(self.store.as_ref())?;

        self.attendance.clear();
        self.full_attendance.clear();
        self.timetable.clear();
        self.attendance_selection = 0;
        self.timetable_selection = 0;
        self.cache_stamp = None;
        self.status_message = None;

        // Anything still in flight for this session lands on the old channel
        let (setters, updates_rx) = StateSetters::channel();
        self.setters = setters;
        self.updates_rx = updates_rx;
        self.fetching = false;

        self.navigate(Navigation::replace(Route::Root));
        Ok(())
    }

    // =========================================================================
    // Background updates
    // =========================================================================

    /// Drain and apply everything the setters have queued
    pub fn check_background_tasks(&mut self) {
        while let Ok(update) = self.updates_rx.try_recv() {
            self.process_update(update);
        }
    }

    fn process_update(&mut self, update: DashboardUpdate) {
        match update {
            DashboardUpdate::Attendance(value) => {
                self.attendance = parse_attendance(&value);
                self.attendance_selection = self
                    .attendance_selection
                    .min(self.attendance.len().saturating_sub(1));
            }
            DashboardUpdate::FullAttendance(value) => {
                self.full_attendance = parse_attendance(&value);
            }
            DashboardUpdate::Timetable(value) => {
                self.timetable = parse_timetable(&value);
                self.timetable_selection = self
                    .timetable_selection
                    .min(self.timetable.len().saturating_sub(1));
            }
            DashboardUpdate::FetchComplete => {
                self.fetching = false;
                self.status_message = None;
                self.cache_stamp = CacheStamp::load(self.store.as_ref()).unwrap_or(None);
            }
            DashboardUpdate::Error(message) => {
                self.fetching = false;
                self.status_message = Some(message);
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn selected_record(&self) -> Option<&AttendanceRecord> {
        self.attendance.get(self.attendance_selection)
    }

    /// Full report for the selected course, matched by encrypt code, then
    /// code, then title.
    pub fn selected_full_record(&self) -> Option<&AttendanceRecord> {
        let selected = self.selected_record()?;
        let same = |a: &Option<String>, b: &Option<String>| a.is_some() && a == b;
        self.full_attendance
            .iter()
            .find(|r| same(&r.encrypt_code, &selected.encrypt_code))
            .or_else(|| self.full_attendance.iter().find(|r| same(&r.code, &selected.code)))
            .or_else(|| self.full_attendance.iter().find(|r| same(&r.title, &selected.title)))
    }

    pub fn uid(&self) -> Option<String> {
        Session::uid(self.store.as_ref()).ok().flatten()
    }

    pub fn list_len(&self) -> usize {
        match self.current_tab() {
            Tab::Attendance => self.attendance.len(),
            Tab::Timetable => self.timetable.len(),
        }
    }

    pub fn selection_mut(&mut self) -> &mut usize {
        match self.current_tab() {
            Tab::Attendance => &mut self.attendance_selection,
            Tab::Timetable => &mut self.timetable_selection,
        }
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a UID character should be accepted
pub fn can_add_uid_char(current_len: usize, c: char) -> bool {
    current_len < MAX_UID_LENGTH && c.is_ascii_alphanumeric()
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================
