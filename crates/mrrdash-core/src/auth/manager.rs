//! Session state machine.
//!
//! `SessionManager` owns the in-memory session, the persisted copy in a
//! `KeyValueStore`, and the one expiry timer. It moves between two states:
//!
//! - `Unauthenticated` -> `Authenticated` via `authenticate` (login/signup)
//!   or `restore` (a still-valid persisted session)
//! - `Authenticated` -> `Unauthenticated` via `logout` or the expiry timer
//!
//! Every status change is published to `subscribe()` receivers and to the
//! registered `SessionObserver`s.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::session::{AuthStatus, LogoutReason, SessionData};
use super::timer::ExpiryTimer;
use crate::api::{AuthError, AuthService, Credentials};
use crate::clock::{Clock, SystemClock};
use crate::store::KeyValueStore;

/// Something whose state is scoped to the signed-in user
pub trait SessionObserver: Send + Sync {
    fn on_authenticated(&self, _session: &SessionData) {}

    fn on_logout(&self, reason: LogoutReason);
}

struct SessionState {
    session: Option<SessionData>,
    did_auto_logout: bool,
    timer: ExpiryTimer,
}

impl SessionState {
    fn status(&self) -> AuthStatus {
        match self.session {
            Some(ref data) => AuthStatus::Authenticated {
                user_id: data.user_id.clone(),
                expires_at: data.expires_at,
            },
            None => AuthStatus::Unauthenticated {
                did_auto_logout: self.did_auto_logout,
            },
        }
    }
}

struct Shared {
    state: Mutex<SessionState>,
    service: Arc<dyn AuthService>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    observers: Vec<Arc<dyn SessionObserver>>,
    status_tx: watch::Sender<AuthStatus>,
    purge_stale_sessions: bool,
}

pub struct SessionManagerBuilder {
    service: Arc<dyn AuthService>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    observers: Vec<Arc<dyn SessionObserver>>,
    purge_stale_sessions: bool,
}

impl SessionManagerBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Remove expired keys from the store when `restore` finds them
    pub fn purge_stale_sessions(mut self, purge: bool) -> Self {
        self.purge_stale_sessions = purge;
        self
    }

    pub fn build(self) -> SessionManager {
        let (status_tx, _) = watch::channel(AuthStatus::default());
        SessionManager {
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState {
                    session: None,
                    did_auto_logout: false,
                    timer: ExpiryTimer::new(),
                }),
                service: self.service,
                store: self.store,
                clock: self.clock,
                observers: self.observers,
                status_tx,
                purge_stale_sessions: self.purge_stale_sessions,
            }),
        }
    }
}

/// Handle to the session. Clones share the same state.
#[derive(Clone)]
pub struct SessionManager {
    shared: Arc<Shared>,
}

impl SessionManager {
    pub fn new(service: Arc<dyn AuthService>, store: Arc<dyn KeyValueStore>) -> Self {
        Self::builder(service, store).build()
    }

    pub fn builder(
        service: Arc<dyn AuthService>,
        store: Arc<dyn KeyValueStore>,
    ) -> SessionManagerBuilder {
        SessionManagerBuilder {
            service,
            store,
            clock: Arc::new(SystemClock),
            observers: Vec::new(),
            purge_stale_sessions: false,
        }
    }

    // ===== Transitions =====

    /// Exchange credentials for a session.
    ///
    /// On any error the current session, the store and the timer are left as
    /// they were.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<AuthStatus, AuthError> {
        let grant = self.shared.service.authenticate(credentials).await?;
        let session = SessionData::new(grant.token, grant.user_id, grant.expires_at);

        let mut state = self.shared.state.lock().await;

        let remaining = session.remaining_millis(self.shared.clock.now_millis());
        if remaining < 0 {
            warn!(
                user_id = %session.user_id,
                expires_at = session.expires_at,
                "Service issued an already expired token"
            );
            return Err(AuthError::ExpiredGrant);
        }

        session.persist(self.shared.store.as_ref())?;
        self.arm_expiry(&mut state, remaining);

        info!(
            user_id = %session.user_id,
            mode = %credentials.mode,
            expires_in_secs = remaining / 1000,
            "Authenticated"
        );
        Ok(self.commit_authenticated(&mut state, session))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthStatus, AuthError> {
        self.authenticate(&Credentials::login(email, password)).await
    }

    pub async fn signup(&self, email: &str, password: &str) -> Result<AuthStatus, AuthError> {
        self.authenticate(&Credentials::signup(email, password)).await
    }

    /// Pick up a persisted session, e.g. at startup.
    ///
    /// Never fails: missing, unreadable or expired data means no session and
    /// the current status is returned unchanged.
    pub async fn restore(&self) -> AuthStatus {
        let mut state = self.shared.state.lock().await;
        let store = self.shared.store.as_ref();

        let loaded = match SessionData::load(store) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                None
            }
        };

        let Some(session) = loaded else {
            debug!("No persisted session");
            return state.status();
        };

        let remaining = session.remaining_millis(self.shared.clock.now_millis());
        if remaining < 0 {
            debug!(expires_at = session.expires_at, "Persisted session has expired");
            if self.shared.purge_stale_sessions {
                if let Err(e) = SessionData::clear(store) {
                    warn!(error = %e, "Failed to purge stale session");
                }
            }
            return state.status();
        }

        self.arm_expiry(&mut state, remaining);
        info!(user_id = %session.user_id, expires_in_secs = remaining / 1000, "Session restored");
        self.commit_authenticated(&mut state, session)
    }

    pub async fn logout(&self) -> AuthStatus {
        self.deauthenticate(LogoutReason::Explicit).await
    }

    pub async fn deauthenticate(&self, reason: LogoutReason) -> AuthStatus {
        let mut state = self.shared.state.lock().await;
        state.timer.cancel();
        self.deauthenticate_locked(&mut state, reason)
    }

    // ===== Queries =====

    /// Latest published status, without waiting on the state lock
    pub fn status(&self) -> AuthStatus {
        self.shared.status_tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.shared.status_tx.borrow().is_authenticated()
    }

    pub fn did_auto_logout(&self) -> bool {
        self.shared.status_tx.borrow().did_auto_logout()
    }

    pub fn user_id(&self) -> Option<String> {
        self.shared.status_tx.borrow().user_id().map(str::to_string)
    }

    pub async fn token(&self) -> Option<String> {
        let state = self.shared.state.lock().await;
        state.session.as_ref().map(|s| s.token.clone())
    }

    pub async fn session(&self) -> Option<SessionData> {
        self.shared.state.lock().await.session.clone()
    }

    pub async fn has_pending_expiry(&self) -> bool {
        self.shared.state.lock().await.timer.is_armed()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthStatus> {
        self.shared.status_tx.subscribe()
    }

    // ===== Internals =====

    fn arm_expiry(&self, state: &mut SessionState, remaining_millis: i64) {
        let weak = Arc::downgrade(&self.shared);
        let after = Duration::from_millis(remaining_millis.max(0) as u64);
        let generation = state.timer.arm(after, move |generation| async move {
            if let Some(shared) = weak.upgrade() {
                SessionManager { shared }.on_timer_fired(generation).await;
            }
        });
        debug!(generation, remaining_millis, "Armed expiry timer");
    }

    async fn on_timer_fired(&self, generation: u64) {
        let mut state = self.shared.state.lock().await;
        if !state.timer.claim(generation) {
            debug!(generation, "Ignoring superseded expiry timer");
            return;
        }
        self.deauthenticate_locked(&mut state, LogoutReason::Expiry);
    }

    fn commit_authenticated(&self, state: &mut SessionState, session: SessionData) -> AuthStatus {
        for observer in &self.shared.observers {
            observer.on_authenticated(&session);
        }
        state.session = Some(session);
        state.did_auto_logout = false;
        self.publish(state)
    }

    fn deauthenticate_locked(&self, state: &mut SessionState, reason: LogoutReason) -> AuthStatus {
        if let Err(e) = SessionData::clear(self.shared.store.as_ref()) {
            warn!(error = %e, "Failed to remove persisted session");
        }

        let previous = state.session.take();
        state.did_auto_logout = reason == LogoutReason::Expiry;

        for observer in &self.shared.observers {
            observer.on_logout(reason);
        }

        match (reason, previous) {
            (LogoutReason::Expiry, Some(session)) => {
                info!(user_id = %session.user_id, "Session expired, logged out")
            }
            (LogoutReason::Explicit, Some(session)) => {
                info!(user_id = %session.user_id, "Logged out")
            }
            (_, None) => debug!(?reason, "Logout without an active session"),
        }

        self.publish(state)
    }

    fn publish(&self, state: &SessionState) -> AuthStatus {
        let status = state.status();
        self.shared.status_tx.send_replace(status.clone());
        status
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use super::*;
    use crate::analytics::AnalyticsSelection;
    use crate::api::AuthGrant;
    use crate::auth::session::{EXPIRATION_KEY, TOKEN_KEY, USER_ID_KEY};
    use crate::clock::ManualClock;
    use crate::store::{MemoryStore, StoreError};

    /// 2023-11-14T22:13:20Z
    const NOW_SECS: i64 = 1_700_000_000;

    #[derive(Default)]
    struct StubService {
        responses: StdMutex<VecDeque<Result<AuthGrant, AuthError>>>,
    }

    impl StubService {
        fn grant(self: &Arc<Self>, token: &str, user_id: &str, expires_at: i64) -> Arc<Self> {
            self.responses.lock().unwrap().push_back(Ok(AuthGrant {
                token: token.to_string(),
                user_id: user_id.to_string(),
                expires_at,
            }));
            self.clone()
        }

        fn reject(self: &Arc<Self>, message: &str) -> Arc<Self> {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err(AuthError::Rejected(message.to_string())));
            self.clone()
        }
    }

    #[async_trait]
    impl AuthService for StubService {
        async fn authenticate(&self, _credentials: &Credentials) -> Result<AuthGrant, AuthError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AuthError::Rejected("no stubbed response".to_string())))
        }
    }

    struct Harness {
        service: Arc<StubService>,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        analytics: Arc<AnalyticsSelection>,
        manager: SessionManager,
    }

    fn harness() -> Harness {
        harness_with(false)
    }

    fn harness_with(purge_stale_sessions: bool) -> Harness {
        let service = Arc::new(StubService::default());
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(NOW_SECS * 1000));
        let analytics = Arc::new(AnalyticsSelection::new());
        let manager = SessionManager::builder(service.clone(), store.clone())
            .clock(clock.clone())
            .observer(analytics.clone())
            .purge_stale_sessions(purge_stale_sessions)
            .build();
        Harness {
            service,
            store,
            clock,
            analytics,
            manager,
        }
    }

    impl Harness {
        /// A second manager over the same store, as after a restart
        fn reloaded(&self) -> SessionManager {
            SessionManager::builder(self.service.clone(), self.store.clone())
                .clock(self.clock.clone())
                .build()
        }

        /// Move both the wall clock and tokio's paused clock forward
        async fn advance(&self, secs: i64) {
            self.clock.advance_secs(secs);
            tokio::time::advance(Duration::from_secs(secs as u64)).await;
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_unauthenticated() {
        let h = harness();
        assert_eq!(h.manager.status(), AuthStatus::default());
        assert!(!h.manager.has_pending_expiry().await);
        assert_eq!(h.manager.token().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_persists_and_arms_timer() {
        let h = harness();
        h.service.grant("t1", "u1", NOW_SECS + 60);

        let status = h.manager.login("a@b.c", "pw").await.unwrap();
        assert_eq!(
            status,
            AuthStatus::Authenticated {
                user_id: "u1".to_string(),
                expires_at: NOW_SECS + 60,
            }
        );
        assert!(h.manager.is_authenticated());
        assert_eq!(h.manager.token().await.as_deref(), Some("t1"));
        assert!(h.manager.has_pending_expiry().await);

        assert_eq!(h.store.get(TOKEN_KEY).unwrap().as_deref(), Some("t1"));
        assert_eq!(h.store.get(USER_ID_KEY).unwrap().as_deref(), Some("u1"));
        assert_eq!(
            h.store.get(EXPIRATION_KEY).unwrap(),
            Some((NOW_SECS + 60).to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_authenticate_then_restore_recovers_session() {
        let h = harness();
        h.service.grant("t1", "u1", NOW_SECS + 60);
        h.manager.signup("a@b.c", "pw").await.unwrap();

        let reloaded = h.reloaded();
        let status = reloaded.restore().await;
        assert_eq!(status.user_id(), Some("u1"));
        assert_eq!(reloaded.token().await.as_deref(), Some("t1"));
        assert!(reloaded.has_pending_expiry().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_grant_is_rejected_and_store_untouched() {
        let h = harness();
        h.service.grant("t1", "u1", NOW_SECS - 1);

        let err = h.manager.login("a@b.c", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::ExpiredGrant));
        assert!(!h.manager.is_authenticated());
        assert!(!h.manager.has_pending_expiry().await);
        assert!(h.store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_keeps_existing_session() {
        let h = harness();
        h.service
            .grant("t1", "u1", NOW_SECS + 60)
            .reject("Password is incorrect");

        h.manager.login("a@b.c", "pw").await.unwrap();
        let err = h.manager.login("a@b.c", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), "Password is incorrect");

        assert_eq!(h.manager.user_id().as_deref(), Some("u1"));
        assert!(h.manager.has_pending_expiry().await);
        assert_eq!(h.store.get(TOKEN_KEY).unwrap().as_deref(), Some("t1"));
    }

    /// Refuses writes to one key once `failing` is switched on
    struct FlakyStore {
        inner: MemoryStore,
        fail_key: &'static str,
        failing: AtomicBool,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if self.failing.load(Ordering::SeqCst) && key == self.fail_key {
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_on_relogin_keeps_persisted_session() {
        let service = Arc::new(StubService::default());
        service
            .grant("t1", "u1", NOW_SECS + 60)
            .grant("t2", "u2", NOW_SECS + 120);
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_key: USER_ID_KEY,
            failing: AtomicBool::new(false),
        });
        let clock = Arc::new(ManualClock::new(NOW_SECS * 1000));
        let manager = SessionManager::builder(service.clone(), store.clone())
            .clock(clock.clone())
            .build();

        manager.login("a@b.c", "pw").await.unwrap();
        store.failing.store(true, Ordering::SeqCst);

        let err = manager.login("d@e.f", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));
        assert_eq!(manager.user_id().as_deref(), Some("u1"));
        assert!(manager.has_pending_expiry().await);

        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("t1"));
        assert_eq!(store.get(USER_ID_KEY).unwrap().as_deref(), Some("u1"));
        assert_eq!(
            store.get(EXPIRATION_KEY).unwrap(),
            Some((NOW_SECS + 60).to_string())
        );

        let reloaded = SessionManager::builder(service, store).clock(clock).build();
        assert_eq!(reloaded.restore().await.user_id(), Some("u1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_first_save_leaves_store_empty() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_key: EXPIRATION_KEY,
            failing: AtomicBool::new(true),
        });
        let service = Arc::new(StubService::default());
        service.grant("t1", "u1", NOW_SECS + 60);
        let manager = SessionManager::builder(service, store.clone())
            .clock(Arc::new(ManualClock::new(NOW_SECS * 1000)))
            .build();

        assert!(manager.login("a@b.c", "pw").await.is_err());
        assert!(!manager.is_authenticated());
        assert!(!manager.has_pending_expiry().await);
        assert!(store.inner.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_triggers_auto_logout() {
        let h = harness();
        h.service.grant("t1", "u1", NOW_SECS + 5);
        h.manager.login("a@b.c", "pw").await.unwrap();
        h.analytics.select_file("revenue.csv");

        let mut rx = h.manager.subscribe();
        h.advance(5).await;
        rx.wait_for(|s| !s.is_authenticated()).await.unwrap();

        assert_eq!(
            h.manager.status(),
            AuthStatus::Unauthenticated {
                did_auto_logout: true
            }
        );
        assert!(h.manager.did_auto_logout());
        assert!(!h.manager.has_pending_expiry().await);
        assert!(h.store.is_empty());
        assert_eq!(h.analytics.selected_file(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_login_supersedes_first_timer() {
        let h = harness();
        h.service
            .grant("t1", "u1", NOW_SECS + 5)
            .grant("t2", "u2", NOW_SECS + 60);
        h.manager.login("a@b.c", "pw").await.unwrap();
        h.manager.login("d@e.f", "pw").await.unwrap();

        h.advance(10).await;
        settle().await;
        assert_eq!(h.manager.user_id().as_deref(), Some("u2"));
        assert!(h.manager.has_pending_expiry().await);

        let mut rx = h.manager.subscribe();
        h.advance(50).await;
        rx.wait_for(|s| !s.is_authenticated()).await.unwrap();
        assert!(h.manager.did_auto_logout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_is_ignored() {
        let h = harness();
        h.service
            .grant("t1", "u1", NOW_SECS + 5)
            .grant("t2", "u2", NOW_SECS + 60);
        h.manager.login("a@b.c", "pw").await.unwrap();
        let stale = h.manager.shared.state.lock().await.timer.generation();
        h.manager.login("d@e.f", "pw").await.unwrap();

        h.manager.on_timer_fired(stale).await;
        assert_eq!(h.manager.user_id().as_deref(), Some("u2"));
        assert!(!h.manager.did_auto_logout());
        assert!(h.manager.has_pending_expiry().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_then_restore_is_unauthenticated() {
        let h = harness();
        h.service.grant("t1", "u1", NOW_SECS + 60);
        h.manager.login("a@b.c", "pw").await.unwrap();
        h.analytics.select_file("revenue.csv");

        let status = h.manager.logout().await;
        assert_eq!(
            status,
            AuthStatus::Unauthenticated {
                did_auto_logout: false
            }
        );
        assert!(!h.manager.has_pending_expiry().await);
        assert_eq!(h.analytics.selected_file(), None);

        assert!(!h.manager.restore().await.is_authenticated());
        assert!(!h.reloaded().restore().await.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_expired_session() {
        let h = harness();
        SessionData::new("t1", "u1", NOW_SECS - 100)
            .persist(h.store.as_ref())
            .unwrap();

        let status = h.manager.restore().await;
        assert_eq!(status, AuthStatus::default());
        assert!(!h.manager.has_pending_expiry().await);
        // Stale entries stay unless purging is enabled
        assert_eq!(h.store.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_expired_session_with_purge() {
        let h = harness_with(true);
        SessionData::new("t1", "u1", NOW_SECS - 100)
            .persist(h.store.as_ref())
            .unwrap();

        assert!(!h.manager.restore().await.is_authenticated());
        assert!(h.store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_ignores_partial_or_garbage_data() {
        let h = harness();
        h.store.set(TOKEN_KEY, "t1").unwrap();
        h.store.set(EXPIRATION_KEY, (NOW_SECS + 60).to_string().as_str()).unwrap();
        assert!(!h.manager.restore().await.is_authenticated());

        h.store.set(USER_ID_KEY, "u1").unwrap();
        h.store.set(EXPIRATION_KEY, "tomorrow").unwrap();
        assert!(!h.manager.restore().await.is_authenticated());
        assert!(!h.manager.has_pending_expiry().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restored_session_expires() {
        let h = harness();
        SessionData::new("t1", "u1", NOW_SECS + 30)
            .persist(h.store.as_ref())
            .unwrap();
        assert!(h.manager.restore().await.is_authenticated());

        let mut rx = h.manager.subscribe();
        h.advance(30).await;
        rx.wait_for(|s| s.did_auto_logout()).await.unwrap();
        assert!(h.store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_login_resets_auto_logout_flag() {
        let h = harness();
        h.service
            .grant("t1", "u1", NOW_SECS + 1)
            .grant("t2", "u1", NOW_SECS + 3600);
        h.manager.login("a@b.c", "pw").await.unwrap();

        let mut rx = h.manager.subscribe();
        h.advance(1).await;
        rx.wait_for(|s| s.did_auto_logout()).await.unwrap();

        h.manager.login("a@b.c", "pw").await.unwrap();
        assert!(!h.manager.did_auto_logout());
        assert!(h.manager.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_expiring_right_now_is_accepted() {
        let h = harness();
        h.service.grant("t1", "u1", NOW_SECS);

        assert!(h.manager.login("a@b.c", "pw").await.unwrap().is_authenticated());
        let mut rx = h.manager.subscribe();
        rx.wait_for(|s| s.did_auto_logout()).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(crate::store::FileStore::in_dir(dir.path()));
        let service = Arc::new(StubService::default());
        let expires_at = chrono::Utc::now().timestamp() + 60;
        service.grant("t1", "u1", expires_at);

        let manager = SessionManager::new(service.clone(), store.clone());
        manager.login("a@b.c", "pw").await.unwrap();
        drop(manager);

        let reopened = Arc::new(crate::store::FileStore::in_dir(dir.path()));
        let restarted = SessionManager::new(service, reopened);
        let status = restarted.restore().await;
        assert_eq!(
            status,
            AuthStatus::Authenticated {
                user_id: "u1".to_string(),
                expires_at,
            }
        );
        assert_eq!(restarted.token().await.as_deref(), Some("t1"));

        restarted.logout().await;
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_login_against_http_service() {
        use serde_json::json;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let expires_at = chrono::Utc::now().timestamp() + 3600;
        Mock::given(method("POST"))
            .and(path("/api/v1/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "idToken": "t1",
                "localId": "u1",
                "expiresAt": expires_at.to_string(),
            })))
            .mount(&server)
            .await;

        let client = crate::api::AuthClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::new(Arc::new(client), store.clone());

        let status = manager.login("a@b.c", "pw").await.unwrap();
        assert_eq!(status.user_id(), Some("u1"));
        assert_eq!(store.get(EXPIRATION_KEY).unwrap(), Some(expires_at.to_string()));
    }
}
