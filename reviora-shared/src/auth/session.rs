/// Admin session store with pluggable backends
///
/// Sessions are created at admin login and consulted by the admin auth
/// middleware on every request. The store sits behind the [`SessionStore`]
/// trait so the API can run on an in-process map in development and tests,
/// and on Redis when multiple instances share session state.
///
/// # Expiry
///
/// A session expires after a configurable period of inactivity (the
/// deployment default is eight hours). [`MemorySessionStore`] enforces the
/// window lazily on read plus a periodic [`SessionStore::sweep`];
/// [`RedisSessionStore`] delegates to key TTLs that are refreshed on every
/// [`SessionStore::touch`].
///
/// # Example
///
/// ```no_run
/// use reviora_shared::auth::session::{AdminSession, MemorySessionStore, SessionStore};
/// use std::time::Duration;
/// use uuid::Uuid;
///
/// # async fn example() -> anyhow::Result<()> {
/// let store = MemorySessionStore::new(Duration::from_secs(8 * 60 * 60));
///
/// let session = AdminSession::new(Uuid::new_v4());
/// let session_id = session.id;
/// store.insert(session).await?;
///
/// assert!(store.get(session_id).await?.is_some());
/// store.remove(session_id).await?;
/// assert!(store.get(session_id).await?.is_none());
/// # Ok(())
/// # }
/// ```
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Session store errors
///
/// The in-memory backend is infallible; these variants surface from the
/// Redis backend only.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Redis command or connection failure
    #[error("Session store error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Stored session payload could not be (de)serialized
    #[error("Session payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// A live administrator session
///
/// Created at login with `two_factor_verified = false`; the 2FA verification
/// endpoint flips the flag once a valid TOTP code is presented. Middleware
/// rejects sessions for 2FA-enabled accounts until then.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSession {
    /// Session ID, also embedded in the admin JWT
    pub id: Uuid,

    /// Admin user this session belongs to
    pub admin_user_id: Uuid,

    /// Whether the TOTP challenge has been completed
    pub two_factor_verified: bool,

    /// Client IP recorded at login
    pub ip_address: Option<String>,

    /// Client user agent recorded at login
    pub user_agent: Option<String>,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// Last request seen on this session
    pub last_activity: DateTime<Utc>,
}

impl AdminSession {
    /// Creates a fresh, unverified session for an admin user
    pub fn new(admin_user_id: Uuid) -> Self {
        let now = Utc::now();
        AdminSession {
            id: Uuid::new_v4(),
            admin_user_id,
            two_factor_verified: false,
            ip_address: None,
            user_agent: None,
            created_at: now,
            last_activity: now,
        }
    }

    /// Attaches client metadata captured from the login request
    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

/// Storage backend for admin sessions
///
/// Implementations must treat expired sessions as absent from `get`, so
/// callers never see a session that has outlived its inactivity window.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Looks up a live session by ID
    async fn get(&self, session_id: Uuid) -> Result<Option<AdminSession>, SessionError>;

    /// Stores a new session
    async fn insert(&self, session: AdminSession) -> Result<(), SessionError>;

    /// Deletes a session (logout)
    async fn remove(&self, session_id: Uuid) -> Result<(), SessionError>;

    /// Records activity on a session, extending its expiry window
    ///
    /// Unknown session IDs are ignored.
    async fn touch(&self, session_id: Uuid) -> Result<(), SessionError>;

    /// Marks the session's TOTP challenge as completed
    ///
    /// Unknown session IDs are ignored. Counts as activity.
    async fn set_two_factor_verified(&self, session_id: Uuid) -> Result<(), SessionError>;

    /// Drops expired sessions and returns how many were removed
    async fn sweep(&self) -> Result<usize, SessionError>;
}

/// In-process session store backed by a mutex-guarded map
///
/// Suitable for single-instance deployments and tests. Expired entries are
/// evicted on read and by `sweep`.
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<Uuid, AdminSession>>,
    idle_timeout: Duration,
}

impl MemorySessionStore {
    /// Creates an empty store with the given inactivity window
    pub fn new(idle_timeout: Duration) -> Self {
        MemorySessionStore {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Number of sessions currently held, including not-yet-swept expired ones
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Whether the store holds no sessions
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().unwrap().is_empty()
    }

    fn is_expired(&self, session: &AdminSession) -> bool {
        let idle = Utc::now().signed_duration_since(session.last_activity);
        idle.num_seconds() > self.idle_timeout.as_secs() as i64
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: Uuid) -> Result<Option<AdminSession>, SessionError> {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get(&session_id) {
            Some(session) if self.is_expired(session) => {
                sessions.remove(&session_id);
                Ok(None)
            }
            Some(session) => Ok(Some(session.clone())),
            None => Ok(None),
        }
    }

    async fn insert(&self, session: AdminSession) -> Result<(), SessionError> {
        self.sessions.lock().unwrap().insert(session.id, session);
        Ok(())
    }

    async fn remove(&self, session_id: Uuid) -> Result<(), SessionError> {
        self.sessions.lock().unwrap().remove(&session_id);
        Ok(())
    }

    async fn touch(&self, session_id: Uuid) -> Result<(), SessionError> {
        if let Some(session) = self.sessions.lock().unwrap().get_mut(&session_id) {
            session.last_activity = Utc::now();
        }
        Ok(())
    }

    async fn set_two_factor_verified(&self, session_id: Uuid) -> Result<(), SessionError> {
        if let Some(session) = self.sessions.lock().unwrap().get_mut(&session_id) {
            session.two_factor_verified = true;
            session.last_activity = Utc::now();
        }
        Ok(())
    }

    async fn sweep(&self) -> Result<usize, SessionError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, session| !self.is_expired(session));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!(removed, "Swept expired admin sessions");
        }
        Ok(removed)
    }
}

/// Redis-backed session store for multi-instance deployments
///
/// Sessions are stored as JSON under `admin_session:{id}` with a TTL equal
/// to the inactivity window. Every touch rewrites the payload and resets the
/// TTL, so expiry is handled entirely by Redis and `sweep` has nothing to do.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
    idle_timeout: Duration,
}

impl RedisSessionStore {
    /// Connects to Redis and returns a store using the given inactivity window
    ///
    /// The connection manager reconnects automatically on failure.
    pub async fn connect(url: &str, idle_timeout: Duration) -> Result<Self, SessionError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;

        tracing::info!("Redis session store connected");

        Ok(RedisSessionStore { conn, idle_timeout })
    }

    fn key(session_id: Uuid) -> String {
        format!("admin_session:{}", session_id)
    }

    fn ttl_secs(&self) -> u64 {
        self.idle_timeout.as_secs().max(1)
    }

    async fn write(&self, session: &AdminSession) -> Result<(), SessionError> {
        let payload = serde_json::to_string(session)?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(Self::key(session.id), payload, self.ttl_secs())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, session_id: Uuid) -> Result<Option<AdminSession>, SessionError> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(Self::key(session_id)).await?;
        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, session: AdminSession) -> Result<(), SessionError> {
        self.write(&session).await
    }

    async fn remove(&self, session_id: Uuid) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(Self::key(session_id)).await?;
        Ok(())
    }

    async fn touch(&self, session_id: Uuid) -> Result<(), SessionError> {
        if let Some(mut session) = self.get(session_id).await? {
            session.last_activity = Utc::now();
            self.write(&session).await?;
        }
        Ok(())
    }

    async fn set_two_factor_verified(&self, session_id: Uuid) -> Result<(), SessionError> {
        if let Some(mut session) = self.get(session_id).await? {
            session.two_factor_verified = true;
            session.last_activity = Utc::now();
            self.write(&session).await?;
        }
        Ok(())
    }

    async fn sweep(&self) -> Result<usize, SessionError> {
        // Key TTLs expire sessions; nothing to collect here
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemorySessionStore {
        MemorySessionStore::new(Duration::from_secs(8 * 60 * 60))
    }

    #[test]
    fn test_new_session_is_unverified() {
        let admin_id = Uuid::new_v4();
        let session = AdminSession::new(admin_id);

        assert_eq!(session.admin_user_id, admin_id);
        assert!(!session.two_factor_verified);
        assert!(session.ip_address.is_none());
        assert_eq!(session.created_at, session.last_activity);
    }

    #[test]
    fn test_with_client_records_metadata() {
        let session = AdminSession::new(Uuid::new_v4())
            .with_client(Some("203.0.113.7".to_string()), Some("curl/8.0".to_string()));

        assert_eq!(session.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(session.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn test_session_json_roundtrip() {
        let session = AdminSession::new(Uuid::new_v4())
            .with_client(Some("198.51.100.2".to_string()), None);

        let json = serde_json::to_string(&session).unwrap();
        let restored: AdminSession = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.id, session.id);
        assert_eq!(restored.admin_user_id, session.admin_user_id);
        assert_eq!(restored.ip_address, session.ip_address);
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = store();
        let session = AdminSession::new(Uuid::new_v4());
        let session_id = session.id;

        store.insert(session).await.unwrap();

        let found = store.get(session_id).await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().id, session_id);
    }

    #[tokio::test]
    async fn test_get_unknown_session() {
        let store = store();
        let found = store.get(Uuid::new_v4()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_remove_deletes_session() {
        let store = store();
        let session = AdminSession::new(Uuid::new_v4());
        let session_id = session.id;

        store.insert(session).await.unwrap();
        store.remove(session_id).await.unwrap();

        assert!(store.get(session_id).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_expired_session_is_absent() {
        let store = store();
        let mut session = AdminSession::new(Uuid::new_v4());
        session.last_activity = Utc::now() - chrono::Duration::hours(9);
        let session_id = session.id;

        store.insert(session).await.unwrap();

        assert!(store.get(session_id).await.unwrap().is_none());
        // Evicted on read
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_touch_extends_window() {
        let store = store();
        let mut session = AdminSession::new(Uuid::new_v4());
        session.last_activity = Utc::now() - chrono::Duration::hours(7);
        let session_id = session.id;

        store.insert(session).await.unwrap();
        store.touch(session_id).await.unwrap();

        let found = store.get(session_id).await.unwrap().unwrap();
        let idle = Utc::now().signed_duration_since(found.last_activity);
        assert!(idle.num_minutes() < 1);
    }

    #[tokio::test]
    async fn test_touch_unknown_session_is_noop() {
        let store = store();
        store.touch(Uuid::new_v4()).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_set_two_factor_verified() {
        let store = store();
        let session = AdminSession::new(Uuid::new_v4());
        let session_id = session.id;

        store.insert(session).await.unwrap();
        store.set_two_factor_verified(session_id).await.unwrap();

        let found = store.get(session_id).await.unwrap().unwrap();
        assert!(found.two_factor_verified);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let store = store();

        let fresh = AdminSession::new(Uuid::new_v4());
        let fresh_id = fresh.id;
        store.insert(fresh).await.unwrap();

        let mut stale = AdminSession::new(Uuid::new_v4());
        stale.last_activity = Utc::now() - chrono::Duration::hours(10);
        store.insert(stale).await.unwrap();

        let removed = store.sweep().await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(fresh_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweep_empty_store() {
        let store = store();
        assert_eq!(store.sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_redis_store_roundtrip() {
        let store = RedisSessionStore::connect(
            "redis://localhost:6379",
            Duration::from_secs(8 * 60 * 60),
        )
        .await
        .unwrap();

        let session = AdminSession::new(Uuid::new_v4());
        let session_id = session.id;

        store.insert(session).await.unwrap();
        let found = store.get(session_id).await.unwrap();
        assert!(found.is_some());

        store.set_two_factor_verified(session_id).await.unwrap();
        assert!(store.get(session_id).await.unwrap().unwrap().two_factor_verified);

        store.remove(session_id).await.unwrap();
        assert!(store.get(session_id).await.unwrap().is_none());
    }
}
