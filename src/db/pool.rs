//! Connection pool lifecycle management.
//!
//! A [`PoolRegistry`] owns at most one live `PgPool`. The pool is built on first
//! use and remembers the [`ContextToken`] of the execution context that built it:
//! pooled connections are registered with that context's I/O driver, so a request
//! arriving from any other context gets a freshly built pool instead.

use crate::config::PoolConfig;
use crate::error::{DbError, DbResult};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgPoolOptions};
use sqlx::{Executor, PgPool};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Identity of an execution context (one tokio runtime driven by the host).
///
/// The host creates one token per runtime and hands it to every operation that
/// runs on that runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextToken(u64);

impl ContextToken {
    /// Allocate a token distinct from every other token in this process.
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Default for ContextToken {
    fn default() -> Self {
        Self::new()
    }
}

/// A pool handed out by the registry.
///
/// Cloning is cheap; all clones share the same underlying connections.
#[derive(Debug, Clone)]
pub struct PoolHandle {
    pool: PgPool,
    generation: u64,
}

impl PoolHandle {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Build number of this pool; distinct pools never share one.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

#[derive(Debug)]
struct PoolSlot {
    handle: PoolHandle,
    owner: ContextToken,
}

/// Process-wide owner of the live connection pool.
#[derive(Debug)]
pub struct PoolRegistry {
    config: PoolConfig,
    slot: Mutex<Option<PoolSlot>>,
    constructed: AtomicU64,
}

impl PoolRegistry {
    /// Create an empty registry. No connection is opened until the first
    /// [`acquire_pool`](Self::acquire_pool).
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            slot: Mutex::new(None),
            constructed: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of pools built so far.
    pub fn constructed_count(&self) -> u64 {
        self.constructed.load(Ordering::SeqCst)
    }

    /// Return a ready pool for `context`, building one if none is recorded, the
    /// recorded one was built under another context, or it has been closed.
    ///
    /// The slot lock is held across the whole check-and-build sequence, so
    /// concurrent first callers observe a single construction.
    pub async fn acquire_pool(&self, context: &ContextToken) -> DbResult<PoolHandle> {
        let mut slot = self.slot.lock().await;

        if let Some(current) = slot.as_ref() {
            if current.owner == *context && !current.handle.is_closed() {
                return Ok(current.handle.clone());
            }
        }

        if let Some(stale) = slot.take() {
            if stale.owner != *context {
                // Its connections belong to another runtime; closing them from here
                // could stall, so the pool is only dropped.
                warn!(
                    generation = stale.handle.generation,
                    owner = stale.owner.id(),
                    context = context.id(),
                    "Discarding pool bound to another execution context"
                );
            } else {
                debug!(
                    generation = stale.handle.generation,
                    "Recorded pool is closed; rebuilding"
                );
            }
        }

        let handle = self.build_pool().await?;
        *slot = Some(PoolSlot {
            handle: handle.clone(),
            owner: *context,
        });
        Ok(handle)
    }

    /// Close the live pool, if any, and clear the recorded state.
    pub async fn release_pool(&self) {
        let stale = self.slot.lock().await.take();
        if let Some(stale) = stale {
            info!(
                generation = stale.handle.generation,
                "Closing PostgreSQL connection pool"
            );
            stale.handle.pool.close().await;
        }
    }

    /// Whether a pool is currently recorded.
    pub async fn is_initialized(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    async fn build_pool(&self) -> DbResult<PoolHandle> {
        let config = &self.config;
        config.validate()?;

        let generation = self.constructed.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            target_db = %config.display_target(),
            min_size = config.min_size,
            max_size = config.max_size,
            command_timeout_ms = config.command_timeout.as_millis() as u64,
            generation,
            "Creating PostgreSQL connection pool"
        );

        let options = PgPoolOptions::new()
            .min_connections(config.min_size)
            .max_connections(config.max_size)
            .acquire_timeout(config.acquire_timeout)
            .after_release(|conn, _meta| Box::pin(reset_session(conn)));
        let connect_options = connect_options(config);

        // A zero minimum means nothing needs to be opened up front.
        let pool = if config.min_size == 0 {
            options.connect_lazy_with(connect_options)
        } else {
            options.connect_with(connect_options).await.map_err(|e| {
                let err = DbError::from(e);
                match err {
                    DbError::Database { message, .. } => DbError::connection(
                        message,
                        "Check PGUSER, PGPASSWORD and PGDATABASE",
                    ),
                    other => other,
                }
            })?
        };

        Ok(PoolHandle { pool, generation })
    }
}

/// Return a released connection to a clean session: no open transaction and
/// every setting back at its connection-time value. A failed reset closes the
/// connection instead of pooling it.
async fn reset_session(conn: &mut PgConnection) -> Result<bool, sqlx::Error> {
    // Only warns when a transaction was left open; BEGIN is refused inside an
    // aborted one, which a plain ROLLBACK still ends.
    if conn.execute("BEGIN; ROLLBACK").await.is_err() {
        conn.execute("ROLLBACK").await?;
    }
    conn.execute("RESET ALL").await?;
    Ok(true)
}

/// Per-connection options: credentials, TLS and the statement timeout.
///
/// sqlx already starts every session with `DateStyle=ISO, MDY` and `TimeZone=UTC`,
/// which is the shape the value decoder expects temporal text in.
pub fn connect_options(config: &PoolConfig) -> PgConnectOptions {
    let timeout_ms = config.command_timeout.as_millis().max(1).to_string();
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database)
        .ssl_mode(config.ssl_mode)
        .application_name("postgres-mcp-server")
        .options([("statement_timeout", timeout_ms)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lazy_config() -> PoolConfig {
        PoolConfig {
            min_size: 0,
            ..PoolConfig::new("app", "pw", "shop")
        }
    }

    #[test]
    fn test_context_tokens_are_unique() {
        let a = ContextToken::new();
        let b = ContextToken::new();
        assert_ne!(a, b);
        assert!(b.id() > a.id());
    }

    #[tokio::test]
    async fn test_registry_starts_empty() {
        let registry = PoolRegistry::new(lazy_config());
        assert!(!registry.is_initialized().await);
        assert_eq!(registry.constructed_count(), 0);
    }

    #[tokio::test]
    async fn test_same_context_reuses_pool() {
        let registry = PoolRegistry::new(lazy_config());
        let ctx = ContextToken::new();
        let first = registry.acquire_pool(&ctx).await.unwrap();
        let second = registry.acquire_pool(&ctx).await.unwrap();
        assert_eq!(first.generation(), second.generation());
        assert_eq!(registry.constructed_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_sizing_fails_before_construction() {
        let registry = PoolRegistry::new(PoolConfig {
            min_size: 3,
            max_size: 1,
            ..lazy_config()
        });
        let err = registry
            .acquire_pool(&ContextToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Configuration { .. }));
        assert_eq!(registry.constructed_count(), 0);
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let registry = PoolRegistry::new(lazy_config());
        registry.release_pool().await;
        registry.acquire_pool(&ContextToken::new()).await.unwrap();
        registry.release_pool().await;
        registry.release_pool().await;
        assert!(!registry.is_initialized().await);
    }

    #[test]
    fn test_connect_options_apply_settings() {
        let options = connect_options(&lazy_config());
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_username(), "app");
        assert_eq!(options.get_database(), Some("shop"));
    }
}
