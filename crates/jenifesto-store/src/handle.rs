//! SurrealDB-backed key-value store
//!
//! Manages the connection and implements [`KvStore`] on a single `kv` table
//! where the record id is the key and the value is kept as JSON text.
//!
//! Supports in-memory (`mem://`), embedded on-disk (`surrealkv://`) and
//! remote (`ws://`, `wss://`) connections through `engine::any`.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::Surreal;
use tracing::{debug, info, instrument};

use crate::error::StoreError;
use crate::storage_traits::{KvStore, StoreResult};

const KV_TABLE: &str = "kv";
const DEFAULT_URL: &str = "surrealkv://.jenifesto/db";

/// Credentials for authenticated (remote) connections
#[derive(Debug, Clone)]
pub struct StoreCredentials {
    pub username: String,
    pub password: String,
    /// Root user (true) or database user (false)
    pub is_root: bool,
}

/// Connection settings for [`SurrealKvStore`]
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Any SurrealDB URL accepted by `engine::any`
    pub url: String,
    /// Namespace (default: "jenifesto")
    pub namespace: String,
    /// Database name (default: "main")
    pub database: String,
    /// Optional sign-in credentials
    pub credentials: Option<StoreCredentials>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}

impl StoreConfig {
    /// Configuration for the given URL with default namespace and database
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            namespace: "jenifesto".to_string(),
            database: "main".to_string(),
            credentials: None,
        }
    }

    /// Embedded on-disk store rooted at `path`
    pub fn at_path(path: &Path) -> Self {
        Self::new(format!("surrealkv://{}", path.display()))
    }

    /// Set custom namespace
    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = ns.into();
        self
    }

    /// Set custom database
    pub fn with_database(mut self, db: impl Into<String>) -> Self {
        self.database = db.into();
        self
    }

    /// Attach sign-in credentials
    pub fn with_credentials(mut self, credentials: StoreCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - JENIFESTO_STORE_URL (optional, default: "surrealkv://.jenifesto/db")
    /// - JENIFESTO_STORE_NAMESPACE (optional, default: "jenifesto")
    /// - JENIFESTO_STORE_DATABASE (optional, default: "main")
    /// - JENIFESTO_STORE_USERNAME / JENIFESTO_STORE_PASSWORD (optional, both required to sign in)
    /// - JENIFESTO_STORE_ROOT (optional, default: "false")
    pub fn from_env() -> Self {
        let url = std::env::var("JENIFESTO_STORE_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        let namespace =
            std::env::var("JENIFESTO_STORE_NAMESPACE").unwrap_or_else(|_| "jenifesto".to_string());
        let database =
            std::env::var("JENIFESTO_STORE_DATABASE").unwrap_or_else(|_| "main".to_string());

        let credentials = match (
            std::env::var("JENIFESTO_STORE_USERNAME"),
            std::env::var("JENIFESTO_STORE_PASSWORD"),
        ) {
            (Ok(username), Ok(password)) => Some(StoreCredentials {
                username,
                password,
                is_root: std::env::var("JENIFESTO_STORE_ROOT")
                    .map(|v| v.to_lowercase() == "true")
                    .unwrap_or(false),
            }),
            _ => None,
        };

        Self {
            url,
            namespace,
            database,
            credentials,
        }
    }

    fn local_dir(&self) -> Option<&str> {
        self.url.strip_prefix("surrealkv://")
    }
}

/// Row shape of the `kv` table
#[derive(Debug, Clone, Serialize, Deserialize)]
struct KvRecord {
    payload: String,
    updated_at_ms: i64,
}

/// SurrealDB connection implementing [`KvStore`]
#[derive(Clone)]
pub struct SurrealKvStore {
    db: Surreal<Any>,
}

impl SurrealKvStore {
    /// Connect to an in-memory instance (lost when dropped)
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect(&StoreConfig::new("mem://")).await
    }

    /// Open (or create) an embedded on-disk store under `path`
    pub async fn open_path(path: &Path) -> StoreResult<Self> {
        Self::connect(&StoreConfig::at_path(path)).await
    }

    /// Connect using [`StoreConfig::from_env`]
    pub async fn from_env() -> StoreResult<Self> {
        Self::connect(&StoreConfig::from_env()).await
    }

    /// Connect with explicit configuration and initialize the schema
    #[instrument(skip(config), fields(url = %config.url, namespace = %config.namespace, database = %config.database))]
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        if let Some(dir) = config.local_dir() {
            std::fs::create_dir_all(dir).map_err(|e| {
                StoreError::Connection(format!("Failed to create store directory {}: {}", dir, e))
            })?;
        }

        let db = surrealdb::engine::any::connect(&config.url)
            .await
            .map_err(|e| {
                StoreError::Connection(format!("Failed to connect to {}: {}", config.url, e))
            })?;

        if let Some(creds) = &config.credentials {
            if creds.is_root {
                db.signin(Root {
                    username: &creds.username,
                    password: &creds.password,
                })
                .await
                .map_err(|e| StoreError::Connection(format!("Root auth failed: {e}")))?;
            } else {
                db.signin(Database {
                    namespace: &config.namespace,
                    database: &config.database,
                    username: &creds.username,
                    password: &creds.password,
                })
                .await
                .map_err(|e| StoreError::Connection(format!("DB auth failed: {e}")))?;
            }
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| {
                StoreError::Connection(format!("Failed to select namespace/database: {}", e))
            })?;

        let store = SurrealKvStore { db };
        store.init_schema().await?;

        info!("SurrealKvStore connected");
        Ok(store)
    }

    /// Initialize the `kv` table. Safe to call on an existing database.
    async fn init_schema(&self) -> StoreResult<()> {
        debug!("Initializing kv schema");

        let schema = r#"
            DEFINE TABLE IF NOT EXISTS kv SCHEMAFULL;
            DEFINE FIELD IF NOT EXISTS payload ON kv TYPE string;
            DEFINE FIELD IF NOT EXISTS updated_at_ms ON kv TYPE int;
        "#;

        self.db
            .query(schema)
            .await
            .map_err(|e| StoreError::SchemaSetup(e.to_string()))?
            .check()
            .map_err(|e| StoreError::SchemaSetup(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl KvStore for SurrealKvStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let record: Option<KvRecord> = self.db.select((KV_TABLE, key.to_string())).await?;

        match record {
            Some(row) => Ok(Some(serde_json::from_str(&row.payload)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let row = KvRecord {
            payload: serde_json::to_string(&value)?,
            updated_at_ms: Utc::now().timestamp_millis(),
        };

        let _stored: Option<KvRecord> = self
            .db
            .upsert((KV_TABLE, key.to_string()))
            .content(row)
            .await?;

        debug!("kv entry written");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, key: &str) -> StoreResult<()> {
        let _removed: Option<KvRecord> = self.db.delete((KV_TABLE, key.to_string())).await?;
        Ok(())
    }
}
