use super::{
    models::{Cve, CveFilter, LogEntry, LogQuery, User},
    Store, StoreError, StoreResult, CVES_COLLECTION, LOGS_COLLECTION, USERS_COLLECTION,
};
use async_trait::async_trait;
use bson::{doc, Bson, DateTime as BsonDateTime, Document};
use futures::TryStreamExt;
use mongodb::{
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions},
    Client, Database, IndexModel,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::{
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: String,
    email: String,
    hashed_password: String,
    created_at: BsonDateTime,
}

impl From<&User> for UserDocument {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            hashed_password: user.hashed_password.clone(),
            created_at: BsonDateTime::from_chrono(user.created_at),
        }
    }
}

impl From<UserDocument> for User {
    fn from(doc: UserDocument) -> Self {
        Self {
            id: doc.id,
            email: doc.email,
            hashed_password: doc.hashed_password,
            created_at: doc.created_at.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LogDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: String,
    tool: String,
    input_data: String,
    result: Bson,
    timestamp: BsonDateTime,
}

impl TryFrom<&LogEntry> for LogDocument {
    type Error = StoreError;

    fn try_from(entry: &LogEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entry.id.clone(),
            user_id: entry.user_id.clone(),
            tool: entry.tool.clone(),
            input_data: entry.input_data.clone(),
            result: bson::to_bson(&entry.result)
                .map_err(|e| StoreError::Encoding(e.to_string()))?,
            timestamp: BsonDateTime::from_chrono(entry.timestamp),
        })
    }
}

impl From<LogDocument> for LogEntry {
    fn from(doc: LogDocument) -> Self {
        Self {
            id: doc.id,
            user_id: doc.user_id,
            tool: doc.tool,
            input_data: doc.input_data,
            result: doc.result.into_relaxed_extjson(),
            timestamp: doc.timestamp.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CveDocument {
    #[serde(rename = "_id")]
    id: String,
    description: String,
    severity: String,
    tags: Vec<String>,
    reference: String,
    published_date: BsonDateTime,
}

impl From<&Cve> for CveDocument {
    fn from(cve: &Cve) -> Self {
        Self {
            id: cve.id.clone(),
            description: cve.description.clone(),
            severity: cve.severity.clone(),
            tags: cve.tags.clone(),
            reference: cve.reference.clone(),
            published_date: BsonDateTime::from_chrono(cve.published_date),
        }
    }
}

impl From<CveDocument> for Cve {
    fn from(doc: CveDocument) -> Self {
        Self {
            id: doc.id,
            description: doc.description,
            severity: doc.severity,
            tags: doc.tags,
            reference: doc.reference,
            published_date: doc.published_date.to_chrono(),
        }
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

/// Errors caused by the request itself; reconnecting will not fix them.
fn is_logical(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(_)
            | ErrorKind::BsonDeserialization(_)
            | ErrorKind::BsonSerialization(_)
            | ErrorKind::InvalidArgument { .. }
    )
}

fn map_error(err: MongoError) -> StoreError {
    if is_duplicate_key(&err) {
        StoreError::Duplicate
    } else if is_logical(&err) {
        StoreError::Backend(err.to_string())
    } else {
        StoreError::Unavailable(err.to_string())
    }
}

/// Case-insensitive regex matching `term` literally.
fn literal_pattern(term: &str) -> String {
    regex::escape(term)
}

/// MongoDB-backed store.
///
/// The client is created on first use and cached. When a call fails for a
/// reason other than the request itself, the cached handle is dropped, a new
/// connection is made and the call is retried once.
pub struct MongoStore {
    uri: SecretString,
    database: String,
    timeout: Duration,
    handle: RwLock<Option<Connection>>,
    generations: AtomicU64,
}

/// A cached database handle tagged with the generation it was installed under.
struct Connection {
    generation: u64,
    db: Database,
}

impl MongoStore {
    #[must_use]
    pub fn new(uri: SecretString, database: String, timeout: Duration) -> Self {
        Self {
            uri,
            database,
            timeout,
            handle: RwLock::new(None),
            generations: AtomicU64::new(0),
        }
    }

    /// Connect (if not connected yet), ping the server and create indexes.
    ///
    /// # Errors
    /// Returns [`StoreError::Unavailable`] if the server cannot be reached.
    pub async fn connect(&self) -> StoreResult<Database> {
        let (db, _generation) = self.connection().await?;
        Ok(db)
    }

    async fn connection(&self) -> StoreResult<(Database, u64)> {
        if let Some(conn) = self.handle.read().await.as_ref() {
            return Ok((conn.db.clone(), conn.generation));
        }

        // No lock is held while dialing, so concurrent callers fail or succeed in parallel.
        let db = self.open().await.map_err(|err| {
            error!("Failed to connect to MongoDB: {err}");
            StoreError::Unavailable(err.to_string())
        })?;

        Ok(self.install(db).await)
    }

    /// Cache `db` unless another caller already installed a handle, which then wins.
    async fn install(&self, db: Database) -> (Database, u64) {
        let mut handle = self.handle.write().await;
        if let Some(conn) = handle.as_ref() {
            return (conn.db.clone(), conn.generation);
        }

        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;

        info!(database = %self.database, generation, "Connected to MongoDB");

        *handle = Some(Connection {
            generation,
            db: db.clone(),
        });

        (db, generation)
    }

    async fn open(&self) -> Result<Database, MongoError> {
        let mut options = ClientOptions::parse(self.uri.expose_secret()).await?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.server_selection_timeout = Some(self.timeout);
        options.connect_timeout = Some(self.timeout);

        let client = Client::with_options(options)?;
        let db = client.database(&self.database);

        db.run_command(doc! { "ping": 1 }).await?;

        init_indexes(&db).await?;

        Ok(db)
    }

    /// Drop the cached handle only if it is still the one from `generation`.
    async fn reset(&self, generation: u64) {
        let mut handle = self.handle.write().await;
        if handle
            .as_ref()
            .is_some_and(|conn| conn.generation == generation)
        {
            debug!(generation, "Dropping MongoDB handle");
            handle.take();
        }
    }

    /// Run `op` against the database, reconnecting and retrying once on failure.
    async fn run<T, F, Fut>(&self, op: F) -> StoreResult<T>
    where
        F: Fn(Database) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, MongoError>> + Send,
        T: Send,
    {
        let (db, generation) = self.connection().await?;

        match op(db).await {
            Ok(value) => Ok(value),
            Err(err) if is_logical(&err) => Err(map_error(err)),
            Err(err) => {
                warn!("MongoDB call failed, reconnecting: {err}");

                self.reset(generation).await;

                let (db, _generation) = self.connection().await?;

                op(db).await.map_err(|err| {
                    error!("MongoDB call failed after reconnect: {err}");
                    map_error(err)
                })
            }
        }
    }
}

async fn init_indexes(db: &Database) -> Result<(), MongoError> {
    let email_index = IndexModel::builder()
        .keys(doc! { "email": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();

    db.collection::<UserDocument>(USERS_COLLECTION)
        .create_index(email_index)
        .await?;

    let owner_index = IndexModel::builder()
        .keys(doc! { "user_id": 1, "timestamp": -1 })
        .build();

    db.collection::<LogDocument>(LOGS_COLLECTION)
        .create_index(owner_index)
        .await?;

    debug!("MongoDB indexes created");

    Ok(())
}

async fn find_logs(
    db: Database,
    filter: Document,
    offset: u64,
    limit: i64,
) -> Result<Vec<LogDocument>, MongoError> {
    let cursor = db
        .collection::<LogDocument>(LOGS_COLLECTION)
        .find(filter)
        .sort(doc! { "timestamp": -1 })
        .skip(offset)
        .limit(limit)
        .await?;
    cursor.try_collect().await
}

async fn find_cves(
    db: Database,
    query: Document,
    limit: i64,
) -> Result<Vec<CveDocument>, MongoError> {
    let cursor = db
        .collection::<CveDocument>(CVES_COLLECTION)
        .find(query)
        .limit(limit)
        .await?;
    cursor.try_collect().await
}

#[async_trait]
impl Store for MongoStore {
    fn kind(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> StoreResult<()> {
        self.run(|db| async move { db.run_command(doc! { "ping": 1 }).await.map(|_| ()) })
            .await
    }

    #[instrument(skip(self))]
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let filter = doc! { "email": email };
        let user = self
            .run(|db| {
                let filter = filter.clone();
                async move {
                    db.collection::<UserDocument>(USERS_COLLECTION)
                        .find_one(filter)
                        .await
                }
            })
            .await?;
        Ok(user.map(User::from))
    }

    #[instrument(skip(self))]
    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let filter = doc! { "_id": id };
        let user = self
            .run(|db| {
                let filter = filter.clone();
                async move {
                    db.collection::<UserDocument>(USERS_COLLECTION)
                        .find_one(filter)
                        .await
                }
            })
            .await?;
        Ok(user.map(User::from))
    }

    #[instrument(skip_all, fields(user_id = %user.id))]
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let document = UserDocument::from(user);
        self.run(|db| {
            let document = &document;
            async move {
                db.collection::<UserDocument>(USERS_COLLECTION)
                    .insert_one(document)
                    .await
                    .map(|_| ())
            }
        })
        .await
    }

    #[instrument(skip_all, fields(log_id = %entry.id))]
    async fn insert_log(&self, entry: &LogEntry) -> StoreResult<()> {
        let document = LogDocument::try_from(entry)?;
        self.run(|db| {
            let document = &document;
            async move {
                db.collection::<LogDocument>(LOGS_COLLECTION)
                    .insert_one(document)
                    .await
                    .map(|_| ())
            }
        })
        .await
    }

    #[instrument(skip(self))]
    async fn list_logs(&self, query: &LogQuery) -> StoreResult<Vec<LogEntry>> {
        let mut filter = doc! { "user_id": query.user_id.as_str() };
        if let Some(tool) = &query.tool {
            filter.insert("tool", tool.as_str());
        }
        let limit = i64::from(query.limit);
        let offset = query.offset;

        let logs = self
            .run(|db| find_logs(db, filter.clone(), offset, limit))
            .await?;

        Ok(logs.into_iter().map(LogEntry::from).collect())
    }

    #[instrument(skip(self))]
    async fn delete_log(&self, user_id: &str, log_id: &str) -> StoreResult<bool> {
        let filter = doc! { "_id": log_id, "user_id": user_id };
        let result = self
            .run(|db| {
                let filter = filter.clone();
                async move {
                    db.collection::<Document>(LOGS_COLLECTION)
                        .delete_one(filter)
                        .await
                }
            })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn count_cves(&self) -> StoreResult<u64> {
        self.run(|db| async move {
            db.collection::<Document>(CVES_COLLECTION)
                .count_documents(doc! {})
                .await
        })
        .await
    }

    #[instrument(skip_all, fields(cve_id = %cve.id))]
    async fn insert_cve(&self, cve: &Cve) -> StoreResult<()> {
        let document = CveDocument::from(cve);
        self.run(|db| {
            let document = &document;
            async move {
                db.collection::<CveDocument>(CVES_COLLECTION)
                    .insert_one(document)
                    .await
                    .map(|_| ())
            }
        })
        .await
    }

    #[instrument(skip(self))]
    async fn list_cves(&self, filter: &CveFilter) -> StoreResult<Vec<Cve>> {
        let mut query = Document::new();
        if let Some(severity) = &filter.severity {
            query.insert("severity", severity.as_str());
        }
        if let Some(tag) = &filter.tag {
            query.insert("tags", doc! { "$in": [tag.as_str()] });
        }
        let limit = i64::from(filter.limit);

        let cves = self
            .run(|db| find_cves(db, query.clone(), limit))
            .await?;

        Ok(cves.into_iter().map(Cve::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_cve(&self, id: &str) -> StoreResult<Option<Cve>> {
        let filter = doc! { "_id": id };
        let cve = self
            .run(|db| {
                let filter = filter.clone();
                async move {
                    db.collection::<CveDocument>(CVES_COLLECTION)
                        .find_one(filter)
                        .await
                }
            })
            .await?;
        Ok(cve.map(Cve::from))
    }

    #[instrument(skip(self))]
    async fn search_cves(&self, term: &str, limit: u32) -> StoreResult<Vec<Cve>> {
        let query = doc! {
            "$or": [
                { "description": { "$regex": literal_pattern(term), "$options": "i" } },
                { "tags": { "$in": [term.to_lowercase()] } },
            ]
        };
        let limit = i64::from(limit);

        let cves = self
            .run(|db| find_cves(db, query.clone(), limit))
            .await?;

        Ok(cves.into_iter().map(Cve::from).collect())
    }
}
