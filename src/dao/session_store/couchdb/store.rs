use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use reqwest::{Client, Method, StatusCode, Url};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::dao::{
    models::SESSIONS_KEY,
    session_store::{KeyPath, SessionStore, Snapshot, Subscription, tree},
    storage::{StorageError, StorageResult},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{ChangesResponse, CouchSessionDocument, DatabaseInfo, seq_param, session_doc_id},
};

/// Attempts made before a write gives up on revision conflicts.
const MAX_WRITE_ATTEMPTS: u32 = 5;
/// Server-side wait of one `_changes` long-poll request, in milliseconds.
const LONGPOLL_TIMEOUT_MS: u64 = 55_000;
/// Pause before polling again after a failed `_changes` request.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Session store keeping one CouchDB document per session.
///
/// Writes are read-modify-write cycles on the session document retried on `409 Conflict`,
/// which yields last-writer-wins per node. Subscriptions long-poll the `_changes` feed filtered
/// on the session document.
#[derive(Clone)]
pub struct CouchSessionStore {
    client: Client,
    database_url: Arc<Url>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

/// Location of a key path inside the session documents.
#[derive(Debug, PartialEq)]
struct DocTarget {
    doc_id: String,
    rest: Vec<String>,
}

impl DocTarget {
    fn resolve(path: &KeyPath) -> StorageResult<Self> {
        match path.segments() {
            [root, session_id, rest @ ..] if root == SESSIONS_KEY => Ok(Self {
                doc_id: session_doc_id(session_id),
                rest: rest.to_vec(),
            }),
            _ => Err(StorageError::invalid_path(
                path.to_string(),
                "CouchDB store only addresses nodes inside a session",
            )),
        }
    }
}

enum WriteOutcome {
    Written,
    Conflict,
}

impl CouchSessionStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let store = Self::new(config)?;
        store.ensure_database().await?;
        Ok(store)
    }

    /// Build the client and resolve the database URL without touching the network.
    fn new(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let database_url = database_url(&config.base_url, &config.database)?;
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        Ok(Self {
            client,
            database_url: Arc::new(database_url),
            database,
            auth,
        })
    }

    /// URL of one endpoint below the database; `segment` is percent-encoded as a single path
    /// segment.
    fn endpoint_url(&self, segment: &str) -> Url {
        let mut url = (*self.database_url).clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(segment);
        }
        url
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, segment: &str) -> reqwest::RequestBuilder {
        self.authorized(self.client.request(method, self.endpoint_url(segment)))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = (*self.database_url).clone();

        let response = self
            .authorized(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorized(self.client.put(url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn database_info(&self) -> CouchResult<DatabaseInfo> {
        let url = self.database_url.to_string();
        let response = self
            .authorized(self.client.get((*self.database_url).clone()))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: url,
                status: response.status(),
            });
        }

        response
            .json::<DatabaseInfo>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse { path: url, source })
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<WriteOutcome>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Ok(WriteOutcome::Conflict),
            status if status.is_success() => Ok(WriteOutcome::Written),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn delete_document(&self, doc_id: &str, rev: &str) -> CouchResult<WriteOutcome> {
        let response = self
            .request(Method::DELETE, doc_id)
            .query(&[("rev", rev)])
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Ok(WriteOutcome::Conflict),
            StatusCode::NOT_FOUND => Ok(WriteOutcome::Written),
            status if status.is_success() => Ok(WriteOutcome::Written),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn read_target(&self, target: &DocTarget) -> CouchResult<Snapshot> {
        let Some(doc) = self
            .get_document::<CouchSessionDocument>(&target.doc_id)
            .await?
        else {
            return Ok(None);
        };

        let root = Value::Object(doc.into_body());
        Ok(tree::get_segments(&root, &target.rest).cloned())
    }

    /// Apply all writes addressed to one session document, retrying on revision conflicts.
    async fn write_document(
        &self,
        doc_id: &str,
        writes: &[(Vec<String>, Value)],
    ) -> CouchResult<()> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let (rev, body) = match self.get_document::<CouchSessionDocument>(doc_id).await? {
                Some(doc) => (doc.rev.clone(), doc.into_body()),
                None => (None, Map::new()),
            };

            let mut root = Value::Object(body);
            for (segments, value) in writes {
                tree::write(&mut root, segments, value.clone());
            }
            let Value::Object(body) = root else {
                return Err(CouchDaoError::NonObjectSession {
                    doc_id: doc_id.to_string(),
                });
            };

            let outcome = match (body.is_empty(), rev) {
                (true, None) => return Ok(()),
                (true, Some(rev)) => self.delete_document(doc_id, &rev).await?,
                (false, rev) => {
                    let document = CouchSessionDocument {
                        id: doc_id.to_string(),
                        rev,
                        body,
                    };
                    self.put_document(doc_id, &document).await?
                }
            };

            match outcome {
                WriteOutcome::Written => return Ok(()),
                WriteOutcome::Conflict => {
                    debug!(doc_id, attempt, "revision conflict; retrying write");
                }
            }
        }

        Err(CouchDaoError::WriteConflict {
            doc_id: doc_id.to_string(),
            attempts: MAX_WRITE_ATTEMPTS,
        })
    }

    /// Block until the document changes after `since` or the server-side timeout elapses.
    async fn wait_for_change(&self, doc_id: &str, since: &Value) -> CouchResult<ChangesResponse> {
        const CHANGES: &str = "_changes";
        let query = [
            ("feed", "longpoll".to_string()),
            ("filter", "_doc_ids".to_string()),
            ("since", seq_param(since)),
            ("timeout", LONGPOLL_TIMEOUT_MS.to_string()),
        ];

        let response = self
            .request(Method::POST, CHANGES)
            .query(&query)
            .json(&json!({ "doc_ids": [doc_id] }))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: CHANGES.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: CHANGES.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<ChangesResponse>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: CHANGES.to_string(),
                source,
            })
    }

    /// Poll the changes feed for `target` until every receiver of `sender` is gone.
    async fn forward_changes(
        self,
        path: KeyPath,
        target: DocTarget,
        mut since: Value,
        sender: watch::Sender<Snapshot>,
    ) {
        loop {
            let polled = tokio::select! {
                _ = sender.closed() => break,
                polled = self.wait_for_change(&target.doc_id, &since) => polled,
            };

            let changes = match polled {
                Ok(changes) => changes,
                Err(err) => {
                    warn!(%path, error = %err, "CouchDB changes feed failed; retrying");
                    tokio::select! {
                        _ = sender.closed() => break,
                        _ = tokio::time::sleep(POLL_RETRY_DELAY) => continue,
                    }
                }
            };
            since = changes.last_seq;
            if changes.results.is_empty() {
                continue;
            }

            match self.read_target(&target).await {
                Ok(next) => {
                    sender.send_if_modified(|current| {
                        if *current == next {
                            return false;
                        }
                        *current = next;
                        true
                    });
                }
                Err(err) => warn!(%path, error = %err, "failed to refresh subscribed node"),
            }
        }

        debug!(%path, "CouchDB subscription closed");
    }
}

/// Parse `base_url` and append `database` as an encoded path segment, keeping any path prefix.
fn database_url(base_url: &str, database: &str) -> CouchResult<Url> {
    let invalid = |reason: String| CouchDaoError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason,
    };

    let mut url =
        Url::parse(base_url.trim_end_matches('/')).map_err(|err| invalid(err.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| invalid("URL cannot carry a path".to_string()))?
        .pop_if_empty()
        .push(database);
    Ok(url)
}

impl SessionStore for CouchSessionStore {
    fn read(&self, path: KeyPath) -> BoxFuture<'static, StorageResult<Snapshot>> {
        let store = self.clone();
        Box::pin(async move {
            let target = DocTarget::resolve(&path)?;
            store.read_target(&target).await.map_err(Into::into)
        })
    }

    fn set(&self, path: KeyPath, value: Value) -> BoxFuture<'static, StorageResult<()>> {
        self.update_many(vec![(path, value)])
    }

    fn update_many(&self, writes: Vec<(KeyPath, Value)>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut by_document: IndexMap<String, Vec<(Vec<String>, Value)>> = IndexMap::new();
            for (path, value) in writes {
                let target = DocTarget::resolve(&path)?;
                by_document
                    .entry(target.doc_id)
                    .or_default()
                    .push((target.rest, value));
            }

            for (doc_id, writes) in &by_document {
                store.write_document(doc_id, writes).await?;
            }
            Ok(())
        })
    }

    fn subscribe(&self, path: KeyPath) -> BoxFuture<'static, StorageResult<Subscription>> {
        let store = self.clone();
        Box::pin(async move {
            let target = DocTarget::resolve(&path)?;
            let since = store.database_info().await?.update_seq;
            let current = store.read_target(&target).await?;

            let (sender, receiver) = watch::channel(current);
            tokio::spawn(store.forward_changes(path.clone(), target, since, sender));

            Ok(Subscription::new(path, receiver))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.database_info().await?;
            Ok(())
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
