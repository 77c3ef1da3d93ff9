//! Per-entity query and mutation operations

use fleetdesk_api::{ListParams, ResourceApi, with_retry};
use fleetdesk_core::{Entity, Resource};
use fleetdesk_observability::Metrics;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{Notification, Notifier, QueryCache, QueryError, QueryKey, QueryResult};

/// Fields a paginated list response may wrap its records in
const COLLECTION_FIELDS: [&str; 3] = ["results", "data", "items"];

/// Typed access to one resource family backed by the shared cache.
///
/// Reads go through [`QueryCache::fetch`], so concurrent readers of the same
/// key share one request. Mutations never retry and never touch the cache
/// when they fail.
pub struct ResourceQuery<T> {
    resource: Resource,
    api: ResourceApi,
    cache: QueryCache,
    notifier: Arc<dyn Notifier>,
    metrics: Option<Metrics>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for ResourceQuery<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource,
            api: self.api.clone(),
            cache: self.cache.clone(),
            notifier: Arc::clone(&self.notifier),
            metrics: self.metrics.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> ResourceQuery<T> {
    pub fn new(
        resource: Resource,
        api: ResourceApi,
        cache: QueryCache,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            resource,
            api,
            cache,
            notifier,
            metrics: None,
            _entity: PhantomData,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    fn list_key(&self, params: &ListParams) -> Result<QueryKey, QueryError> {
        Ok(QueryKey::list(self.resource, params.to_query_string()?))
    }

    /// Fetch a collection, filtered by `params`
    pub async fn list(&self, params: &ListParams) -> QueryResult<Vec<T>> {
        let key = match self.list_key(params) {
            Ok(key) => key,
            Err(e) => return QueryResult::error(e),
        };

        let api = self.api.clone();
        let resource = self.resource;
        let params = params.clone();
        let retry = self.cache.config().retry;
        let result = self
            .cache
            .fetch(key.clone(), move || async move {
                with_retry(retry, || api.list(resource, &params))
                    .await
                    .map_err(QueryError::from)
            })
            .await;

        self.finish(&key, result.and_then(|data| decode_collection(&data)))
    }

    /// What the cache currently holds for a list, without fetching
    pub fn peek_list(&self, params: &ListParams) -> QueryResult<Vec<T>> {
        let key = match self.list_key(params) {
            Ok(key) => key,
            Err(e) => return QueryResult::error(e),
        };
        let snapshot = self.cache.peek(&key);
        let data = match snapshot.data.as_deref().map(decode_collection::<T>).transpose() {
            Ok(data) => data,
            Err(e) => return QueryResult::error(e),
        };
        QueryResult {
            status: snapshot.status,
            data,
            error: snapshot.error,
        }
    }

    /// Fetch a single record.
    ///
    /// A missing or blank id disables the query: `Idle` is returned and no
    /// request is made.
    pub async fn get_by_id(&self, id: Option<&str>) -> QueryResult<T> {
        let Some(id) = enabled_id(id) else {
            return QueryResult::idle();
        };

        let key = QueryKey::detail(self.resource, id);
        let api = self.api.clone();
        let resource = self.resource;
        let owned_id = id.to_string();
        let retry = self.cache.config().retry;
        let result = self
            .cache
            .fetch(key.clone(), move || async move {
                with_retry(retry, || api.get(resource, &owned_id))
                    .await
                    .map_err(QueryError::from)
            })
            .await;

        self.finish(&key, result.and_then(|data| decode(&data)))
    }

    /// Fetch a nested collection such as `vehicles/:id/documents`; disabled
    /// like [`get_by_id`](Self::get_by_id) when the id is missing
    pub async fn sub_resource(
        &self,
        id: Option<&str>,
        name: &str,
        params: &ListParams,
    ) -> QueryResult<Value> {
        let Some(id) = enabled_id(id) else {
            return QueryResult::idle();
        };
        let query = match params.to_query_string() {
            Ok(query) => query,
            Err(e) => return QueryResult::error(e.into()),
        };

        let key = QueryKey::sub(self.resource, id, name, query);
        let api = self.api.clone();
        let resource = self.resource;
        let owned_id = id.to_string();
        let name = name.to_string();
        let params = params.clone();
        let retry = self.cache.config().retry;
        let result = self
            .cache
            .fetch(key.clone(), move || async move {
                with_retry(retry, || api.sub_resource(resource, &owned_id, &name, &params))
                    .await
                    .map_err(QueryError::from)
            })
            .await;

        self.finish(&key, result.map(|data| (*data).clone()))
    }

    fn finish<V>(&self, key: &QueryKey, result: Result<V, QueryError>) -> QueryResult<V> {
        if let Err(e) = &result {
            warn!("Failed to load {}: {}", key, e);
        }
        result.into()
    }

    /// Create a record; on success the new record is cached and every list
    /// of this resource is invalidated
    pub async fn create<P: Serialize>(&self, payload: &P) -> Result<T, QueryError> {
        let outcome = match encode(payload) {
            Ok(body) => self.api.create(self.resource, &body).await.map_err(QueryError::from),
            Err(e) => Err(e),
        };
        let value = match outcome {
            Ok(value) => value,
            Err(e) => return Err(self.failed("create", e)),
        };

        let decoded = decode::<T>(&value);
        if let Ok(record) = &decoded
            && let Some(id) = record.entity_id()
        {
            self.cache.set(QueryKey::detail(self.resource, id), value);
        }
        self.cache.invalidate_collections(self.resource);

        self.settle("create", "created", decoded)
    }

    /// Replace a record; on success the detail slot holds the returned record
    /// and every list of this resource is invalidated
    pub async fn update<P: Serialize>(&self, id: &str, payload: &P) -> Result<T, QueryError> {
        let Some(id) = enabled_id(Some(id)) else {
            warn!("Refusing to update {} without an id", self.resource);
            return Err(QueryError::MissingId);
        };

        let outcome = match encode(payload) {
            Ok(body) => self
                .api
                .update(self.resource, id, &body)
                .await
                .map_err(QueryError::from),
            Err(e) => Err(e),
        };
        let value = match outcome {
            Ok(value) => value,
            Err(e) => return Err(self.failed("update", e)),
        };

        let detail = QueryKey::detail(self.resource, id);
        let decoded = decode::<T>(&value);
        if decoded.is_ok() {
            self.cache.set(detail, value);
        } else {
            self.cache.invalidate(&detail);
        }
        self.cache.invalidate_collections(self.resource);

        self.settle("update", "updated", decoded)
    }

    /// Delete a record; on success its detail and sub-resource entries are
    /// evicted and every list of this resource is invalidated
    pub async fn delete(&self, id: &str) -> Result<(), QueryError> {
        let Some(id) = enabled_id(Some(id)) else {
            warn!("Refusing to delete {} without an id", self.resource);
            return Err(QueryError::MissingId);
        };

        if let Err(e) = self.api.delete(self.resource, id).await {
            return Err(self.failed("delete", e.into()));
        }

        let resource = self.resource;
        self.cache
            .remove_where(|k| k.resource == resource && k.record_id() == Some(id));
        self.cache.invalidate_collections(resource);

        self.settle("delete", "deleted", Ok(()))
    }

    fn failed(&self, kind: &str, error: QueryError) -> QueryError {
        warn!("Failed to {} {}: {}", kind, self.resource, error);
        self.record_mutation(kind, false);
        self.notifier.notify(Notification::error(error.user_message()));
        error
    }

    /// Report a mutation whose request succeeded and whose cache writes are done
    fn settle<V>(&self, kind: &str, past: &str, decoded: Result<V, QueryError>) -> Result<V, QueryError> {
        match decoded {
            Ok(value) => {
                debug!("{} {} succeeded", kind, self.resource);
                self.record_mutation(kind, true);
                self.notifier.notify(Notification::success(format!(
                    "{} {}",
                    self.resource.label(),
                    past
                )));
                Ok(value)
            }
            Err(e) => Err(self.failed(kind, e)),
        }
    }

    fn record_mutation(&self, kind: &str, success: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_mutation(self.resource.as_str(), kind, success);
        }
    }
}

/// `Some(id)` only for ids that can name a record
fn enabled_id(id: Option<&str>) -> Option<&str> {
    id.map(str::trim).filter(|id| !id.is_empty())
}

fn encode<P: Serialize>(payload: &P) -> Result<Value, QueryError> {
    Ok(serde_json::to_value(payload)?)
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, QueryError> {
    Ok(T::deserialize(value)?)
}

/// Accept a bare array or an object wrapping one in a known field
fn decode_collection<T: DeserializeOwned>(value: &Value) -> Result<Vec<T>, QueryError> {
    let items = match value {
        Value::Array(_) => value,
        Value::Object(map) => COLLECTION_FIELDS
            .iter()
            .find_map(|field| map.get(*field).filter(|v| v.is_array()))
            .ok_or_else(|| {
                QueryError::Decode("List response has no array of records".to_string())
            })?,
        other => {
            return Err(QueryError::Decode(format!(
                "Expected a list of records, got {}",
                other
            )));
        }
    };
    decode(items)
}
