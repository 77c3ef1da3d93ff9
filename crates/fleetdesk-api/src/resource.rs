//! Resource endpoint families

use fleetdesk_core::Resource;
use serde_json::Value;
use std::sync::Arc;

use crate::{ApiClient, ListParams, Result};

/// Thin mapping of CRUD calls onto `/api/<endpoint>[/:id[/<sub>]]`
#[derive(Clone)]
pub struct ResourceApi {
    client: Arc<ApiClient>,
}

impl ResourceApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn collection_path(resource: Resource) -> String {
        resource.endpoint().to_string()
    }

    pub fn item_path(resource: Resource, id: &str) -> String {
        format!("{}/{}", resource.endpoint(), urlencoding::encode(id))
    }

    pub fn sub_path(resource: Resource, id: &str, sub: &str) -> String {
        format!(
            "{}/{}/{}",
            resource.endpoint(),
            urlencoding::encode(id),
            urlencoding::encode(sub)
        )
    }

    pub async fn list(&self, resource: Resource, params: &ListParams) -> Result<Value> {
        let query = params.to_query_string()?;
        self.client
            .get_json(&Self::collection_path(resource), Some(&query))
            .await
    }

    pub async fn get(&self, resource: Resource, id: &str) -> Result<Value> {
        self.client.get_json(&Self::item_path(resource, id), None).await
    }

    pub async fn sub_resource(
        &self,
        resource: Resource,
        id: &str,
        sub: &str,
        params: &ListParams,
    ) -> Result<Value> {
        let query = params.to_query_string()?;
        self.client
            .get_json(&Self::sub_path(resource, id, sub), Some(&query))
            .await
    }

    pub async fn create(&self, resource: Resource, body: &Value) -> Result<Value> {
        self.client
            .post_json(&Self::collection_path(resource), body)
            .await
    }

    pub async fn update(&self, resource: Resource, id: &str, body: &Value) -> Result<Value> {
        self.client.put_json(&Self::item_path(resource, id), body).await
    }

    pub async fn delete(&self, resource: Resource, id: &str) -> Result<Value> {
        self.client.delete(&Self::item_path(resource, id)).await
    }
}
