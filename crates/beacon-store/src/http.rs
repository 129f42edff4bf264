use crate::StoreError;
use beacon_config::StoreConfig;
use serde_json::{json, Value};

/// Client for the hosted schemaless document store: GROQ queries against
/// `/data/query/{dataset}`, mutations against `/data/mutate/{dataset}`.
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    http: reqwest::Client,
    query_url: String,
    mutate_url: String,
    token: Option<String>,
}

impl HttpDocumentStore {
    pub fn new(config: &StoreConfig) -> Self {
        let base = config.endpoint.clone().unwrap_or_else(|| {
            format!(
                "https://{}.api.sanity.io/v{}",
                config.project_id, config.api_version
            )
        });
        let base = base.trim_end_matches('/').to_string();

        Self {
            http: reqwest::Client::new(),
            query_url: format!("{base}/data/query/{}", config.dataset),
            mutate_url: format!("{base}/data/mutate/{}", config.dataset),
            token: config.token.clone(),
        }
    }

    /// Run one GROQ query; `params` become `$name` bindings, JSON-encoded
    /// the way the store expects them.
    pub async fn fetch(&self, query: &str, params: &[(&str, Value)]) -> Result<Value, StoreError> {
        let mut request = self.http.get(&self.query_url).query(&[("query", query)]);
        for (name, value) in params {
            request = request.query(&[(format!("${name}"), value.to_string())]);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(StoreError::Api(format!(
                "query failed with status {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await?;
        Ok(payload.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Create one document, returning it as stored.
    pub async fn create(&self, doc: Value) -> Result<Value, StoreError> {
        self.mutate(json!([{ "create": doc }])).await
    }

    /// Start a patch against one document id:
    /// `store.patch(id).set(fields).commit()`.
    pub fn patch(&self, id: &str) -> PatchBuilder<'_> {
        PatchBuilder {
            store: self,
            id: id.to_string(),
            set: Value::Null,
        }
    }

    async fn mutate(&self, mutations: Value) -> Result<Value, StoreError> {
        let mut request = self
            .http
            .post(&self.mutate_url)
            .query(&[("returnDocuments", "true")])
            .json(&json!({ "mutations": mutations }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(StoreError::Api(format!(
                "mutation failed with status {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await?;
        payload
            .get("results")
            .and_then(|results| results.as_array())
            .and_then(|results| results.first())
            .and_then(|entry| entry.get("document"))
            .cloned()
            .ok_or_else(|| StoreError::Api("mutation response missing document".to_string()))
    }
}

/// One pending patch mutation.
pub struct PatchBuilder<'a> {
    store: &'a HttpDocumentStore,
    id: String,
    set: Value,
}

impl PatchBuilder<'_> {
    pub fn set(mut self, fields: Value) -> Self {
        self.set = fields;
        self
    }

    pub async fn commit(self) -> Result<Value, StoreError> {
        self.store
            .mutate(json!([{ "patch": { "id": self.id, "set": self.set } }]))
            .await
    }
}
