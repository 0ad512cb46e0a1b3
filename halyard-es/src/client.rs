//! Engine client
//!
//! [`EngineClient`] is the seam between Halyard's core and the search
//! engine. [`HttpEngineClient`] talks to a real cluster over HTTP; tests
//! substitute an in-memory implementation.

use crate::admin::{
    Acknowledged, CreateIndexRequest, GetAliasResponse, IndexDocumentResponse, ReindexRequest,
    ReindexResponse, UpdateAliasesRequest,
};
use crate::error::EngineError;
use crate::mapping::{GetMappingResponse, TypeMapping};
use crate::query::EsSearchRequest;
use crate::response::EsSearchResponse;
use crate::Result;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Operations Halyard issues against the engine
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// `PUT /{index}`
    async fn create_index(&self, index: &str, body: &CreateIndexRequest) -> Result<()>;

    /// `PUT /{index}/_settings`
    async fn put_settings(&self, index: &str, settings: &Value) -> Result<()>;

    /// Mapping of the single index `target` (index or alias) resolves to,
    /// with that index's concrete name
    async fn get_mapping(&self, target: &str) -> Result<(String, TypeMapping)>;

    /// Indices bound to `alias`; empty when the alias does not exist
    async fn get_alias(&self, alias: &str) -> Result<Vec<String>>;

    /// `POST /_aliases`, applied atomically by the engine
    async fn update_aliases(&self, request: &UpdateAliasesRequest) -> Result<()>;

    /// Index one document, returning its id
    async fn index_document(
        &self,
        target: &str,
        id: Option<&str>,
        document: &Value,
        refresh: bool,
    ) -> Result<String>;

    /// `POST /_reindex?wait_for_completion=true`
    async fn reindex(&self, request: &ReindexRequest) -> Result<ReindexResponse>;

    /// `POST /{target}/_search`
    async fn search(&self, target: &str, request: &EsSearchRequest) -> Result<EsSearchResponse>;
}

/// Connection settings for [`HttpEngineClient`]
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Accept self-signed certificates (development clusters only)
    pub accept_invalid_certs: bool,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Reindex blocks until the copy finishes, so it gets its own budget
    pub reindex_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            username: None,
            password: None,
            accept_invalid_certs: false,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            reindex_timeout: Duration::from_secs(3600),
        }
    }
}

/// Cluster banner from `GET /`
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cluster_name: String,
    pub version: ClusterVersion,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterVersion {
    pub number: String,
}

/// [`EngineClient`] over HTTP
pub struct HttpEngineClient {
    client: Client,
    config: HttpClientConfig,
    base_url: String,
}

impl HttpEngineClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| EngineError::Config(e.to_string()))?;

        if config.accept_invalid_certs {
            tracing::warn!(url = %config.url, "TLS certificate verification disabled");
        }

        let base_url = config.url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Cluster name and version, used as a connectivity check
    pub async fn info(&self) -> Result<ClusterInfo> {
        self.send("info", self.request(Method::GET, "")).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        self.request_url(method, url)
    }

    /// Base URL extended by `segments`, each percent-encoded as one segment
    fn segment_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| EngineError::Config(format!("invalid engine url: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| {
                EngineError::Config(format!("engine url {} cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request_url(&self, method: Method, url: impl reqwest::IntoUrl) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .timeout(self.config.request_timeout);

        match &self.config.username {
            Some(user) => builder.basic_auth(user, self.config.password.as_deref()),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<T> {
        let body = self.send_raw(operation, builder).await?;
        serde_json::from_str(&body).map_err(|e| EngineError::Decode(format!("{operation}: {e}")))
    }

    async fn send_raw(&self, operation: &'static str, builder: RequestBuilder) -> Result<String> {
        let response = builder
            .send()
            .await
            .map_err(|e| EngineError::transport(operation, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::transport(operation, e))?;

        if !status.is_success() {
            tracing::debug!(operation, status = status.as_u16(), "Engine returned error");
            return Err(EngineError::from_response(operation, status.as_u16(), &body));
        }

        Ok(body)
    }

    async fn expect_ack(&self, operation: &'static str, builder: RequestBuilder) -> Result<()> {
        let ack: Acknowledged = self.send(operation, builder).await?;
        if ack.acknowledged {
            Ok(())
        } else {
            Err(EngineError::Decode(format!("{operation} was not acknowledged")))
        }
    }
}

#[async_trait]
impl EngineClient for HttpEngineClient {
    async fn create_index(&self, index: &str, body: &CreateIndexRequest) -> Result<()> {
        tracing::debug!(index, "Creating index");
        self.expect_ack("create_index", self.request(Method::PUT, index).json(body))
            .await
    }

    async fn put_settings(&self, index: &str, settings: &Value) -> Result<()> {
        let path = format!("{index}/_settings");
        self.expect_ack("put_settings", self.request(Method::PUT, &path).json(settings))
            .await
    }

    async fn get_mapping(&self, target: &str) -> Result<(String, TypeMapping)> {
        let path = format!("{target}/_mapping");
        let response: GetMappingResponse = self
            .send("get_mapping", self.request(Method::GET, &path))
            .await?;
        response.into_single()
    }

    async fn get_alias(&self, alias: &str) -> Result<Vec<String>> {
        let path = format!("_alias/{alias}");
        match self
            .send::<GetAliasResponse>("get_alias", self.request(Method::GET, &path))
            .await
        {
            Ok(response) => Ok(response.into_indices()),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn update_aliases(&self, request: &UpdateAliasesRequest) -> Result<()> {
        self.expect_ack(
            "update_aliases",
            self.request(Method::POST, "_aliases").json(request),
        )
        .await
    }

    async fn index_document(
        &self,
        target: &str,
        id: Option<&str>,
        document: &Value,
        refresh: bool,
    ) -> Result<String> {
        // Ids are arbitrary strings; `#`, `?` and `/` must not leak into the URL
        let (method, mut url) = match id {
            Some(id) => (Method::PUT, self.segment_url(&[target, "_doc", id])?),
            None => (Method::POST, self.segment_url(&[target, "_doc"])?),
        };
        if refresh {
            url.query_pairs_mut().append_pair("refresh", "true");
        }

        let response: IndexDocumentResponse = self
            .send("index_document", self.request_url(method, url).json(document))
            .await?;
        Ok(response.id)
    }

    async fn reindex(&self, request: &ReindexRequest) -> Result<ReindexResponse> {
        tracing::debug!(
            source = %request.source.index,
            dest = %request.dest.index,
            "Starting reindex"
        );
        let builder = self
            .request(Method::POST, "_reindex?wait_for_completion=true")
            .timeout(self.config.reindex_timeout)
            .json(request);
        self.send("reindex", builder).await
    }

    async fn search(&self, target: &str, request: &EsSearchRequest) -> Result<EsSearchResponse> {
        let path = format!("{target}/_search");
        self.send("search", self.request(Method::POST, &path).json(request))
            .await
    }
}
