//! Index lifecycle: creation behind aliases, document writes, settings

use crate::error::{Error, Result};
use crate::model::{Document, IndexIdentity};
use halyard_es::admin::CreateIndexRequest;
use halyard_es::mapping::TypeMapping;
use halyard_es::EngineClient;
use serde_json::Value;
use std::sync::Arc;

pub struct IndexLifecycle {
    engine: Arc<dyn EngineClient>,
}

impl IndexLifecycle {
    pub fn new(engine: Arc<dyn EngineClient>) -> Self {
        Self { engine }
    }

    /// Create the first physical index, named after the base, with both
    /// aliases bound in the same request
    pub async fn create_index(
        &self,
        identity: &IndexIdentity,
        mapping: Option<TypeMapping>,
    ) -> Result<()> {
        let mut body = CreateIndexRequest::default()
            .with_alias(&identity.read_alias)
            .with_alias(&identity.write_alias);
        body.mappings = mapping;

        self.engine.create_index(&identity.base_name, &body).await?;
        tracing::info!(
            index = %identity.base_name,
            read_alias = %identity.read_alias,
            write_alias = %identity.write_alias,
            "Created index"
        );
        Ok(())
    }

    /// Index documents one by one through the write alias, refreshing after
    /// each so they are immediately searchable. Stops at the first failure.
    pub async fn index_documents(
        &self,
        identity: &IndexIdentity,
        documents: &[Document],
    ) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(documents.len());
        for document in documents {
            let id = self
                .engine
                .index_document(
                    &identity.write_alias,
                    document.id.as_deref(),
                    &document.source,
                    true,
                )
                .await?;
            ids.push(id);
        }

        tracing::debug!(alias = %identity.write_alias, count = ids.len(), "Indexed documents");
        Ok(ids)
    }

    /// Apply dynamic index settings to the index behind the read alias
    pub async fn update_settings(&self, identity: &IndexIdentity, settings: &Value) -> Result<()> {
        if !settings.is_object() {
            return Err(Error::Validation(
                "index settings must be a JSON object".to_string(),
            ));
        }

        self.engine
            .put_settings(&identity.read_alias, settings)
            .await?;
        tracing::info!(alias = %identity.read_alias, "Updated index settings");
        Ok(())
    }
}
