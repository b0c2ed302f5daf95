//! 处理器注册表：按 (api version, kind) 查找处理器

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::{CheckOutcome, DynResourceHandler};
use crate::core::{KeelError, Result};
use crate::model::{Exportable, Resource, ResourceKind, SubmittedResource};

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<ResourceKind, Arc<dyn DynResourceHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: impl DynResourceHandler + 'static) {
        let kind = handler.supported_kind();
        self.handlers.insert(kind, Arc::new(handler));
    }

    pub fn get(&self, kind: &ResourceKind) -> Result<Arc<dyn DynResourceHandler>> {
        self.handlers
            .get(kind)
            .cloned()
            .ok_or_else(|| KeelError::UnsupportedKind {
                api_version: kind.api_version.clone(),
                kind: kind.kind.clone(),
            })
    }

    pub async fn check(&self, resource: &Resource<Value>) -> Result<CheckOutcome> {
        self.get(&resource.resource_kind())?.check(resource).await
    }

    pub async fn export(&self, exportable: &Exportable) -> Result<SubmittedResource<Value>> {
        self.get(&exportable.kind)?.export(exportable).await
    }

    pub fn supported_kinds(&self) -> Vec<ResourceKind> {
        let mut kinds: Vec<_> = self.handlers.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceMetadata;

    #[tokio::test]
    async fn test_unknown_kind_is_rejected() {
        let registry = HandlerRegistry::new();
        let resource = Resource {
            api_version: "example.com/v1".into(),
            kind: "widget".into(),
            metadata: ResourceMetadata {
                id: "widget:1".into(),
                application: "fnord".into(),
                service_account: "keel@spinnaker.io".into(),
            },
            spec: Value::Null,
        };
        let err = registry.check(&resource).await.unwrap_err();
        assert!(matches!(err, KeelError::UnsupportedKind { .. }));
        assert!(registry.supported_kinds().is_empty());
    }
}
