//! 资源信封：api version / kind / metadata + 类型化 spec

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::Moniker;

/// 处理器注册表的键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceKind {
    pub api_version: String,
    pub kind: String,
}

impl ResourceKind {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version, self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    pub id: String,
    pub application: String,
    pub service_account: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource<S> {
    pub api_version: String,
    pub kind: String,
    pub metadata: ResourceMetadata,
    pub spec: S,
}

impl<S> Resource<S> {
    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn application(&self) -> &str {
        &self.metadata.application
    }

    pub fn service_account(&self) -> &str {
        &self.metadata.service_account
    }

    pub fn resource_kind(&self) -> ResourceKind {
        ResourceKind::new(self.api_version.clone(), self.kind.clone())
    }

    /// 替换 spec，保留信封
    pub fn map_spec<T>(self, f: impl FnOnce(S) -> T) -> Resource<T> {
        Resource {
            api_version: self.api_version,
            kind: self.kind,
            metadata: self.metadata,
            spec: f(self.spec),
        }
    }
}

/// 导出请求：从现网状态反推声明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exportable {
    pub kind: ResourceKind,
    pub account: String,
    pub moniker: Moniker,
    pub regions: BTreeSet<String>,
    pub service_account: String,
}

/// 导出结果（尚未分配资源 id 的声明）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedResource<S> {
    pub api_version: String,
    pub kind: String,
    pub service_account: String,
    pub spec: S,
}

impl<S> SubmittedResource<S> {
    pub fn map_spec<T>(self, f: impl FnOnce(S) -> T) -> SubmittedResource<T> {
        SubmittedResource {
            api_version: self.api_version,
            kind: self.kind,
            service_account: self.service_account,
            spec: f(self.spec),
        }
    }
}
