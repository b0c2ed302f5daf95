//! 资源处理器
//!
//! 每种资源 kind 一个处理器，提供 resolve（desired）/ observe（current）/ upsert /
//! actuation_in_progress / export 五个操作。处理器以类型化 spec 实现 [`ResourceHandler`]，
//! 注册表通过 [`DynResourceHandler`] 以 JSON spec 统一调度。

pub mod actuator;
pub mod registry;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::core::{KeelError, Result};
use crate::diff::{Diffable, ResourceDiff};
use crate::model::{Exportable, Resource, ResourceKind, SubmittedResource};
use crate::orchestration::Task;

pub use actuator::{check, CheckOutcome};
pub use registry::HandlerRegistry;

/// 单个区域（或其他分片键）的提交结果；各分片互不影响
#[derive(Debug)]
pub struct Submission {
    pub region: String,
    pub outcome: Result<Task>,
}

impl Submission {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// 类型化资源处理器
///
/// resolved 状态按分片键（如区域名）组织，diff 的受影响属性即分片键。
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    type Spec: Serialize + DeserializeOwned + Send + Sync + 'static;
    type Resolved: Diffable<Property = String> + Serialize + Send + Sync + 'static;

    fn supported_kind(&self) -> ResourceKind;

    /// 声明 → desired；不做任何外部变更
    async fn resolve(&self, resource: &Resource<Self::Spec>) -> Result<Self::Resolved>;

    /// 现网 → current；不存在的分片直接缺席
    async fn observe(&self, resource: &Resource<Self::Spec>) -> Result<Self::Resolved>;

    /// 为每个有差异的分片提交一个作业
    async fn upsert(
        &self,
        resource: &Resource<Self::Spec>,
        diff: &ResourceDiff<Self::Resolved>,
    ) -> Result<Vec<Submission>>;

    /// 是否已有与该资源关联、仍在进行中的编排任务
    async fn actuation_in_progress(&self, resource: &Resource<Self::Spec>) -> Result<bool>;

    /// 现网 → 最小声明
    async fn export(&self, exportable: &Exportable) -> Result<SubmittedResource<Self::Spec>>;
}

/// 以 JSON spec 调度的处理器（注册表中存放的形态）
#[async_trait]
pub trait DynResourceHandler: Send + Sync {
    fn supported_kind(&self) -> ResourceKind;

    async fn check(&self, resource: &Resource<Value>) -> Result<CheckOutcome>;

    async fn export(&self, exportable: &Exportable) -> Result<SubmittedResource<Value>>;
}

#[async_trait]
impl<H> DynResourceHandler for H
where
    H: ResourceHandler,
{
    fn supported_kind(&self) -> ResourceKind {
        ResourceHandler::supported_kind(self)
    }

    async fn check(&self, resource: &Resource<Value>) -> Result<CheckOutcome> {
        let typed = typed_resource::<H::Spec>(resource)?;
        actuator::check(self, &typed).await
    }

    async fn export(&self, exportable: &Exportable) -> Result<SubmittedResource<Value>> {
        let exported = ResourceHandler::export(self, exportable).await?;
        let spec = serde_json::to_value(&exported.spec)?;
        Ok(exported.map_spec(|_| spec))
    }
}

fn typed_resource<S: DeserializeOwned>(resource: &Resource<Value>) -> Result<Resource<S>> {
    let spec = serde_json::from_value(resource.spec.clone())
        .map_err(|e| KeelError::InvalidSpec(format!("{}: {e}", resource.id())))?;
    Ok(resource.clone().map_spec(|_| spec))
}
