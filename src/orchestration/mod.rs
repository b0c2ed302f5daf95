//! 编排层：作业模型、编排后端抽象、带关联 id 的任务提交
//!
//! 关联 id（correlation id）由资源 id 与区域确定性生成，后端据此识别「同一未收敛 diff 的重复提交」。

pub mod http;
pub mod job;
pub mod launcher;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::Result;

pub use http::HttpOrchestrationService;
pub use job::{Job, JOB_TYPE_CREATE, JOB_TYPE_RESIZE};
pub use launcher::{correlation_id, TaskLauncher};
pub use mock::MockOrchestrationService;

/// 已提交任务的句柄
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    NotStarted,
    Running,
    Paused,
    Suspended,
    Succeeded,
    Terminal,
    Canceled,
}

impl ExecutionStatus {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::NotStarted
                | ExecutionStatus::Running
                | ExecutionStatus::Paused
                | ExecutionStatus::Suspended
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationTrigger {
    pub correlation_id: String,
    /// 以资源的 service account 身份提交
    pub user: String,
    #[serde(rename = "type")]
    pub trigger_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationRequest {
    pub name: String,
    pub application: String,
    pub description: String,
    pub job: Vec<Job>,
    pub trigger: OrchestrationTrigger,
}

/// 编排后端
#[async_trait]
pub trait OrchestrationService: Send + Sync {
    async fn submit(&self, request: OrchestrationRequest) -> Result<Task>;

    /// 与关联 id 相关的执行记录
    async fn correlated_executions(&self, correlation_id: &str) -> Result<Vec<Execution>>;
}
