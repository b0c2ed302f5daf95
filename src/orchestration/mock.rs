//! Mock 编排后端（用于测试）
//!
//! 记录所有提交的请求；可对指定关联 id 注入失败，或预置相关执行记录。

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Execution, ExecutionStatus, OrchestrationRequest, OrchestrationService, Task};
use crate::core::{KeelError, Result};

#[derive(Default)]
pub struct MockOrchestrationService {
    submitted: Mutex<Vec<OrchestrationRequest>>,
    executions: Mutex<HashMap<String, Vec<Execution>>>,
    failing: Mutex<HashSet<String>>,
}

impl MockOrchestrationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 该关联 id 的提交返回服务错误
    pub fn fail_correlation(&self, correlation_id: &str) {
        lock(&self.failing).insert(correlation_id.to_string());
    }

    pub fn add_execution(&self, correlation_id: &str, status: ExecutionStatus) {
        let mut executions = lock(&self.executions);
        let list = executions.entry(correlation_id.to_string()).or_default();
        let id = format!("exec-{}", list.len() + 1);
        list.push(Execution { id, status });
    }

    /// 已提交请求的快照（按提交顺序）
    pub fn submitted(&self) -> Vec<OrchestrationRequest> {
        lock(&self.submitted).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl OrchestrationService for MockOrchestrationService {
    async fn submit(&self, request: OrchestrationRequest) -> Result<Task> {
        if lock(&self.failing).contains(&request.trigger.correlation_id) {
            return Err(KeelError::Orchestration(format!(
                "rejected {}",
                request.trigger.correlation_id
            )));
        }
        let task = Task {
            id: format!("task_{}", uuid::Uuid::new_v4()),
            name: request.description.clone(),
        };
        lock(&self.submitted).push(request);
        Ok(task)
    }

    async fn correlated_executions(&self, correlation_id: &str) -> Result<Vec<Execution>> {
        Ok(lock(&self.executions)
            .get(correlation_id)
            .cloned()
            .unwrap_or_default())
    }
}
