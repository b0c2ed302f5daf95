//! HTTP 编排后端客户端
//!
//! `POST /ops` 提交作业，返回的 `ref`（如 `/tasks/01E5...`）末段即任务 id；
//! `GET /executions/correlated/{id}` 返回仍在进行中的执行 id 列表。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{Execution, ExecutionStatus, OrchestrationRequest, OrchestrationService, Task};
use crate::config::OrchestrationSection;
use crate::core::{KeelError, Result};

#[derive(Debug, Deserialize)]
struct TaskRefResponse {
    #[serde(rename = "ref")]
    task_ref: String,
}

pub struct HttpOrchestrationService {
    client: Client,
    base_url: String,
}

impl HttpOrchestrationService {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| KeelError::Orchestration(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(section: &OrchestrationSection) -> Result<Self> {
        Self::new(&section.base_url, section.timeout_secs)
    }
}

#[async_trait]
impl OrchestrationService for HttpOrchestrationService {
    async fn submit(&self, request: OrchestrationRequest) -> Result<Task> {
        let resp = self
            .client
            .post(format!("{}/ops", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| KeelError::Orchestration(format!("Request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(KeelError::Orchestration(format!("HTTP {}", resp.status())));
        }
        let body: TaskRefResponse = resp
            .json()
            .await
            .map_err(|e| KeelError::Orchestration(format!("Decode task ref: {e}")))?;

        Ok(Task {
            id: task_id_of(&body.task_ref),
            name: request.description,
        })
    }

    async fn correlated_executions(&self, correlation_id: &str) -> Result<Vec<Execution>> {
        let resp = self
            .client
            .get(format!("{}/executions/correlated/{}", self.base_url, correlation_id))
            .send()
            .await
            .map_err(|e| KeelError::Orchestration(format!("Request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(KeelError::Orchestration(format!("HTTP {}", resp.status())));
        }
        let ids: Vec<String> = resp
            .json()
            .await
            .map_err(|e| KeelError::Orchestration(format!("Decode executions: {e}")))?;

        // 该端点只返回未结束的执行
        Ok(ids
            .into_iter()
            .map(|id| Execution {
                id,
                status: ExecutionStatus::Running,
            })
            .collect())
    }
}

fn task_id_of(task_ref: &str) -> String {
    task_ref
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(task_ref)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_is_last_ref_segment() {
        assert_eq!(task_id_of("/tasks/01E5Z3A8"), "01E5Z3A8");
        assert_eq!(task_id_of("01E5Z3A8"), "01E5Z3A8");
    }

    #[test]
    fn test_from_config_builds_client() {
        let service = HttpOrchestrationService::from_config(&OrchestrationSection::default()).unwrap();
        assert!(!service.base_url.ends_with('/'));
    }
}
