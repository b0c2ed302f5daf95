//! 任务提交器
//!
//! 持有 OrchestrationService，把 Job 包装成带关联 id 的 OrchestrationRequest 提交；
//! 每次提交输出一条结构化审计日志（JSON）。不重试，重试策略由外部调度层负责。

use std::sync::Arc;
use std::time::Instant;

use super::{Job, OrchestrationRequest, OrchestrationService, OrchestrationTrigger, Task};
use crate::core::Result;

const TRIGGER_TYPE: &str = "keel";

/// `{resource_id}:{region}`
pub fn correlation_id(resource_id: &str, region: &str) -> String {
    format!("{resource_id}:{region}")
}

pub struct TaskLauncher {
    service: Arc<dyn OrchestrationService>,
}

impl TaskLauncher {
    pub fn new(service: Arc<dyn OrchestrationService>) -> Self {
        Self { service }
    }

    pub async fn submit_job(
        &self,
        application: &str,
        service_account: &str,
        description: &str,
        correlation_id: &str,
        job: Job,
    ) -> Result<Task> {
        let start = Instant::now();
        let job_type = job.job_type().unwrap_or("unknown").to_string();
        let request = OrchestrationRequest {
            name: description.to_string(),
            application: application.to_string(),
            description: description.to_string(),
            job: vec![job],
            trigger: OrchestrationTrigger {
                correlation_id: correlation_id.to_string(),
                user: service_account.to_string(),
                trigger_type: TRIGGER_TYPE.to_string(),
            },
        };

        let result = self.service.submit(request).await;

        let event = if result.is_ok() { "job_submitted" } else { "job_failed" };
        let audit = serde_json::json!({
            "event": event,
            "correlation_id": correlation_id,
            "job_type": job_type,
            "task_id": result.as_ref().ok().map(|t| t.id.clone()),
            "duration_ms": start.elapsed().as_millis() as u64,
        });
        match &result {
            Ok(_) => tracing::info!(audit = %audit, "orchestration"),
            Err(e) => tracing::warn!(audit = %audit, error = %e, "orchestration"),
        }

        result
    }

    /// 是否有与该关联 id 相关、仍在进行中的执行
    pub async fn correlated_tasks_running(&self, correlation_id: &str) -> Result<bool> {
        Ok(self
            .service
            .correlated_executions(correlation_id)
            .await?
            .iter()
            .any(|e| e.status.is_active()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::{ExecutionStatus, MockOrchestrationService, JOB_TYPE_RESIZE};

    #[test]
    fn test_correlation_id_is_deterministic() {
        let a = correlation_id("ec2:cluster:test:fnord-test", "us-west-2");
        let b = correlation_id("ec2:cluster:test:fnord-test", "us-west-2");
        assert_eq!(a, b);
        assert_eq!(a, "ec2:cluster:test:fnord-test:us-west-2");
    }

    #[tokio::test]
    async fn test_submit_wraps_job_with_trigger() {
        let mock = Arc::new(MockOrchestrationService::new());
        let launcher = TaskLauncher::new(mock.clone());

        let task = launcher
            .submit_job("fnord", "keel@spinnaker.io", "Resize", "res:us-west-2", Job::new(JOB_TYPE_RESIZE))
            .await
            .unwrap();
        assert!(!task.id.is_empty());

        let requests = mock.submitted();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].trigger.correlation_id, "res:us-west-2");
        assert_eq!(requests[0].trigger.user, "keel@spinnaker.io");
        assert_eq!(requests[0].job[0].job_type(), Some(JOB_TYPE_RESIZE));
    }

    #[tokio::test]
    async fn test_only_active_executions_count_as_running() {
        let mock = Arc::new(MockOrchestrationService::new());
        mock.add_execution("res:us-west-2", ExecutionStatus::Succeeded);
        let launcher = TaskLauncher::new(mock.clone());
        assert!(!launcher.correlated_tasks_running("res:us-west-2").await.unwrap());

        mock.add_execution("res:us-west-2", ExecutionStatus::Running);
        assert!(launcher.correlated_tasks_running("res:us-west-2").await.unwrap());
    }
}
