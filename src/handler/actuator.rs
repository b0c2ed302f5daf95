//! 单次收敛检查
//!
//! 进行中检查 → resolve → observe → diff → upsert。一次调用只做一轮，
//! 不循环也不重试；下一轮由外部调度器触发。

use super::{ResourceHandler, Submission};
use crate::core::Result;
use crate::diff::ResourceDiff;
use crate::model::Resource;

#[derive(Debug)]
pub enum CheckOutcome {
    /// desired 与 current 语义相等
    Unchanged,
    /// 已有关联任务在进行中，本轮跳过
    ActuationInProgress,
    /// 为有差异的分片提交了作业
    Actuated {
        affected_regions: Vec<String>,
        submissions: Vec<Submission>,
    },
}

impl CheckOutcome {
    pub fn submissions(&self) -> &[Submission] {
        match self {
            CheckOutcome::Actuated { submissions, .. } => submissions,
            _ => &[],
        }
    }
}

pub async fn check<H>(handler: &H, resource: &Resource<H::Spec>) -> Result<CheckOutcome>
where
    H: ResourceHandler + ?Sized,
{
    let id = resource.id();

    if handler.actuation_in_progress(resource).await? {
        tracing::info!(resource = %id, "actuation already in progress, skipping");
        return Ok(CheckOutcome::ActuationInProgress);
    }

    let desired = handler.resolve(resource).await?;
    let current = handler.observe(resource).await?;
    let diff = ResourceDiff::new(desired, Some(current));

    if !diff.has_changes() {
        tracing::debug!(resource = %id, "resource is up to date");
        return Ok(CheckOutcome::Unchanged);
    }

    let affected_regions: Vec<String> =
        diff.affected_root_property_types().iter().cloned().collect();
    tracing::info!(resource = %id, affected = ?affected_regions, "resource delta detected");

    let submissions = handler.upsert(resource, &diff).await?;
    for submission in &submissions {
        if let Err(e) = &submission.outcome {
            tracing::warn!(resource = %id, region = %submission.region, error = %e, "submission failed");
        }
    }

    Ok(CheckOutcome::Actuated {
        affected_regions,
        submissions,
    })
}
