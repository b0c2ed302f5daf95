//! 单区域 diff → 编排作业
//!
//! 只有容量变化时生成 resize 作业（就地调整），其余情况生成 converge 作业
//! （从当前 server group 复制并部署新的一代，不存在时即为创建）。

use std::sync::Arc;

use serde_json::{json, Value};

use super::conventions::Conventions;
use crate::core::Result;
use crate::diff::ResourceDiff;
use crate::inventory::{InventoryCache, CLOUD_PROVIDER};
use crate::model::{PropertyType, ServerGroup};
use crate::orchestration::{Job, JOB_TYPE_CREATE, JOB_TYPE_RESIZE};

/// 只改变容量的 diff 可以就地 resize
pub fn is_resize(diff: &ResourceDiff<ServerGroup>) -> bool {
    diff.only_affects(&[PropertyType::Capacity])
}

/// 作业描述（同时作为编排请求的名称）
pub fn describe(diff: &ResourceDiff<ServerGroup>) -> String {
    let desired = diff.desired();
    let location = format!("{}/{}", desired.account(), desired.region());
    match diff.current() {
        Some(current) if is_resize(diff) => format!(
            "Resize server group {} in {location}",
            current.moniker.server_group_name()
        ),
        _ => format!(
            "Deploy {} to cluster {} in {location}",
            desired.launch_configuration.image_id, desired.name
        ),
    }
}

pub struct JobBuilder {
    cache: Arc<InventoryCache>,
    conventions: Arc<Conventions>,
}

impl JobBuilder {
    pub fn new(cache: Arc<InventoryCache>, conventions: Arc<Conventions>) -> Self {
        Self { cache, conventions }
    }

    pub async fn build(&self, diff: &ResourceDiff<ServerGroup>) -> Result<Job> {
        match diff.current() {
            Some(current) if is_resize(diff) => Ok(resize_job(current, diff.desired())),
            current => self.converge_job(diff.desired(), current).await,
        }
    }

    async fn converge_job(&self, desired: &ServerGroup, current: Option<&ServerGroup>) -> Result<Job> {
        let application = desired.moniker.app.as_str();
        let account = desired.account();
        let region = desired.region();
        let lc = &desired.launch_configuration;
        let health = &desired.health;

        let security_groups = self.security_group_ids(desired).await?;

        let mut job = Job::new(JOB_TYPE_CREATE)
            .with("application", application)
            .with("credentials", account)
            .with("capacity", serde_json::to_value(desired.capacity)?)
            .with("targetHealthyDeployPercentage", 100)
            .with("cooldown", health.cooldown_seconds)
            .with("enabledMetrics", serde_json::to_value(&health.enabled_metrics)?)
            .with("healthCheckType", serde_json::to_value(health.health_check_type)?)
            .with("healthCheckGracePeriod", health.warmup_seconds)
            .with("instanceMonitoring", lc.instance_monitoring)
            .with("ebsOptimized", lc.ebs_optimized)
            .with("iamRole", lc.iam_role.as_str())
            .with("terminationPolicies", serde_json::to_value(&health.termination_policies)?)
            .with("subnetType", desired.location.subnet.as_str())
            .with(
                "availabilityZones",
                json!({ region: desired.location.availability_zones }),
            )
            .with("keyPair", lc.key_pair.as_str())
            .with(
                "suspendedProcesses",
                serde_json::to_value(&desired.scaling.suspended_processes)?,
            )
            .with("securityGroups", security_groups)
            .with("stack", optional(desired.moniker.stack.as_deref()))
            .with("freeFormDetails", optional(desired.moniker.detail.as_deref()))
            .with("tags", serde_json::to_value(&desired.tags)?)
            .with("useAmiBlockDeviceMappings", false)
            .with("copySourceCustomBlockDeviceMappings", current.is_some())
            .with("virtualizationType", "hvm")
            .with(
                "moniker",
                json!({
                    "app": application,
                    "stack": desired.moniker.stack,
                    "detail": desired.moniker.detail,
                    "cluster": desired.name,
                }),
            )
            .with("amiName", lc.image_id.as_str())
            .with(
                "reason",
                format!("Diff detected at {}", chrono::Utc::now().to_rfc3339()),
            )
            .with("instanceType", lc.instance_type.as_str())
            .with("cloudProvider", CLOUD_PROVIDER)
            .with("loadBalancers", serde_json::to_value(&desired.dependencies.load_balancer_names)?)
            .with("targetGroups", serde_json::to_value(&desired.dependencies.target_group_names)?)
            .with("account", account);

        if let Some(ramdisk_id) = &lc.ramdisk_id {
            job.insert("ramdiskId", ramdisk_id.as_str());
        }
        if let Some(current) = current {
            job.insert(
                "source",
                json!({
                    "account": current.account(),
                    "region": current.region(),
                    "asgName": current.moniker.server_group_name(),
                }),
            );
        }
        Ok(job)
    }

    /// 显式声明的安全组 id；自动附加的组由后端补上，不出现在作业里
    async fn security_group_ids(&self, desired: &ServerGroup) -> Result<Vec<String>> {
        let account = desired.account();
        let region = desired.region();
        let (explicit, _) = self
            .conventions
            .normalize_security_groups(&desired.dependencies.security_group_names, &desired.moniker.app);
        if explicit.is_empty() {
            return Ok(Vec::new());
        }

        let vpc_id = self
            .cache
            .network_by_name(account, region, &desired.location.vpc)
            .await?
            .id;
        let mut ids = Vec::with_capacity(explicit.len());
        for name in &explicit {
            ids.push(
                self.cache
                    .security_group_by_name(account, region, &vpc_id, name)
                    .await?
                    .id,
            );
        }
        Ok(ids)
    }
}

/// 就地调整容量，不携带任何启动配置字段
pub fn resize_job(current: &ServerGroup, desired: &ServerGroup) -> Job {
    Job::new(JOB_TYPE_RESIZE)
        .with(
            "capacity",
            json!({
                "min": desired.capacity.min,
                "max": desired.capacity.max,
                "desired": desired.capacity.desired,
            }),
        )
        .with("cloudProvider", CLOUD_PROVIDER)
        .with("credentials", desired.account())
        .with(
            "moniker",
            json!({
                "app": current.moniker.app,
                "stack": current.moniker.stack,
                "detail": current.moniker.detail,
                "cluster": current.name,
                "sequence": current.moniker.sequence,
            }),
        )
        .with("region", desired.region())
        .with("serverGroupName", current.moniker.server_group_name())
}

fn optional(value: Option<&str>) -> Value {
    value.map_or(Value::Null, Value::from)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::inventory::mock::{sample_active_server_group, test_security_group_id};
    use crate::inventory::{to_server_group, MockInventoryService};
    use crate::model::{Capacity, Moniker};

    fn cache() -> Arc<InventoryCache> {
        Arc::new(InventoryCache::new(Arc::new(MockInventoryService::with_test_fixtures())))
    }

    fn builder() -> JobBuilder {
        JobBuilder::new(cache(), Arc::new(Conventions::default()))
    }

    async fn observed(region: &str) -> ServerGroup {
        let moniker = Moniker::new("fnord").with_stack("test");
        to_server_group(&sample_active_server_group(&moniker, region), &cache())
            .await
            .unwrap()
    }

    /// 与 current 语义相同、但不带序号的 desired
    async fn desired(region: &str) -> ServerGroup {
        let mut sg = observed(region).await;
        sg.moniker = sg.moniker.without_sequence();
        sg
    }

    #[tokio::test]
    async fn test_capacity_only_change_builds_resize() {
        let current = observed("us-west-2").await;
        let mut target = desired("us-west-2").await;
        target.capacity = Capacity::new(2, 4, 3);
        let diff = ResourceDiff::new(target, Some(current));

        let job = builder().build(&diff).await.unwrap();
        assert_eq!(job.job_type(), Some(JOB_TYPE_RESIZE));
        assert_eq!(job.get("serverGroupName"), Some(&json!("fnord-test-v001")));
        assert_eq!(job.get("capacity"), Some(&json!({"min": 2, "max": 4, "desired": 3})));
        for absent in ["amiName", "instanceType", "iamRole", "keyPair", "securityGroups"] {
            assert!(!job.contains_key(absent), "{absent} must not be in a resize job");
        }
        assert!(describe(&diff).starts_with("Resize server group fnord-test-v001"));
    }

    #[tokio::test]
    async fn test_create_has_no_source() {
        let diff = ResourceDiff::new(desired("us-west-2").await, None);
        let job = builder().build(&diff).await.unwrap();

        assert_eq!(job.job_type(), Some(JOB_TYPE_CREATE));
        assert!(!job.contains_key("source"));
        assert_eq!(job.get("copySourceCustomBlockDeviceMappings"), Some(&json!(false)));
        assert_eq!(job.get("amiName"), Some(&json!("ami-001")));
        assert_eq!(
            job.get("availabilityZones"),
            Some(&json!({"us-west-2": ["us-west-2a", "us-west-2b", "us-west-2c"]}))
        );
        assert_eq!(job.get("healthCheckType"), Some(&json!("EC2")));
        assert_eq!(job.get("terminationPolicies"), Some(&json!(["OldestInstance"])));
    }

    #[tokio::test]
    async fn test_launch_change_builds_converge_with_source() {
        let current = observed("us-west-2").await;
        let mut target = desired("us-west-2").await;
        target.launch_configuration.image_id = "ami-002".into();
        target.capacity = Capacity::new(2, 2, 2);
        let diff = ResourceDiff::new(target, Some(current));

        let job = builder().build(&diff).await.unwrap();
        assert_eq!(job.job_type(), Some(JOB_TYPE_CREATE));
        assert_eq!(
            job.get("source"),
            Some(&json!({"account": "test", "region": "us-west-2", "asgName": "fnord-test-v001"}))
        );
        assert_eq!(job.get("copySourceCustomBlockDeviceMappings"), Some(&json!(true)));
        assert_eq!(job.get("amiName"), Some(&json!("ami-002")));
    }

    #[tokio::test]
    async fn test_auto_assigned_security_groups_are_omitted() {
        let mut target = desired("us-west-2").await;
        target
            .dependencies
            .security_group_names
            .insert("extra-group".into());
        let diff = ResourceDiff::new(target, None);

        let job = builder().build(&diff).await.unwrap();
        assert_eq!(
            job.get("securityGroups"),
            Some(&json!([test_security_group_id("us-west-2", "extra-group")]))
        );
    }

    #[tokio::test]
    async fn test_converge_keys_are_ordered() {
        let diff = ResourceDiff::new(desired("us-east-1").await, None);
        let job = builder().build(&diff).await.unwrap();
        let keys: Vec<_> = job.keys().take(4).collect();
        assert_eq!(keys, vec!["refId", "type", "application", "credentials"]);
        assert_eq!(job.get("tags"), Some(&serde_json::to_value(BTreeMap::<String, String>::new()).unwrap()));
    }
}
