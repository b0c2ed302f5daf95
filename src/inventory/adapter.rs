//! ActiveServerGroup → ServerGroup 翻译
//!
//! 名称解析（VPC id → 名称、子网 id → 用途、安全组 id → 名称）通过 InventoryCache 完成，
//! 解析失败即硬失败。

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;

use super::{ActiveServerGroup, InventoryCache};
use crate::core::{KeelError, Result};
use crate::model::{
    ClusterDependencies, Health, LaunchConfiguration, Location, Moniker, Scaling, ServerGroup,
};

/// AWS 保留的标签前缀，用户无法设置，也不纳入比较
const RESERVED_TAG_PREFIX: &str = "aws:";

pub async fn to_server_group(
    snapshot: &ActiveServerGroup,
    cache: &InventoryCache,
) -> Result<ServerGroup> {
    let account = snapshot.account_name.as_str();
    let region = snapshot.region.as_str();

    let vpc = cache
        .network_by_id(&snapshot.vpc_id)
        .await?
        .name
        .ok_or_else(|| KeelError::ResourceNotFound(format!("name of VPC {}", snapshot.vpc_id)))?;

    let subnet_id = snapshot
        .asg
        .vpc_zone_identifier
        .split(',')
        .map(str::trim)
        .find(|s| !s.is_empty())
        .ok_or_else(|| {
            KeelError::Inventory(format!("server group {} has no subnets", snapshot.name))
        })?;
    let subnet = cache.subnet_purpose(subnet_id).await?;

    let mut security_group_names = BTreeSet::new();
    for id in &snapshot.security_groups {
        security_group_names.insert(cache.security_group_by_id(account, region, id).await?.name);
    }

    let moniker = snapshot
        .moniker
        .clone()
        .unwrap_or_else(|| Moniker::parse(&snapshot.name));

    let lc = &snapshot.launch_config;
    let asg = &snapshot.asg;

    Ok(ServerGroup {
        name: moniker.cluster_name(),
        moniker,
        location: Location {
            account: account.to_string(),
            region: region.to_string(),
            vpc,
            subnet,
            availability_zones: snapshot.zones.clone(),
        },
        launch_configuration: LaunchConfiguration {
            image_id: lc.image_id.clone(),
            app_version: snapshot.image.app_version(),
            base_image_version: snapshot.image.base_image_version(),
            instance_type: lc.instance_type.clone(),
            ebs_optimized: lc.ebs_optimized,
            iam_role: lc.iam_instance_profile.clone(),
            key_pair: lc.key_name.clone(),
            instance_monitoring: lc.instance_monitoring.enabled,
            ramdisk_id: lc.ramdisk_id.clone(),
        },
        capacity: snapshot.capacity,
        dependencies: ClusterDependencies {
            load_balancer_names: snapshot.load_balancers.clone(),
            security_group_names,
            target_group_names: snapshot.target_groups.clone(),
        },
        health: Health {
            cooldown_seconds: asg.default_cooldown,
            warmup_seconds: asg.health_check_grace_period,
            health_check_type: parse_enum("health check type", &asg.health_check_type)?,
            enabled_metrics: asg
                .enabled_metrics
                .iter()
                .map(|m| parse_enum("metric", &m.metric))
                .collect::<Result<_>>()?,
            termination_policies: asg
                .termination_policies
                .iter()
                .map(|p| parse_enum("termination policy", p))
                .collect::<Result<_>>()?,
        },
        scaling: Scaling {
            suspended_processes: asg
                .suspended_processes
                .iter()
                .map(|p| parse_enum("scaling process", &p.process_name))
                .collect::<Result<_>>()?,
        },
        tags: asg
            .tags
            .iter()
            .filter(|t| !t.key.starts_with(RESERVED_TAG_PREFIX))
            .map(|t| (t.key.clone(), t.value.clone()))
            .collect(),
        build_info: snapshot.build_info.clone(),
    })
}

/// 把 Inventory 的字符串枚举值解析为内部枚举
fn parse_enum<T: DeserializeOwned>(what: &str, raw: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| KeelError::Inventory(format!("unrecognised {what}: {raw}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::inventory::mock::{sample_active_server_group, test_security_group_id};
    use crate::inventory::{EnabledMetric, MockInventoryService, SuspendedProcess};
    use crate::model::{Metric, ScalingProcess};

    fn cache() -> InventoryCache {
        InventoryCache::new(Arc::new(MockInventoryService::with_test_fixtures()))
    }

    fn moniker() -> Moniker {
        Moniker::new("fnord").with_stack("test")
    }

    #[tokio::test]
    async fn test_translates_snapshot() {
        let snapshot = sample_active_server_group(&moniker(), "us-west-2");
        let sg = to_server_group(&snapshot, &cache()).await.unwrap();

        assert_eq!(sg.name, "fnord-test");
        assert_eq!(sg.moniker.sequence, Some(1));
        assert_eq!(sg.location.vpc, "vpc0");
        assert_eq!(sg.location.subnet, "internal (vpc0)");
        assert_eq!(sg.launch_configuration.app_version.as_deref(), Some("fnord-1.0.0-h12.abc1234"));
        assert_eq!(sg.health, Health::default());
        let names: Vec<_> = sg.dependencies.security_group_names.iter().cloned().collect();
        assert_eq!(names, vec!["fnord", "nf-datacenter", "nf-infrastructure"]);
        assert!(sg.tags.is_empty(), "reserved aws: tags are dropped");
    }

    #[tokio::test]
    async fn test_parses_enumerated_attributes() {
        let mut snapshot = sample_active_server_group(&moniker(), "us-west-2");
        snapshot.asg.enabled_metrics = vec![EnabledMetric {
            metric: "GroupInServiceInstances".into(),
        }];
        snapshot.asg.suspended_processes = vec![SuspendedProcess {
            process_name: "AZRebalance".into(),
        }];
        snapshot.asg.health_check_type = "ELB".into();

        let sg = to_server_group(&snapshot, &cache()).await.unwrap();
        assert!(sg.health.enabled_metrics.contains(&Metric::GroupInServiceInstances));
        assert!(sg.scaling.suspended_processes.contains(&ScalingProcess::AZRebalance));
    }

    #[tokio::test]
    async fn test_unknown_security_group_fails() {
        let mut snapshot = sample_active_server_group(&moniker(), "us-west-2");
        snapshot.security_groups.insert("sg-unknown".into());
        let err = to_server_group(&snapshot, &cache()).await.unwrap_err();
        assert!(matches!(err, KeelError::ResourceNotFound(_)));

        snapshot.security_groups.remove("sg-unknown");
        snapshot
            .security_groups
            .insert(test_security_group_id("us-west-2", "extra-group"));
        assert!(to_server_group(&snapshot, &cache()).await.is_ok());
    }

    #[tokio::test]
    async fn test_unrecognised_enum_value() {
        let mut snapshot = sample_active_server_group(&moniker(), "us-west-2");
        snapshot.asg.termination_policies = vec!["Whimsical".into()];
        let err = to_server_group(&snapshot, &cache()).await.unwrap_err();
        assert!(err.to_string().contains("termination policy"));
    }
}
