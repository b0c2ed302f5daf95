//! ClusterSpec → 每区域 desired ServerGroup
//!
//! 纯函数：需要外部元数据的部分（账号密钥对模板、区域可用区）由调用方预先收集进
//! [`ResolverContext`]，因此同一输入永远得到同一输出。

use std::collections::{BTreeMap, BTreeSet};

use super::conventions::Conventions;
use crate::core::{KeelError, Result};
use crate::model::{
    Capacity, ClusterDependencies, ClusterSpec, Health, LaunchConfiguration, Location,
    RegionSpec, Scaling, ServerGroup, ServerGroupSpec,
};

/// 解析所需的外部元数据
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverContext {
    /// 账号默认密钥对模板（可含区域占位符）
    pub key_pair_template: String,
    /// region → 可用区；只需覆盖声明中未列可用区的区域
    pub available_zones: BTreeMap<String, BTreeSet<String>>,
}

pub fn resolve(
    spec: &ClusterSpec,
    ctx: &ResolverContext,
    conventions: &Conventions,
) -> Result<BTreeMap<String, ServerGroup>> {
    let declared: BTreeSet<&str> = spec.region_names().collect();
    if let Some(unknown) = spec.overrides.keys().find(|r| !declared.contains(r.as_str())) {
        return Err(KeelError::Configuration(format!(
            "override for region {unknown} which is not a location of cluster {}",
            spec.cluster_name()
        )));
    }

    spec.locations
        .regions
        .iter()
        .map(|region| {
            let merged = match spec.overrides.get(&region.name) {
                Some(overrides) => spec.defaults.merged_with(overrides),
                None => spec.defaults.clone(),
            };
            let server_group = resolve_region(spec, region, &merged, ctx, conventions)?;
            Ok((region.name.clone(), server_group))
        })
        .collect()
}

fn resolve_region(
    spec: &ClusterSpec,
    region: &RegionSpec,
    merged: &ServerGroupSpec,
    ctx: &ResolverContext,
    conventions: &Conventions,
) -> Result<ServerGroup> {
    let application = spec.application();
    let cluster = spec.cluster_name();
    let missing = |field: &str| {
        KeelError::Configuration(format!(
            "{field} is not specified for cluster {cluster} in {}",
            region.name
        ))
    };

    let lc = merged.launch_configuration.clone().unwrap_or_default();
    let image = lc.image.ok_or_else(|| missing("launchConfiguration.image"))?;
    let instance_type = lc
        .instance_type
        .ok_or_else(|| missing("launchConfiguration.instanceType"))?;

    let availability_zones = if region.availability_zones.is_empty() {
        ctx.available_zones
            .get(&region.name)
            .filter(|zones| !zones.is_empty())
            .cloned()
            .ok_or_else(|| {
                KeelError::Configuration(format!(
                    "no availability zones known for {}/{} in subnet {}",
                    spec.locations.account, region.name, spec.locations.subnet
                ))
            })?
    } else {
        region.availability_zones.clone()
    };

    let dependencies = merged.dependencies.clone().unwrap_or_default();
    let mut security_group_names = dependencies.security_group_names.unwrap_or_default();
    // 后端总会附加这些组；desired 中补齐，current 才能与之相等
    security_group_names.extend(conventions.auto_assigned_security_groups(application));

    let health_spec = merged.health.clone().unwrap_or_default();
    let defaults = Health::default();

    Ok(ServerGroup {
        name: cluster.clone(),
        moniker: spec.moniker.without_sequence(),
        location: Location {
            account: spec.locations.account.clone(),
            region: region.name.clone(),
            vpc: spec.locations.vpc.clone(),
            subnet: spec.locations.subnet.clone(),
            availability_zones,
        },
        launch_configuration: LaunchConfiguration {
            image_id: image.id,
            app_version: image.app_version,
            base_image_version: image.base_image_version,
            instance_type,
            ebs_optimized: lc.ebs_optimized.unwrap_or(false),
            iam_role: lc
                .iam_role
                .unwrap_or_else(|| conventions.default_iam_role(application)),
            key_pair: lc.key_pair.unwrap_or_else(|| {
                conventions.key_pair_for_region(&ctx.key_pair_template, &region.name)
            }),
            instance_monitoring: lc.instance_monitoring.unwrap_or(false),
            ramdisk_id: lc.ramdisk_id,
        },
        capacity: merged.capacity.unwrap_or_else(Capacity::default),
        dependencies: ClusterDependencies {
            load_balancer_names: dependencies.load_balancer_names.unwrap_or_default(),
            security_group_names,
            target_group_names: dependencies.target_group_names.unwrap_or_default(),
        },
        health: Health {
            cooldown_seconds: health_spec.cooldown_seconds.unwrap_or(defaults.cooldown_seconds),
            warmup_seconds: health_spec.warmup_seconds.unwrap_or(defaults.warmup_seconds),
            health_check_type: health_spec
                .health_check_type
                .unwrap_or(defaults.health_check_type),
            enabled_metrics: health_spec.enabled_metrics.unwrap_or(defaults.enabled_metrics),
            termination_policies: health_spec
                .termination_policies
                .unwrap_or(defaults.termination_policies),
        },
        scaling: merged.scaling.clone().unwrap_or_else(Scaling::default),
        tags: merged.tags.clone().unwrap_or_default(),
        build_info: None,
    })
}
