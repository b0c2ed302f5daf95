//! 现网 ServerGroup → ClusterSpec（解析的逆过程）
//!
//! 约定默认值一律省略，使导出结果最小；第一个区域作为 base，
//! 其他区域只在某字段的规范化值与 base 不同时才产生该字段的覆盖。

use std::collections::{BTreeMap, BTreeSet};

use super::conventions::{elide, normalize_against, normalize_set, Conventions};
use super::resolver::ResolverContext;
use crate::core::{KeelError, Result};
use crate::inventory::APP_VERSION_TAG;
use crate::model::{
    ClusterLocations, ClusterSpec, DependenciesSpec, Health, HealthSpec, ImageSpec,
    LaunchConfigurationSpec, RegionSpec, ServerGroup, ServerGroupSpec,
};

/// 导出一组已观测的区域 server group
///
/// `ctx` 与解析使用的上下文相同：密钥对模板用于判断是否为约定值，
/// 可用区用于判断某区域是否使用了全部可用区。
pub fn export_cluster(
    current: &BTreeMap<String, ServerGroup>,
    ctx: &ResolverContext,
    conventions: &Conventions,
) -> Result<ClusterSpec> {
    let (base_region, base) = current
        .iter()
        .next()
        .ok_or_else(|| KeelError::ResourceNotFound("no server groups to export".into()))?;

    // 区域间的 vpc / 子网用途无法用覆盖表达
    if let Some((region, sg)) = current.iter().find(|(_, sg)| {
        sg.location.vpc != base.location.vpc || sg.location.subnet != base.location.subnet
    }) {
        return Err(KeelError::Configuration(format!(
            "{region} uses {} / {} but {base_region} uses {} / {}",
            sg.location.vpc, sg.location.subnet, base.location.vpc, base.location.subnet
        )));
    }

    let exporter = Exporter { ctx, conventions };
    let defaults = exporter.server_group_spec(base, true)?;

    let mut overrides = OverridesBuilder::new(&defaults);
    for (region, server_group) in current.iter().filter(|(r, _)| *r != base_region) {
        let elided = exporter.server_group_spec(server_group, true)?;
        let concrete = exporter.server_group_spec(server_group, false)?;
        overrides.region(region, &elided, &concrete);
    }
    let overrides = overrides.build();

    Ok(ClusterSpec {
        moniker: base.moniker.without_sequence(),
        locations: ClusterLocations {
            account: base.location.account.clone(),
            vpc: base.location.vpc.clone(),
            subnet: base.location.subnet.clone(),
            regions: current
                .iter()
                .map(|(region, sg)| RegionSpec {
                    name: region.clone(),
                    availability_zones: exporter.zones(region, &sg.location.availability_zones),
                })
                .collect(),
        },
        defaults,
        overrides,
    })
}

struct Exporter<'a> {
    ctx: &'a ResolverContext,
    conventions: &'a Conventions,
}

impl Exporter<'_> {
    /// 只有严格子集才需要显式列出；否则等价于「全部可用区」
    fn zones(&self, region: &str, zones: &BTreeSet<String>) -> BTreeSet<String> {
        match self.ctx.available_zones.get(region) {
            Some(all) if zones.is_subset(all) && zones != all => zones.clone(),
            _ => BTreeSet::new(),
        }
    }

    /// `elide_defaults` 为 false 时保留所有字段的具体值，供覆盖使用
    fn server_group_spec(&self, sg: &ServerGroup, elide_defaults: bool) -> Result<ServerGroupSpec> {
        let application = sg.moniker.app.as_str();
        let lc = &sg.launch_configuration;

        let app_version = lc.app_version.clone().ok_or_else(|| KeelError::RequiredTagMissing {
            tag: APP_VERSION_TAG.to_string(),
            image_id: lc.image_id.clone(),
        })?;

        let omit = elide_defaults;
        let conventions = self.conventions;
        let launch_configuration = LaunchConfigurationSpec {
            image: Some(ImageSpec {
                id: lc.image_id.clone(),
                app_version: Some(app_version),
                base_image_version: lc.base_image_version.clone(),
            }),
            instance_type: Some(lc.instance_type.clone()),
            ebs_optimized: pick(omit, normalize_against(&lc.ebs_optimized, &false)),
            iam_role: pick(omit, conventions.normalize_iam_role(&lc.iam_role, application)),
            key_pair: pick(
                omit,
                conventions.normalize_key_pair(&lc.key_pair, &self.ctx.key_pair_template, sg.region()),
            ),
            instance_monitoring: pick(omit, normalize_against(&lc.instance_monitoring, &false)),
            ramdisk_id: lc.ramdisk_id.clone(),
        };

        let deps = &sg.dependencies;
        let dependencies = DependenciesSpec {
            load_balancer_names: pick(omit, normalize_set(&deps.load_balancer_names)),
            security_group_names: pick(
                omit,
                conventions.normalize_security_groups(&deps.security_group_names, application),
            ),
            target_group_names: pick(omit, normalize_set(&deps.target_group_names)),
        };

        let defaults = Health::default();
        let observed = &sg.health;
        let health = HealthSpec {
            cooldown_seconds: pick(
                omit,
                normalize_against(&observed.cooldown_seconds, &defaults.cooldown_seconds),
            ),
            warmup_seconds: pick(
                omit,
                normalize_against(&observed.warmup_seconds, &defaults.warmup_seconds),
            ),
            health_check_type: pick(
                omit,
                normalize_against(&observed.health_check_type, &defaults.health_check_type),
            ),
            enabled_metrics: pick(omit, normalize_set(&observed.enabled_metrics)),
            termination_policies: pick(
                omit,
                normalize_against(&observed.termination_policies, &defaults.termination_policies),
            ),
        };

        let scaling = pick(
            omit,
            (sg.scaling.clone(), sg.scaling.suspended_processes.is_empty()),
        );
        let tags = pick(omit, (sg.tags.clone(), sg.tags.is_empty()));

        Ok(ServerGroupSpec {
            launch_configuration: Some(launch_configuration),
            capacity: Some(sg.capacity),
            dependencies: (!dependencies.is_empty()).then_some(dependencies),
            health: (!health.is_empty()).then_some(health),
            scaling,
            tags,
        })
    }
}

/// 逐字段比较区域与 base 的规范化值，只收集不同的字段
struct OverridesBuilder<'a> {
    base: &'a ServerGroupSpec,
    overrides: BTreeMap<String, ServerGroupSpec>,
}

impl<'a> OverridesBuilder<'a> {
    fn new(base: &'a ServerGroupSpec) -> Self {
        Self {
            base,
            overrides: BTreeMap::new(),
        }
    }

    /// `elided` 用于比较，`concrete` 提供写入覆盖的具体值
    fn region(&mut self, region: &str, elided: &ServerGroupSpec, concrete: &ServerGroupSpec) {
        let base = self.base;
        let base_lc = base.launch_configuration.clone().unwrap_or_default();
        let lc = elided.launch_configuration.clone().unwrap_or_default();
        let concrete_lc = concrete.launch_configuration.clone().unwrap_or_default();
        let launch_configuration = LaunchConfigurationSpec {
            image: differing(&base_lc.image, &lc.image, &concrete_lc.image),
            instance_type: differing(&base_lc.instance_type, &lc.instance_type, &concrete_lc.instance_type),
            ebs_optimized: differing(&base_lc.ebs_optimized, &lc.ebs_optimized, &concrete_lc.ebs_optimized),
            iam_role: differing(&base_lc.iam_role, &lc.iam_role, &concrete_lc.iam_role),
            key_pair: differing(&base_lc.key_pair, &lc.key_pair, &concrete_lc.key_pair),
            instance_monitoring: differing(
                &base_lc.instance_monitoring,
                &lc.instance_monitoring,
                &concrete_lc.instance_monitoring,
            ),
            ramdisk_id: differing(&base_lc.ramdisk_id, &lc.ramdisk_id, &concrete_lc.ramdisk_id),
        };

        let base_deps = base.dependencies.clone().unwrap_or_default();
        let deps = elided.dependencies.clone().unwrap_or_default();
        let concrete_deps = concrete.dependencies.clone().unwrap_or_default();
        let dependencies = DependenciesSpec {
            load_balancer_names: differing(
                &base_deps.load_balancer_names,
                &deps.load_balancer_names,
                &concrete_deps.load_balancer_names,
            ),
            security_group_names: differing(
                &base_deps.security_group_names,
                &deps.security_group_names,
                &concrete_deps.security_group_names,
            ),
            target_group_names: differing(
                &base_deps.target_group_names,
                &deps.target_group_names,
                &concrete_deps.target_group_names,
            ),
        };

        let base_health = base.health.clone().unwrap_or_default();
        let health = elided.health.clone().unwrap_or_default();
        let concrete_health = concrete.health.clone().unwrap_or_default();
        let health = HealthSpec {
            cooldown_seconds: differing(
                &base_health.cooldown_seconds,
                &health.cooldown_seconds,
                &concrete_health.cooldown_seconds,
            ),
            warmup_seconds: differing(
                &base_health.warmup_seconds,
                &health.warmup_seconds,
                &concrete_health.warmup_seconds,
            ),
            health_check_type: differing(
                &base_health.health_check_type,
                &health.health_check_type,
                &concrete_health.health_check_type,
            ),
            enabled_metrics: differing(
                &base_health.enabled_metrics,
                &health.enabled_metrics,
                &concrete_health.enabled_metrics,
            ),
            termination_policies: differing(
                &base_health.termination_policies,
                &health.termination_policies,
                &concrete_health.termination_policies,
            ),
        };

        let spec = ServerGroupSpec {
            launch_configuration: (!launch_configuration.is_empty()).then_some(launch_configuration),
            capacity: differing(&base.capacity, &elided.capacity, &concrete.capacity),
            dependencies: (!dependencies.is_empty()).then_some(dependencies),
            health: (!health.is_empty()).then_some(health),
            scaling: differing(&base.scaling, &elided.scaling, &concrete.scaling),
            tags: differing(&base.tags, &elided.tags, &concrete.tags),
        };
        if !spec.is_empty() {
            self.overrides.insert(region.to_string(), spec);
        }
    }

    fn build(self) -> BTreeMap<String, ServerGroupSpec> {
        self.overrides
    }
}

fn pick<T>(elide_defaults: bool, normalized: (T, bool)) -> Option<T> {
    if elide_defaults {
        elide(normalized)
    } else {
        Some(normalized.0)
    }
}

/// 规范化值不同时返回具体值
fn differing<T: PartialEq + Clone>(base: &Option<T>, elided: &Option<T>, concrete: &Option<T>) -> Option<T> {
    if base != elided {
        concrete.clone()
    } else {
        None
    }
}
