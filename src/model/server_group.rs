//! 单区域 server group 实体（desired 与 current 共用）

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::Moniker;
use crate::diff::Diffable;

/// 默认冷却时间（秒）
pub const DEFAULT_COOLDOWN_SECONDS: u64 = 10;
/// 默认预热 / 健康检查宽限时间（秒）
pub const DEFAULT_WARMUP_SECONDS: u64 = 600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerGroup {
    /// 集群名（不含序号）
    pub name: String,
    /// 身份信息；current 中带序号，不参与 diff
    pub moniker: Moniker,
    pub location: Location,
    pub launch_configuration: LaunchConfiguration,
    pub capacity: Capacity,
    pub dependencies: ClusterDependencies,
    pub health: Health,
    pub scaling: Scaling,
    pub tags: BTreeMap<String, String>,
    /// 构建来源，只读快照信息，不参与 diff
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_info: Option<BuildInfo>,
}

impl ServerGroup {
    pub fn region(&self) -> &str {
        &self.location.region
    }

    pub fn account(&self) -> &str {
        &self.location.account
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub account: String,
    pub region: String,
    /// VPC 名称（如 vpc0）
    pub vpc: String,
    /// 子网用途（如 "internal (vpc0)"）
    pub subnet: String,
    pub availability_zones: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfiguration {
    pub image_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_image_version: Option<String>,
    pub instance_type: String,
    pub ebs_optimized: bool,
    pub iam_role: String,
    pub key_pair: String,
    pub instance_monitoring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ramdisk_id: Option<String>,
}

/// 容量；min ≤ desired ≤ max 由上游校验
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub min: u32,
    pub max: u32,
    pub desired: u32,
}

impl LaunchConfiguration {
    /// 以 self 为 desired 比较；desired 未声明的版本标签不参与比较
    pub fn matches(&self, current: &LaunchConfiguration) -> bool {
        let declared = |desired: &Option<String>, observed: &Option<String>| {
            desired.is_none() || desired == observed
        };
        declared(&self.app_version, &current.app_version)
            && declared(&self.base_image_version, &current.base_image_version)
            && LaunchConfiguration {
                app_version: None,
                base_image_version: None,
                ..self.clone()
            } == LaunchConfiguration {
                app_version: None,
                base_image_version: None,
                ..current.clone()
            }
    }
}

impl Capacity {
    pub fn new(min: u32, max: u32, desired: u32) -> Self {
        Self { min, max, desired }
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

/// 负载均衡、安全组、目标组依赖（集合语义，顺序无关）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDependencies {
    #[serde(default)]
    pub load_balancer_names: BTreeSet<String>,
    #[serde(default)]
    pub security_group_names: BTreeSet<String>,
    #[serde(default)]
    pub target_group_names: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthCheckType {
    Ec2,
    Elb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    GroupMinSize,
    GroupMaxSize,
    GroupDesiredCapacity,
    GroupInServiceInstances,
    GroupPendingInstances,
    GroupStandbyInstances,
    GroupTerminatingInstances,
    GroupTotalInstances,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TerminationPolicy {
    OldestInstance,
    NewestInstance,
    OldestLaunchConfiguration,
    OldestLaunchTemplate,
    ClosestToNextInstanceHour,
    AllocationStrategy,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub cooldown_seconds: u64,
    pub warmup_seconds: u64,
    pub health_check_type: HealthCheckType,
    pub enabled_metrics: BTreeSet<Metric>,
    pub termination_policies: BTreeSet<TerminationPolicy>,
}

impl Default for Health {
    fn default() -> Self {
        Self {
            cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
            warmup_seconds: DEFAULT_WARMUP_SECONDS,
            health_check_type: HealthCheckType::Ec2,
            enabled_metrics: BTreeSet::new(),
            termination_policies: BTreeSet::from([TerminationPolicy::OldestInstance]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScalingProcess {
    Launch,
    Terminate,
    AddToLoadBalancer,
    AlarmNotification,
    AZRebalance,
    HealthCheck,
    InstanceRefresh,
    ReplaceUnhealthy,
    ScheduledActions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scaling {
    #[serde(default)]
    pub suspended_processes: BTreeSet<ScalingProcess>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_number: Option<String>,
}

/// ServerGroup 顶层属性的语义类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Name,
    Location,
    LaunchConfiguration,
    Capacity,
    Dependencies,
    Health,
    Scaling,
    Tags,
}

/// moniker 序号与 build_info 是观测到的身份 / 来源信息，不参与比较；
/// self 为 desired，镜像版本标签只在 desired 声明时比较
impl Diffable for ServerGroup {
    type Property = PropertyType;

    fn changed_properties(&self, other: &Self) -> BTreeSet<PropertyType> {
        let checks = [
            (PropertyType::Name, self.name == other.name),
            (PropertyType::Location, self.location == other.location),
            (
                PropertyType::LaunchConfiguration,
                self.launch_configuration.matches(&other.launch_configuration),
            ),
            (PropertyType::Capacity, self.capacity == other.capacity),
            (PropertyType::Dependencies, self.dependencies == other.dependencies),
            (PropertyType::Health, self.health == other.health),
            (PropertyType::Scaling, self.scaling == other.scaling),
            (PropertyType::Tags, self.tags == other.tags),
        ];
        checks
            .into_iter()
            .filter(|(_, equal)| !equal)
            .map(|(property, _)| property)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ResourceDiff;

    fn server_group() -> ServerGroup {
        ServerGroup {
            name: "fnord-test".into(),
            moniker: Moniker::new("fnord").with_stack("test"),
            location: Location {
                account: "test".into(),
                region: "us-west-2".into(),
                vpc: "vpc0".into(),
                subnet: "internal (vpc0)".into(),
                availability_zones: ["us-west-2a", "us-west-2b"].iter().map(|s| s.to_string()).collect(),
            },
            launch_configuration: LaunchConfiguration {
                image_id: "ami-001".into(),
                app_version: Some("fnord-1.0.0-h1".into()),
                base_image_version: Some("nflx-base-5.378.0".into()),
                instance_type: "m5.large".into(),
                ebs_optimized: true,
                iam_role: "fnordInstanceProfile".into(),
                key_pair: "nf-keypair-test-us-west-2".into(),
                instance_monitoring: false,
                ramdisk_id: None,
            },
            capacity: Capacity::default(),
            dependencies: ClusterDependencies::default(),
            health: Health::default(),
            scaling: Scaling::default(),
            tags: BTreeMap::new(),
            build_info: None,
        }
    }

    #[test]
    fn test_identity_and_provenance_are_ignored() {
        let desired = server_group();
        let mut current = server_group();
        current.moniker = current.moniker.with_sequence(3);
        current.build_info = Some(BuildInfo {
            package_name: Some("fnord".into()),
            version: None,
            commit: None,
            job_name: None,
            build_number: Some("42".into()),
        });

        assert!(!ResourceDiff::new(desired, Some(current)).has_changes());
    }

    #[test]
    fn test_undeclared_image_versions_are_ignored() {
        let mut desired = server_group();
        desired.launch_configuration.app_version = None;
        desired.launch_configuration.base_image_version = None;
        assert!(!ResourceDiff::new(desired.clone(), Some(server_group())).has_changes());

        let mut current = server_group();
        current.launch_configuration.image_id = "ami-002".into();
        let diff = ResourceDiff::new(desired, Some(current));
        assert!(diff.only_affects(&[PropertyType::LaunchConfiguration]));
    }

    #[test]
    fn test_declared_app_version_is_compared() {
        let mut desired = server_group();
        desired.launch_configuration.app_version = Some("fnord-1.0.1-h2".into());
        let diff = ResourceDiff::new(desired, Some(server_group()));
        assert!(diff.only_affects(&[PropertyType::LaunchConfiguration]));
    }

    #[test]
    fn test_capacity_only_change() {
        let desired = ServerGroup {
            capacity: Capacity::new(2, 4, 3),
            ..server_group()
        };
        let diff = ResourceDiff::new(desired, Some(server_group()));
        assert!(diff.only_affects(&[PropertyType::Capacity]));
    }

    #[test]
    fn test_set_valued_fields_ignore_order() {
        let mut desired = server_group();
        desired.health.enabled_metrics = [Metric::GroupMaxSize, Metric::GroupMinSize].into_iter().collect();
        let mut current = server_group();
        current.health.enabled_metrics = [Metric::GroupMinSize, Metric::GroupMaxSize].into_iter().collect();

        assert!(desired.changed_properties(&current).is_empty());
    }
}
