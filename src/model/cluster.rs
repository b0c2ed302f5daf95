//! 集群声明模型：base 默认值 + 按区域的稀疏覆盖
//!
//! 所有字段均可缺省：覆盖中出现的字段只替换该区域的 base 字段，缺省字段继承 base。

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{Capacity, HealthCheckType, Metric, Moniker, Scaling, TerminationPolicy};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub moniker: Moniker,
    pub locations: ClusterLocations,
    /// base 规格，平铺在顶层
    #[serde(flatten)]
    pub defaults: ServerGroupSpec,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, ServerGroupSpec>,
}

impl ClusterSpec {
    pub fn application(&self) -> &str {
        &self.moniker.app
    }

    pub fn cluster_name(&self) -> String {
        self.moniker.cluster_name()
    }

    pub fn region_names(&self) -> impl Iterator<Item = &str> {
        self.locations.regions.iter().map(|r| r.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterLocations {
    pub account: String,
    #[serde(default = "default_vpc")]
    pub vpc: String,
    #[serde(default = "default_subnet")]
    pub subnet: String,
    pub regions: BTreeSet<RegionSpec>,
}

pub fn default_vpc() -> String {
    "vpc0".to_string()
}

pub fn default_subnet() -> String {
    "internal (vpc0)".to_string()
}

/// 区域声明；可用区为空表示「该区域全部可用区」
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub availability_zones: BTreeSet<String>,
}

impl RegionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            availability_zones: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerGroupSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_configuration: Option<LaunchConfigurationSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<Capacity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependenciesSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling: Option<Scaling>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

impl ServerGroupSpec {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// 按字段合并：覆盖中存在的字段胜出，其余继承 self
    pub fn merged_with(&self, overrides: &ServerGroupSpec) -> ServerGroupSpec {
        ServerGroupSpec {
            launch_configuration: merge_nested(
                &self.launch_configuration,
                &overrides.launch_configuration,
                LaunchConfigurationSpec::merged_with,
            ),
            capacity: overrides.capacity.or(self.capacity),
            dependencies: merge_nested(
                &self.dependencies,
                &overrides.dependencies,
                DependenciesSpec::merged_with,
            ),
            health: merge_nested(&self.health, &overrides.health, HealthSpec::merged_with),
            scaling: overrides.scaling.clone().or_else(|| self.scaling.clone()),
            tags: overrides.tags.clone().or_else(|| self.tags.clone()),
        }
    }
}

fn merge_nested<T: Clone>(base: &Option<T>, overrides: &Option<T>, merge: fn(&T, &T) -> T) -> Option<T> {
    match (base, overrides) {
        (Some(b), Some(o)) => Some(merge(b, o)),
        (None, Some(o)) => Some(o.clone()),
        (b, None) => b.clone(),
    }
}

/// 镜像引用（版本解析策略在外部，这里只承载结果）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_image_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfigurationSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebs_optimized: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_pair: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_monitoring: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ramdisk_id: Option<String>,
}

impl LaunchConfigurationSpec {
    pub fn merged_with(&self, o: &LaunchConfigurationSpec) -> LaunchConfigurationSpec {
        LaunchConfigurationSpec {
            image: o.image.clone().or_else(|| self.image.clone()),
            instance_type: o.instance_type.clone().or_else(|| self.instance_type.clone()),
            ebs_optimized: o.ebs_optimized.or(self.ebs_optimized),
            iam_role: o.iam_role.clone().or_else(|| self.iam_role.clone()),
            key_pair: o.key_pair.clone().or_else(|| self.key_pair.clone()),
            instance_monitoring: o.instance_monitoring.or(self.instance_monitoring),
            ramdisk_id: o.ramdisk_id.clone().or_else(|| self.ramdisk_id.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependenciesSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer_names: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_group_names: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_group_names: Option<BTreeSet<String>>,
}

impl DependenciesSpec {
    pub fn merged_with(&self, o: &DependenciesSpec) -> DependenciesSpec {
        DependenciesSpec {
            load_balancer_names: o
                .load_balancer_names
                .clone()
                .or_else(|| self.load_balancer_names.clone()),
            security_group_names: o
                .security_group_names
                .clone()
                .or_else(|| self.security_group_names.clone()),
            target_group_names: o
                .target_group_names
                .clone()
                .or_else(|| self.target_group_names.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warmup_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_type: Option<HealthCheckType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_metrics: Option<BTreeSet<Metric>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_policies: Option<BTreeSet<TerminationPolicy>>,
}

impl HealthSpec {
    pub fn merged_with(&self, o: &HealthSpec) -> HealthSpec {
        HealthSpec {
            cooldown_seconds: o.cooldown_seconds.or(self.cooldown_seconds),
            warmup_seconds: o.warmup_seconds.or(self.warmup_seconds),
            health_check_type: o.health_check_type.or(self.health_check_type),
            enabled_metrics: o.enabled_metrics.clone().or_else(|| self.enabled_metrics.clone()),
            termination_policies: o
                .termination_policies
                .clone()
                .or_else(|| self.termination_policies.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins_field_by_field() {
        let base = ServerGroupSpec {
            launch_configuration: Some(LaunchConfigurationSpec {
                instance_type: Some("m5.large".into()),
                iam_role: Some("fnordInstanceProfile".into()),
                ..Default::default()
            }),
            capacity: Some(Capacity::new(1, 1, 1)),
            ..Default::default()
        };
        let overrides = ServerGroupSpec {
            launch_configuration: Some(LaunchConfigurationSpec {
                iam_role: Some("customRole".into()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let merged = base.merged_with(&overrides);
        let lc = merged.launch_configuration.unwrap();
        assert_eq!(lc.instance_type.as_deref(), Some("m5.large"));
        assert_eq!(lc.iam_role.as_deref(), Some("customRole"));
        assert_eq!(merged.capacity, Some(Capacity::new(1, 1, 1)));
    }

    #[test]
    fn test_defaults_flatten_into_document() {
        let yaml = r#"
moniker:
  app: fnord
  stack: test
locations:
  account: test
  regions:
    - name: us-west-2
capacity:
  min: 1
  max: 2
  desired: 1
overrides:
  us-west-2:
    capacity:
      min: 2
      max: 2
      desired: 2
"#;
        let spec: ClusterSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.locations.vpc, "vpc0");
        assert_eq!(spec.defaults.capacity, Some(Capacity::new(1, 2, 1)));
        assert_eq!(spec.overrides["us-west-2"].capacity, Some(Capacity::new(2, 2, 2)));
    }
}
