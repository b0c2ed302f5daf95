//! Inventory 服务的原生表示（camelCase JSON），由 adapter 翻译为内部实体

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{BuildInfo, Capacity, Moniker};

/// 镜像上的应用版本标签（取 `/` 之前的部分）
pub const APP_VERSION_TAG: &str = "appversion";
/// 镜像上的基础镜像版本标签
pub const BASE_IMAGE_VERSION_TAG: &str = "base_ami_version";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveServerGroup {
    pub name: String,
    pub region: String,
    #[serde(default)]
    pub zones: BTreeSet<String>,
    pub image: ActiveServerGroupImage,
    pub launch_config: LaunchConfig,
    pub asg: AutoScalingGroup,
    pub vpc_id: String,
    #[serde(default)]
    pub target_groups: BTreeSet<String>,
    #[serde(default)]
    pub load_balancers: BTreeSet<String>,
    pub capacity: Capacity,
    #[serde(default = "default_cloud_provider")]
    pub cloud_provider: String,
    /// 安全组 id（不是名字）
    #[serde(default)]
    pub security_groups: BTreeSet<String>,
    pub account_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moniker: Option<Moniker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_info: Option<BuildInfo>,
}

fn default_cloud_provider() -> String {
    "aws".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveServerGroupImage {
    pub image_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl ActiveServerGroupImage {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    /// 应用版本；未打标签时为 None
    pub fn app_version(&self) -> Option<String> {
        self.tag(APP_VERSION_TAG).map(app_version_of)
    }

    pub fn base_image_version(&self) -> Option<String> {
        self.tag(BASE_IMAGE_VERSION_TAG).map(String::from)
    }
}

/// `fnord-1.0.0-h12.abc1234/JENKINS-job/12` → `fnord-1.0.0-h12.abc1234`
fn app_version_of(raw: &str) -> String {
    raw.split('/').next().unwrap_or(raw).to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ramdisk_id: Option<String>,
    #[serde(default)]
    pub ebs_optimized: bool,
    pub image_id: String,
    pub instance_type: String,
    pub key_name: String,
    pub iam_instance_profile: String,
    #[serde(default)]
    pub instance_monitoring: InstanceMonitoring,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceMonitoring {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoScalingGroup {
    pub auto_scaling_group_name: String,
    pub default_cooldown: u64,
    pub health_check_type: String,
    pub health_check_grace_period: u64,
    #[serde(default)]
    pub suspended_processes: Vec<SuspendedProcess>,
    #[serde(default)]
    pub enabled_metrics: Vec<EnabledMetric>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub termination_policies: Vec<String>,
    /// 逗号分隔的子网 id
    #[serde(rename = "vpczoneIdentifier")]
    pub vpc_zone_identifier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspendedProcess {
    pub process_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnabledMetric {
    pub metric: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub account: String,
    pub region: String,
    #[serde(default = "default_cloud_provider")]
    pub cloud_provider: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    pub id: String,
    pub vpc_id: String,
    pub account: String,
    pub region: String,
    pub availability_zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroupSummary {
    pub name: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub name: String,
    /// 默认密钥对模板，可包含区域占位符
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_key_pair: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(tags: &[(&str, &str)]) -> ActiveServerGroupImage {
        ActiveServerGroupImage {
            image_id: "ami-001".into(),
            name: None,
            tags: tags
                .iter()
                .map(|(k, v)| Tag {
                    key: k.to_string(),
                    value: v.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_app_version_strips_build_suffix() {
        let image = image(&[("appversion", "fnord-1.0.0-h12.abc1234/JENKINS-fnord-build/12")]);
        assert_eq!(image.app_version().as_deref(), Some("fnord-1.0.0-h12.abc1234"));
        assert_eq!(image.base_image_version(), None);
    }

    #[test]
    fn test_untagged_app_version_is_none() {
        let image = image(&[("base_ami_version", "nflx-base-5.378.0")]);
        assert_eq!(image.app_version(), None);
        assert_eq!(image.base_image_version().as_deref(), Some("nflx-base-5.378.0"));
    }

    #[test]
    fn test_deserializes_inventory_payload() {
        let json = serde_json::json!({
            "name": "fnord-test-v003",
            "region": "us-west-2",
            "zones": ["us-west-2b", "us-west-2a"],
            "image": {"imageId": "ami-001", "tags": []},
            "launchConfig": {
                "imageId": "ami-001",
                "instanceType": "m5.large",
                "keyName": "nf-keypair-test-us-west-2",
                "iamInstanceProfile": "fnordInstanceProfile",
                "instanceMonitoring": {"enabled": false}
            },
            "asg": {
                "autoScalingGroupName": "fnord-test-v003",
                "defaultCooldown": 10,
                "healthCheckType": "EC2",
                "healthCheckGracePeriod": 600,
                "vpczoneIdentifier": "subnet-1,subnet-2"
            },
            "vpcId": "vpc-1",
            "capacity": {"min": 1, "max": 1, "desired": 1},
            "accountName": "test"
        });
        let sg: ActiveServerGroup = serde_json::from_value(json).unwrap();
        assert_eq!(sg.cloud_provider, "aws");
        assert_eq!(sg.asg.vpc_zone_identifier, "subnet-1,subnet-2");
        assert_eq!(sg.zones.iter().next().map(String::as_str), Some("us-west-2a"));
    }
}
