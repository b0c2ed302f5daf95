//! Mock Inventory（用于测试，无需真实云环境）
//!
//! 内置一个小型固定世界：账号 test，区域 us-west-2 / us-east-1，各有 vpc0 与三个 internal 子网，
//! 以及 nf-infrastructure / nf-datacenter / fnord / extra-group 四个安全组。

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::types::{
    ActiveServerGroup, ActiveServerGroupImage, AutoScalingGroup, Credentials, InstanceMonitoring,
    LaunchConfig, Network, SecurityGroupSummary, Subnet, Tag,
};
use super::InventoryService;
use crate::core::{KeelError, Result};
use crate::model::{Capacity, Moniker};

pub const TEST_ACCOUNT: &str = "test";
pub const TEST_REGIONS: [&str; 2] = ["us-west-2", "us-east-1"];
pub const TEST_SUBNET_PURPOSE: &str = "internal (vpc0)";
pub const TEST_KEY_PAIR_TEMPLATE: &str = "nf-keypair-test-{{region}}";
const TEST_SECURITY_GROUPS: [&str; 4] = ["nf-infrastructure", "nf-datacenter", "fnord", "extra-group"];

/// 固定世界中某区域的 VPC id
pub fn test_vpc_id(region: &str) -> String {
    format!("vpc-{}", region_code(region))
}

/// 固定世界中安全组的 id
pub fn test_security_group_id(region: &str, name: &str) -> String {
    format!("sg-{}-{}", region_code(region), name)
}

/// 固定世界中某区域某可用区的子网 id
pub fn test_subnet_id(region: &str, zone_suffix: char) -> String {
    format!("subnet-{}{}", region_code(region), zone_suffix)
}

/// `us-west-2` → `usw2`
fn region_code(region: &str) -> String {
    let mut parts = region.split('-');
    let mut code = parts.next().unwrap_or_default().to_string();
    for part in parts {
        if part.chars().all(|c| c.is_ascii_digit()) {
            code.push_str(part);
        } else if let Some(first) = part.chars().next() {
            code.push(first);
        }
    }
    code
}

/// 与固定世界一致的活跃 server group 快照
pub fn sample_active_server_group(moniker: &Moniker, region: &str) -> ActiveServerGroup {
    let moniker = moniker.without_sequence().with_sequence(1);
    let name = moniker.server_group_name();
    ActiveServerGroup {
        name: name.clone(),
        region: region.to_string(),
        zones: ['a', 'b', 'c'].iter().map(|z| format!("{region}{z}")).collect(),
        image: ActiveServerGroupImage {
            image_id: "ami-001".into(),
            name: Some("fnord-1.0.0-h12.abc1234-x86_64-20200101000000-bionic-classic-hvm-sriov-ebs".into()),
            tags: vec![
                Tag {
                    key: "appversion".into(),
                    value: "fnord-1.0.0-h12.abc1234/JENKINS-fnord-build/12".into(),
                },
                Tag {
                    key: "base_ami_version".into(),
                    value: "nflx-base-5.378.0-h1230.8808866".into(),
                },
            ],
        },
        launch_config: LaunchConfig {
            ramdisk_id: None,
            ebs_optimized: false,
            image_id: "ami-001".into(),
            instance_type: "m5.large".into(),
            key_name: TEST_KEY_PAIR_TEMPLATE.replace("{{region}}", region),
            iam_instance_profile: format!("{}InstanceProfile", moniker.app),
            instance_monitoring: InstanceMonitoring { enabled: false },
        },
        asg: AutoScalingGroup {
            auto_scaling_group_name: name,
            default_cooldown: 10,
            health_check_type: "EC2".into(),
            health_check_grace_period: 600,
            suspended_processes: Vec::new(),
            enabled_metrics: Vec::new(),
            tags: vec![Tag {
                key: "aws:cloudformation:stack-name".into(),
                value: "ignored".into(),
            }],
            termination_policies: vec!["OldestInstance".into()],
            vpc_zone_identifier: ['a', 'b', 'c']
                .iter()
                .map(|z| test_subnet_id(region, *z))
                .collect::<Vec<_>>()
                .join(","),
        },
        vpc_id: test_vpc_id(region),
        target_groups: BTreeSet::new(),
        load_balancers: BTreeSet::new(),
        capacity: Capacity::new(1, 1, 1),
        cloud_provider: "aws".into(),
        security_groups: ["nf-infrastructure", "nf-datacenter", moniker.app.as_str()]
            .iter()
            .map(|n| test_security_group_id(region, n))
            .collect(),
        account_name: TEST_ACCOUNT.into(),
        moniker: Some(moniker),
        build_info: None,
    }
}

/// Mock Inventory：内存中的网络 / 子网 / 安全组 / 账号 与活跃 server group
#[derive(Default)]
pub struct MockInventoryService {
    networks: Vec<Network>,
    subnets: Vec<Subnet>,
    security_groups: HashMap<(String, String), Vec<SecurityGroupSummary>>,
    credentials: HashMap<String, Option<String>>,
    /// (cluster, region) → 活跃 server group
    server_groups: Mutex<HashMap<(String, String), ActiveServerGroup>>,
    /// 这些区域的查询返回服务错误（非 NotFound）
    failing_regions: Mutex<HashSet<String>>,
    subnet_calls: AtomicUsize,
    active_calls: AtomicUsize,
}

impl MockInventoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置固定世界（不含任何活跃 server group）
    pub fn with_test_fixtures() -> Self {
        let mut mock = Self::new();
        for region in TEST_REGIONS {
            let vpc_id = test_vpc_id(region);
            mock.networks.push(Network {
                id: vpc_id.clone(),
                name: Some("vpc0".into()),
                account: TEST_ACCOUNT.into(),
                region: region.into(),
                cloud_provider: "aws".into(),
            });
            for zone in ['a', 'b', 'c'] {
                mock.subnets.push(Subnet {
                    id: test_subnet_id(region, zone),
                    vpc_id: vpc_id.clone(),
                    account: TEST_ACCOUNT.into(),
                    region: region.into(),
                    availability_zone: format!("{region}{zone}"),
                    purpose: Some(TEST_SUBNET_PURPOSE.into()),
                });
            }
            let groups = TEST_SECURITY_GROUPS
                .iter()
                .map(|name| SecurityGroupSummary {
                    name: name.to_string(),
                    id: test_security_group_id(region, name),
                    vpc_id: Some(vpc_id.clone()),
                })
                .collect();
            mock.security_groups
                .insert((TEST_ACCOUNT.to_string(), region.to_string()), groups);
        }
        mock.credentials
            .insert(TEST_ACCOUNT.into(), Some(TEST_KEY_PAIR_TEMPLATE.into()));
        mock
    }

    pub fn with_server_group(self, cluster: &str, server_group: ActiveServerGroup) -> Self {
        self.set_server_group(cluster, server_group);
        self
    }

    pub fn set_server_group(&self, cluster: &str, server_group: ActiveServerGroup) {
        let key = (cluster.to_string(), server_group.region.clone());
        lock(&self.server_groups).insert(key, server_group);
    }

    pub fn remove_server_group(&self, cluster: &str, region: &str) {
        lock(&self.server_groups).remove(&(cluster.to_string(), region.to_string()));
    }

    pub fn fail_region(&self, region: &str) {
        lock(&self.failing_regions).insert(region.to_string());
    }

    pub fn subnet_calls(&self) -> usize {
        self.subnet_calls.load(Ordering::SeqCst)
    }

    pub fn active_calls(&self) -> usize {
        self.active_calls.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl InventoryService for MockInventoryService {
    async fn active_server_group(
        &self,
        _application: &str,
        account: &str,
        cluster: &str,
        region: &str,
        _cloud_provider: &str,
    ) -> Result<ActiveServerGroup> {
        self.active_calls.fetch_add(1, Ordering::SeqCst);
        if lock(&self.failing_regions).contains(region) {
            return Err(KeelError::Inventory(format!("503 Service Unavailable for {region}")));
        }
        lock(&self.server_groups)
            .get(&(cluster.to_string(), region.to_string()))
            .filter(|sg| sg.account_name == account)
            .cloned()
            .ok_or_else(|| KeelError::NotFound(format!("{cluster} in {account}/{region}")))
    }

    async fn networks(&self, _cloud_provider: &str) -> Result<Vec<Network>> {
        Ok(self.networks.clone())
    }

    async fn subnets(&self, _cloud_provider: &str) -> Result<Vec<Subnet>> {
        self.subnet_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.subnets.clone())
    }

    async fn security_groups(
        &self,
        account: &str,
        _cloud_provider: &str,
        region: &str,
    ) -> Result<Vec<SecurityGroupSummary>> {
        Ok(self
            .security_groups
            .get(&(account.to_string(), region.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn credentials(&self, account: &str) -> Result<Credentials> {
        match self.credentials.get(account) {
            Some(default_key_pair) => Ok(Credentials {
                name: account.to_string(),
                default_key_pair: default_key_pair.clone(),
            }),
            None => Err(KeelError::NotFound(format!("account {account}"))),
        }
    }
}
