//! 名称解析缓存
//!
//! VPC / 子网 / 安全组 / 账号属性这类基础设施元数据变化极少，按需拉取一次后保存在内存中。
//! 解析不到时返回 ResourceNotFound（硬失败）：这里的缺失代表元数据引用不一致，
//! 与 observe 中「区域暂时没有 server group」是两回事。

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{InventoryService, Network, SecurityGroupSummary, Subnet, CLOUD_PROVIDER};
use crate::core::{KeelError, Result};

pub struct InventoryCache {
    service: Arc<dyn InventoryService>,
    networks: RwLock<Option<Arc<Vec<Network>>>>,
    subnets: RwLock<Option<Arc<Vec<Subnet>>>>,
    /// (account, region) → 安全组摘要
    security_groups: RwLock<HashMap<(String, String), Arc<Vec<SecurityGroupSummary>>>>,
    /// account → 默认密钥对模板
    key_pairs: RwLock<HashMap<String, String>>,
}

impl InventoryCache {
    pub fn new(service: Arc<dyn InventoryService>) -> Self {
        Self {
            service,
            networks: RwLock::new(None),
            subnets: RwLock::new(None),
            security_groups: RwLock::new(HashMap::new()),
            key_pairs: RwLock::new(HashMap::new()),
        }
    }

    /// 底层服务（活跃状态查询不缓存）
    pub fn service(&self) -> &Arc<dyn InventoryService> {
        &self.service
    }

    async fn all_networks(&self) -> Result<Arc<Vec<Network>>> {
        if let Some(networks) = self.networks.read().await.as_ref() {
            return Ok(Arc::clone(networks));
        }
        let networks = Arc::new(self.service.networks(CLOUD_PROVIDER).await?);
        *self.networks.write().await = Some(Arc::clone(&networks));
        Ok(networks)
    }

    async fn all_subnets(&self) -> Result<Arc<Vec<Subnet>>> {
        if let Some(subnets) = self.subnets.read().await.as_ref() {
            return Ok(Arc::clone(subnets));
        }
        let subnets = Arc::new(self.service.subnets(CLOUD_PROVIDER).await?);
        *self.subnets.write().await = Some(Arc::clone(&subnets));
        Ok(subnets)
    }

    async fn security_groups_in(
        &self,
        account: &str,
        region: &str,
    ) -> Result<Arc<Vec<SecurityGroupSummary>>> {
        let key = (account.to_string(), region.to_string());
        if let Some(groups) = self.security_groups.read().await.get(&key) {
            return Ok(Arc::clone(groups));
        }
        let groups = Arc::new(
            self.service
                .security_groups(account, CLOUD_PROVIDER, region)
                .await?,
        );
        self.security_groups
            .write()
            .await
            .insert(key, Arc::clone(&groups));
        Ok(groups)
    }

    pub async fn network_by_id(&self, vpc_id: &str) -> Result<Network> {
        self.all_networks()
            .await?
            .iter()
            .find(|n| n.id == vpc_id)
            .cloned()
            .ok_or_else(|| KeelError::ResourceNotFound(format!("VPC {vpc_id}")))
    }

    pub async fn network_by_name(&self, account: &str, region: &str, name: &str) -> Result<Network> {
        self.all_networks()
            .await?
            .iter()
            .find(|n| n.account == account && n.region == region && n.name.as_deref() == Some(name))
            .cloned()
            .ok_or_else(|| {
                KeelError::ResourceNotFound(format!("VPC named {name} in {account}/{region}"))
            })
    }

    pub async fn subnet_by_id(&self, subnet_id: &str) -> Result<Subnet> {
        self.all_subnets()
            .await?
            .iter()
            .find(|s| s.id == subnet_id)
            .cloned()
            .ok_or_else(|| KeelError::ResourceNotFound(format!("subnet {subnet_id}")))
    }

    /// 子网用途；未标注用途的子网同样视为解析失败
    pub async fn subnet_purpose(&self, subnet_id: &str) -> Result<String> {
        self.subnet_by_id(subnet_id).await?.purpose.ok_or_else(|| {
            KeelError::ResourceNotFound(format!("purpose of subnet {subnet_id}"))
        })
    }

    pub async fn security_group_by_id(
        &self,
        account: &str,
        region: &str,
        id: &str,
    ) -> Result<SecurityGroupSummary> {
        self.security_groups_in(account, region)
            .await?
            .iter()
            .find(|g| g.id == id)
            .cloned()
            .ok_or_else(|| {
                KeelError::ResourceNotFound(format!("security group {id} in {account}/{region}"))
            })
    }

    pub async fn security_group_by_name(
        &self,
        account: &str,
        region: &str,
        vpc_id: &str,
        name: &str,
    ) -> Result<SecurityGroupSummary> {
        self.security_groups_in(account, region)
            .await?
            .iter()
            .find(|g| g.name == name && g.vpc_id.as_deref().map_or(true, |v| v == vpc_id))
            .cloned()
            .ok_or_else(|| {
                KeelError::ResourceNotFound(format!(
                    "security group {name} in {account}/{region}/{vpc_id}"
                ))
            })
    }

    /// 账号配置的默认密钥对模板
    pub async fn default_key_pair(&self, account: &str) -> Result<String> {
        if let Some(template) = self.key_pairs.read().await.get(account) {
            return Ok(template.clone());
        }
        let template = self
            .service
            .credentials(account)
            .await?
            .default_key_pair
            .ok_or_else(|| {
                KeelError::ResourceNotFound(format!("default key pair for account {account}"))
            })?;
        self.key_pairs
            .write()
            .await
            .insert(account.to_string(), template.clone());
        Ok(template)
    }

    /// 某账号 / VPC / 子网用途 / 区域下可用的全部可用区
    pub async fn availability_zones(
        &self,
        account: &str,
        vpc_id: &str,
        purpose: &str,
        region: &str,
    ) -> Result<BTreeSet<String>> {
        Ok(self
            .all_subnets()
            .await?
            .iter()
            .filter(|s| {
                s.account == account
                    && s.vpc_id == vpc_id
                    && s.region == region
                    && s.purpose.as_deref() == Some(purpose)
            })
            .map(|s| s.availability_zone.clone())
            .collect())
    }
}
