//! Inventory 层：云状态查询服务抽象、名称解析缓存、原生表示到内部实体的翻译
//!
//! 所有后端（HTTP / Mock）实现 InventoryService；「不存在」以 KeelError::NotFound 表示，
//! 与其他传输 / 服务错误区分开。

pub mod adapter;
pub mod cache;
pub mod http;
pub mod mock;
pub mod types;

use async_trait::async_trait;

use crate::core::Result;

pub use adapter::to_server_group;
pub use cache::InventoryCache;
pub use http::HttpInventoryService;
pub use mock::MockInventoryService;
pub use types::{
    ActiveServerGroup, ActiveServerGroupImage, AutoScalingGroup, Credentials, EnabledMetric,
    InstanceMonitoring, LaunchConfig, Network, SecurityGroupSummary, Subnet, SuspendedProcess, Tag,
    APP_VERSION_TAG, BASE_IMAGE_VERSION_TAG,
};

/// 集群所在云平台
pub const CLOUD_PROVIDER: &str = "aws";

/// 云状态查询服务
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// 某区域内集群当前活跃的 server group；不存在时返回 NotFound
    async fn active_server_group(
        &self,
        application: &str,
        account: &str,
        cluster: &str,
        region: &str,
        cloud_provider: &str,
    ) -> Result<ActiveServerGroup>;

    async fn networks(&self, cloud_provider: &str) -> Result<Vec<Network>>;

    async fn subnets(&self, cloud_provider: &str) -> Result<Vec<Subnet>>;

    async fn security_groups(
        &self,
        account: &str,
        cloud_provider: &str,
        region: &str,
    ) -> Result<Vec<SecurityGroupSummary>>;

    async fn credentials(&self, account: &str) -> Result<Credentials>;
}
