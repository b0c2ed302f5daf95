//! HTTP Inventory 客户端
//!
//! 404 映射为 KeelError::NotFound，其余非 2xx 与传输错误映射为 KeelError::Inventory。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use super::{
    ActiveServerGroup, Credentials, InventoryService, Network, SecurityGroupSummary, Subnet,
};
use crate::config::InventorySection;
use crate::core::{KeelError, Result};

pub struct HttpInventoryService {
    client: Client,
    base_url: String,
}

impl HttpInventoryService {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| KeelError::Inventory(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(section: &InventorySection) -> Result<Self> {
        Self::new(&section.base_url, section.timeout_secs)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| KeelError::Inventory(format!("Request failed: {e}")))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(KeelError::NotFound(path.to_string())),
            status if !status.is_success() => {
                Err(KeelError::Inventory(format!("HTTP {status} from {path}")))
            }
            _ => resp
                .json::<T>()
                .await
                .map_err(|e| KeelError::Inventory(format!("Decode {path}: {e}"))),
        }
    }
}

#[async_trait]
impl InventoryService for HttpInventoryService {
    async fn active_server_group(
        &self,
        application: &str,
        account: &str,
        cluster: &str,
        region: &str,
        cloud_provider: &str,
    ) -> Result<ActiveServerGroup> {
        let path = format!(
            "/applications/{application}/clusters/{account}/{cluster}/{cloud_provider}/{region}/serverGroups/target/current_asg_dynamic"
        );
        self.get_json(&path, &[("onlyEnabled", "true")]).await
    }

    async fn networks(&self, cloud_provider: &str) -> Result<Vec<Network>> {
        self.get_json(&format!("/networks/{cloud_provider}"), &[]).await
    }

    async fn subnets(&self, cloud_provider: &str) -> Result<Vec<Subnet>> {
        self.get_json(&format!("/subnets/{cloud_provider}"), &[]).await
    }

    async fn security_groups(
        &self,
        account: &str,
        cloud_provider: &str,
        region: &str,
    ) -> Result<Vec<SecurityGroupSummary>> {
        self.get_json(
            &format!("/securityGroups/{account}/{cloud_provider}"),
            &[("region", region)],
        )
        .await
    }

    async fn credentials(&self, account: &str) -> Result<Credentials> {
        self.get_json(&format!("/credentials/{account}"), &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let service = HttpInventoryService::new("http://clouddriver:7002/", 5).unwrap();
        assert_eq!(service.base_url, "http://clouddriver:7002");
    }
}
