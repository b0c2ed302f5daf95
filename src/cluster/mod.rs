//! EC2 集群资源处理器
//!
//! 一个 ClusterSpec 覆盖多个区域：desired / current 都是 region → ServerGroup 的映射，
//! diff 按区域拆分，每个有差异的区域独立生成并提交一个作业。

pub mod conventions;
pub mod export;
pub mod job_builder;
pub mod resolver;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::core::{KeelError, RegionScheduler, Result};
use crate::diff::ResourceDiff;
use crate::handler::{ResourceHandler, Submission};
use crate::inventory::{to_server_group, InventoryCache, InventoryService, CLOUD_PROVIDER};
use crate::model::{
    ClusterSpec, Exportable, Moniker, Resource, ResourceKind, ServerGroup, SubmittedResource,
};
use crate::orchestration::{correlation_id, OrchestrationService, Task, TaskLauncher};

pub use conventions::Conventions;
pub use job_builder::JobBuilder;
pub use resolver::{resolve, ResolverContext};

pub const CLUSTER_API_VERSION: &str = "ec2.spinnaker.netflix.com/v1";
pub const CLUSTER_KIND: &str = "cluster";

pub fn cluster_kind() -> ResourceKind {
    ResourceKind::new(CLUSTER_API_VERSION, CLUSTER_KIND)
}

/// `ec2:cluster:{account}:{cluster}`
pub fn cluster_resource_id(account: &str, moniker: &Moniker) -> String {
    format!("ec2:cluster:{account}:{}", moniker.cluster_name())
}

pub struct ClusterHandler {
    cache: Arc<InventoryCache>,
    launcher: TaskLauncher,
    jobs: JobBuilder,
    conventions: Arc<Conventions>,
    scheduler: RegionScheduler,
}

impl ClusterHandler {
    pub fn new(
        inventory: Arc<dyn InventoryService>,
        orchestration: Arc<dyn OrchestrationService>,
        config: &AppConfig,
    ) -> Self {
        let cache = Arc::new(InventoryCache::new(inventory));
        let conventions = Arc::new(Conventions::from_config(&config.conventions));
        Self {
            jobs: JobBuilder::new(Arc::clone(&cache), Arc::clone(&conventions)),
            launcher: TaskLauncher::new(orchestration),
            scheduler: RegionScheduler::new(config.reconcile.max_concurrent_regions),
            cache,
            conventions,
        }
    }

    /// 收集解析所需的外部元数据；之后的解析是纯函数
    async fn resolver_context(&self, spec: &ClusterSpec) -> Result<ResolverContext> {
        let locations = &spec.locations;
        let key_pair_template = self.cache.default_key_pair(&locations.account).await?;

        let mut available_zones = BTreeMap::new();
        for region in locations.regions.iter().filter(|r| r.availability_zones.is_empty()) {
            let zones = self
                .available_zones(&locations.account, &region.name, &locations.vpc, &locations.subnet)
                .await?;
            available_zones.insert(region.name.clone(), zones);
        }

        Ok(ResolverContext {
            key_pair_template,
            available_zones,
        })
    }

    async fn available_zones(
        &self,
        account: &str,
        region: &str,
        vpc: &str,
        subnet: &str,
    ) -> Result<BTreeSet<String>> {
        let vpc_id = self.cache.network_by_name(account, region, vpc).await?.id;
        self.cache
            .availability_zones(account, &vpc_id, subnet, region)
            .await
    }

    /// 并发查询各区域；NotFound 视为该区域缺席，其他错误在全部完成后上抛
    async fn observe_regions(
        &self,
        application: &str,
        account: &str,
        cluster: &str,
        regions: Vec<String>,
    ) -> Result<BTreeMap<String, ServerGroup>> {
        let results = self
            .scheduler
            .run_all(regions, |region| async move {
                let snapshot = match self
                    .cache
                    .service()
                    .active_server_group(application, account, cluster, &region, CLOUD_PROVIDER)
                    .await
                {
                    Ok(snapshot) => snapshot,
                    Err(e) if e.is_not_found() => {
                        tracing::debug!(cluster, region = %region, "no active server group");
                        return Ok(None);
                    }
                    Err(e) => return Err(e),
                };
                to_server_group(&snapshot, &self.cache)
                    .await
                    .map(|server_group| Some((region, server_group)))
            })
            .await;

        let mut observed = BTreeMap::new();
        for result in results {
            if let Some((region, server_group)) = result? {
                observed.insert(region, server_group);
            }
        }
        Ok(observed)
    }

    async fn submit(
        &self,
        resource: &Resource<ClusterSpec>,
        region: &str,
        diff: &ResourceDiff<ServerGroup>,
    ) -> Result<Task> {
        let job = self.jobs.build(diff).await?;
        let description = job_builder::describe(diff);
        self.launcher
            .submit_job(
                resource.application(),
                resource.service_account(),
                &description,
                &correlation_id(resource.id(), region),
                job,
            )
            .await
    }
}

#[async_trait]
impl ResourceHandler for ClusterHandler {
    type Spec = ClusterSpec;
    type Resolved = BTreeMap<String, ServerGroup>;

    fn supported_kind(&self) -> ResourceKind {
        cluster_kind()
    }

    async fn resolve(&self, resource: &Resource<ClusterSpec>) -> Result<Self::Resolved> {
        let ctx = self.resolver_context(&resource.spec).await?;
        resolve(&resource.spec, &ctx, &self.conventions)
    }

    async fn observe(&self, resource: &Resource<ClusterSpec>) -> Result<Self::Resolved> {
        let spec = &resource.spec;
        self.observe_regions(
            spec.application(),
            &spec.locations.account,
            &spec.cluster_name(),
            spec.region_names().map(String::from).collect(),
        )
        .await
    }

    async fn upsert(
        &self,
        resource: &Resource<ClusterSpec>,
        diff: &ResourceDiff<Self::Resolved>,
    ) -> Result<Vec<Submission>> {
        let pending: Vec<_> = diff
            .by_key()
            .into_iter()
            .filter(|(_, region_diff)| region_diff.has_changes())
            .collect();

        let submissions = self
            .scheduler
            .run_all(pending, |(region, region_diff)| async move {
                let outcome = self.submit(resource, &region, &region_diff).await;
                Submission { region, outcome }
            })
            .await;
        Ok(submissions)
    }

    async fn actuation_in_progress(&self, resource: &Resource<ClusterSpec>) -> Result<bool> {
        let results = self
            .scheduler
            .run_all(resource.spec.region_names(), |region| async move {
                self.launcher
                    .correlated_tasks_running(&correlation_id(resource.id(), region))
                    .await
            })
            .await;

        for running in results {
            if running? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn export(&self, exportable: &Exportable) -> Result<SubmittedResource<ClusterSpec>> {
        let account = exportable.account.as_str();
        let cluster = exportable.moniker.cluster_name();
        let current = self
            .observe_regions(
                &exportable.moniker.app,
                account,
                &cluster,
                exportable.regions.iter().cloned().collect(),
            )
            .await?;
        if current.is_empty() {
            return Err(KeelError::ResourceNotFound(format!(
                "cluster {cluster} in account {account}"
            )));
        }

        let mut ctx = ResolverContext {
            key_pair_template: self.cache.default_key_pair(account).await?,
            available_zones: BTreeMap::new(),
        };
        for (region, server_group) in &current {
            let location = &server_group.location;
            let zones = self
                .available_zones(account, region, &location.vpc, &location.subnet)
                .await?;
            ctx.available_zones.insert(region.clone(), zones);
        }

        let spec = export::export_cluster(&current, &ctx, &self.conventions)?;
        tracing::info!(
            cluster = %cluster,
            regions = current.len(),
            overrides = spec.overrides.len(),
            "exported cluster"
        );

        Ok(SubmittedResource {
            api_version: CLUSTER_API_VERSION.to_string(),
            kind: CLUSTER_KIND.to_string(),
            service_account: exportable.service_account.clone(),
            spec,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id() {
        let moniker = Moniker::new("fnord").with_stack("test").with_detail("canary");
        assert_eq!(cluster_resource_id("prod", &moniker), "ec2:cluster:prod:fnord-test-canary");
    }

    #[test]
    fn test_kind() {
        assert_eq!(cluster_kind().to_string(), "ec2.spinnaker.netflix.com/v1/cluster");
    }
}
