//! 领域模型：集群声明、单区域 server group、命名约定、资源信封

pub mod cluster;
pub mod moniker;
pub mod resource;
pub mod server_group;

pub use cluster::{
    ClusterLocations, ClusterSpec, DependenciesSpec, HealthSpec, ImageSpec,
    LaunchConfigurationSpec, RegionSpec, ServerGroupSpec,
};
pub use moniker::Moniker;
pub use resource::{Exportable, Resource, ResourceKind, ResourceMetadata, SubmittedResource};
pub use server_group::{
    BuildInfo, Capacity, ClusterDependencies, Health, HealthCheckType, LaunchConfiguration,
    Location, Metric, PropertyType, Scaling, ScalingProcess, ServerGroup, TerminationPolicy,
};
