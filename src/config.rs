//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `KEEL__*` 覆盖（双下划线表示嵌套，如 `KEEL__INVENTORY__BASE_URL=http://clouddriver:7002`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub inventory: InventorySection,
    #[serde(default)]
    pub orchestration: OrchestrationSection,
    #[serde(default)]
    pub conventions: ConventionsSection,
    #[serde(default)]
    pub reconcile: ReconcileSection,
}

/// [inventory] 段：云状态查询服务
#[derive(Debug, Clone, Deserialize)]
pub struct InventorySection {
    #[serde(default = "default_inventory_url")]
    pub base_url: String,
    /// 单次请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl Default for InventorySection {
    fn default() -> Self {
        Self {
            base_url: default_inventory_url(),
            timeout_secs: default_request_timeout(),
        }
    }
}

fn default_inventory_url() -> String {
    "http://localhost:7002".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// [orchestration] 段：任务编排后端
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestrationSection {
    #[serde(default = "default_orchestration_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl Default for OrchestrationSection {
    fn default() -> Self {
        Self {
            base_url: default_orchestration_url(),
            timeout_secs: default_request_timeout(),
        }
    }
}

fn default_orchestration_url() -> String {
    "http://localhost:8083".to_string()
}

/// [conventions] 段：命名约定，用于默认值推导与导出时的默认值省略
#[derive(Debug, Clone, Deserialize)]
pub struct ConventionsSection {
    /// 编排后端自动附加的共享基础设施安全组
    #[serde(default = "default_shared_security_groups")]
    pub shared_security_groups: Vec<String>,
    /// 默认密钥对模板中的区域占位符
    #[serde(default = "default_region_placeholder")]
    pub region_placeholder: String,
    /// IAM 角色默认值为 `{application}{suffix}`
    #[serde(default = "default_instance_profile_suffix")]
    pub instance_profile_suffix: String,
}

impl Default for ConventionsSection {
    fn default() -> Self {
        Self {
            shared_security_groups: default_shared_security_groups(),
            region_placeholder: default_region_placeholder(),
            instance_profile_suffix: default_instance_profile_suffix(),
        }
    }
}

fn default_shared_security_groups() -> Vec<String> {
    vec!["nf-infrastructure".into(), "nf-datacenter".into()]
}

fn default_region_placeholder() -> String {
    "{{region}}".to_string()
}

fn default_instance_profile_suffix() -> String {
    "InstanceProfile".to_string()
}

/// [reconcile] 段：单次收敛的并发上限
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileSection {
    /// 同一资源同时进行的区域级观测 / 提交数量
    #[serde(default = "default_max_concurrent_regions")]
    pub max_concurrent_regions: usize,
}

impl Default for ReconcileSection {
    fn default() -> Self {
        Self {
            max_concurrent_regions: default_max_concurrent_regions(),
        }
    }
}

fn default_max_concurrent_regions() -> usize {
    8
}

/// 从 config 目录加载配置，环境变量 KEEL__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 KEEL__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("KEEL")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
