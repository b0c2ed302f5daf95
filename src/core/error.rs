//! 收敛引擎错误类型
//!
//! 与调用方（外部调度器）配合：NotFound 只在 observe 中被吸收为「该区域不存在」，
//! 其余错误原样上抛；引擎内部不做任何重试。

use thiserror::Error;

/// 解析、观测、执行、导出过程中可能出现的错误
#[derive(Error, Debug)]
pub enum KeelError {
    /// 声明的区域无法被满足（缺少 location、缺少必填启动配置、无可用区等）
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 观测到的镜像缺少必需的来源标签，不能静默补默认值
    #[error("Required tag '{tag}' missing on image {image_id}")]
    RequiredTagMissing { tag: String, image_id: String },

    /// 导出时没有任何区域，或 VPC / 子网 / 安全组名称解析无结果
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Inventory 明确返回「不存在」（observe 会转换为区域缺席）
    #[error("Not found in inventory: {0}")]
    NotFound(String),

    #[error("Inventory service error: {0}")]
    Inventory(String),

    #[error("Orchestration service error: {0}")]
    Orchestration(String),

    #[error("Unsupported resource kind: {api_version}/{kind}")]
    UnsupportedKind { api_version: String, kind: String },

    #[error("Invalid spec: {0}")]
    InvalidSpec(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KeelError {
    /// 是否为 Inventory 的「不存在」结果
    pub fn is_not_found(&self) -> bool {
        matches!(self, KeelError::NotFound(_))
    }
}

pub type Result<T, E = KeelError> = std::result::Result<T, E>;
