//! Keel - 声明式集群收敛引擎
//!
//! 模块划分：
//! - **cli**: 命令行参数定义（check / export）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、区域并发调度
//! - **model**: 集群声明、单区域 server group、moniker 命名、资源信封
//! - **diff**: 结构化 desired / current 差异
//! - **inventory**: 云状态查询服务、名称解析缓存、快照翻译
//! - **orchestration**: 编排作业、后端抽象、带关联 id 的任务提交
//! - **cluster**: EC2 集群处理器（解析 / 观测 / 作业生成 / 反向导出）
//! - **handler**: 处理器 trait、按 kind 注册表、单次收敛检查
//! - **observability**: 日志初始化

pub mod cli;
pub mod cluster;
pub mod config;
pub mod core;
pub mod diff;
pub mod handler;
pub mod inventory;
pub mod model;
pub mod observability;
pub mod orchestration;

pub use cluster::ClusterHandler;
pub use core::{KeelError, Result};
pub use handler::{CheckOutcome, HandlerRegistry};
