//! 可观测性
//!
//! 默认级别 info，可通过 RUST_LOG 覆盖（如 `RUST_LOG=keel=debug`）。
//! 编排提交的审计事件以 `audit` 字段输出 JSON。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // 日志输出到 stderr，stdout 留给命令结果
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
