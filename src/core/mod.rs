//! 核心：错误类型、区域并发调度

pub mod error;
pub mod task_scheduler;

pub use error::{KeelError, Result};
pub use task_scheduler::RegionScheduler;
