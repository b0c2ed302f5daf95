//! 编排作业：有序的 key/value 指令集合
//!
//! 每个区域、每次 diff 新建一个 Job，不跨区域或跨轮次复用。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const JOB_TYPE_CREATE: &str = "createServerGroup";
pub const JOB_TYPE_RESIZE: &str = "resizeServerGroup";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Job(Map<String, Value>);

impl Job {
    /// 以 refId 与 type 开头的新作业
    pub fn new(job_type: &str) -> Self {
        let mut job = Self::default();
        job.insert("refId", "1");
        job.insert("type", job_type);
        job
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn job_type(&self) -> Option<&str> {
        self.get("type").and_then(Value::as_str)
    }

    /// 按插入顺序的键
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_keep_insertion_order() {
        let job = Job::new(JOB_TYPE_RESIZE)
            .with("region", "us-west-2")
            .with("capacity", serde_json::json!({"min": 1, "max": 1, "desired": 1}));
        let keys: Vec<_> = job.keys().collect();
        assert_eq!(keys, vec!["refId", "type", "region", "capacity"]);
        assert_eq!(job.job_type(), Some(JOB_TYPE_RESIZE));
    }
}
