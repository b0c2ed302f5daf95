//! Moniker：application / stack / detail + sequence 命名约定
//!
//! 集群名为 `app[-stack][-detail]`（有 detail 无 stack 时为 `app--detail`），
//! 具体 server group 名为集群名加 `-vNNN` 序号。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Moniker {
    pub app: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// 由编排后端在创建 server group 时分配，desired 状态中总为 None
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
}

impl Moniker {
    pub fn new(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            stack: None,
            detail: None,
            sequence: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// 集群名（不含序号）
    pub fn cluster_name(&self) -> String {
        match (non_empty(&self.stack), non_empty(&self.detail)) {
            (None, None) => self.app.clone(),
            (Some(stack), None) => format!("{}-{}", self.app, stack),
            (None, Some(detail)) => format!("{}--{}", self.app, detail),
            (Some(stack), Some(detail)) => format!("{}-{}-{}", self.app, stack, detail),
        }
    }

    /// 具体 server group 名（含 `-vNNN`）；无序号时等于集群名
    pub fn server_group_name(&self) -> String {
        match self.sequence {
            Some(seq) => format!("{}-v{:03}", self.cluster_name(), seq),
            None => self.cluster_name(),
        }
    }

    /// 去掉序号，只保留集群身份
    pub fn without_sequence(&self) -> Self {
        Self {
            sequence: None,
            ..self.clone()
        }
    }

    /// 解析 `app-stack-detail-v005` 形式的名字
    ///
    /// detail 可以包含 `-`；末段形如 `vNNN` 时视为序号。
    pub fn parse(name: &str) -> Self {
        let (cluster, sequence) = match name.rsplit_once('-') {
            Some((head, tail)) if is_sequence(tail) => (head, tail[1..].parse().ok()),
            _ => (name, None),
        };

        let mut parts = cluster.splitn(3, '-');
        let app = parts.next().unwrap_or_default().to_string();
        let stack = parts.next().filter(|s| !s.is_empty()).map(String::from);
        let detail = parts.next().filter(|s| !s.is_empty()).map(String::from);

        Self {
            app,
            stack,
            detail,
            sequence,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn is_sequence(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_name_variants() {
        assert_eq!(Moniker::new("fnord").cluster_name(), "fnord");
        assert_eq!(Moniker::new("fnord").with_stack("test").cluster_name(), "fnord-test");
        assert_eq!(Moniker::new("fnord").with_detail("canary").cluster_name(), "fnord--canary");
        assert_eq!(
            Moniker::new("fnord").with_stack("test").with_detail("eu").cluster_name(),
            "fnord-test-eu"
        );
    }

    #[test]
    fn test_server_group_name_pads_sequence() {
        let moniker = Moniker::new("fnord").with_stack("test").with_sequence(5);
        assert_eq!(moniker.server_group_name(), "fnord-test-v005");
    }

    #[test]
    fn test_parse_round_trips_names() {
        let parsed = Moniker::parse("fnord-test-blue-green-v012");
        assert_eq!(parsed.app, "fnord");
        assert_eq!(parsed.stack.as_deref(), Some("test"));
        assert_eq!(parsed.detail.as_deref(), Some("blue-green"));
        assert_eq!(parsed.sequence, Some(12));

        let parsed = Moniker::parse("fnord--canary");
        assert_eq!(parsed.stack, None);
        assert_eq!(parsed.detail.as_deref(), Some("canary"));
        assert_eq!(parsed.sequence, None);
    }

    #[test]
    fn test_parse_does_not_treat_plain_v_as_sequence() {
        let parsed = Moniker::parse("fnord-v");
        assert_eq!(parsed.stack.as_deref(), Some("v"));
        assert_eq!(parsed.sequence, None);
    }
}
