//! 命名 / 配置约定
//!
//! 解析时用它推导默认值，导出时用它判断某字段是否等于约定默认值（等于则省略）。
//! 每个字段一个 normalize 函数，返回 `(value, is_default)`。

use std::collections::BTreeSet;

use regex::Regex;

use crate::config::ConventionsSection;

#[derive(Debug, Clone)]
pub struct Conventions {
    shared_security_groups: BTreeSet<String>,
    region_placeholder: String,
    instance_profile_suffix: String,
}

impl Default for Conventions {
    fn default() -> Self {
        Self::from_config(&ConventionsSection::default())
    }
}

impl Conventions {
    pub fn from_config(section: &ConventionsSection) -> Self {
        Self {
            shared_security_groups: section.shared_security_groups.iter().cloned().collect(),
            region_placeholder: section.region_placeholder.clone(),
            instance_profile_suffix: section.instance_profile_suffix.clone(),
        }
    }

    /// `{application}InstanceProfile`
    pub fn default_iam_role(&self, application: &str) -> String {
        format!("{application}{}", self.instance_profile_suffix)
    }

    /// 把模板中的区域占位符替换为具体区域
    pub fn key_pair_for_region(&self, template: &str, region: &str) -> String {
        template.replace(&self.region_placeholder, region)
    }

    /// 编排后端自动附加的安全组：共享基础设施组 + 应用同名组
    pub fn auto_assigned_security_groups(&self, application: &str) -> BTreeSet<String> {
        let mut groups = self.shared_security_groups.clone();
        groups.insert(application.to_string());
        groups
    }

    pub fn is_auto_assigned_security_group(&self, application: &str, name: &str) -> bool {
        name == application || self.shared_security_groups.contains(name)
    }

    pub fn normalize_iam_role(&self, iam_role: &str, application: &str) -> (String, bool) {
        let is_default = iam_role == self.default_iam_role(application);
        (iam_role.to_string(), is_default)
    }

    /// 模板可能含区域占位符，按模式匹配；占位符处捕获到的区域必须是 `region` 本身，
    /// 否则重新解析会得到另一个密钥对
    pub fn normalize_key_pair(&self, key_pair: &str, template: &str, region: &str) -> (String, bool) {
        let is_default = match self.key_pair_pattern(template) {
            Some(pattern) => pattern.captures(key_pair).is_some_and(|captures| {
                captures
                    .iter()
                    .skip(1)
                    .all(|m| m.is_some_and(|m| m.as_str() == region))
            }),
            None => key_pair == template,
        };
        (key_pair.to_string(), is_default)
    }

    fn key_pair_pattern(&self, template: &str) -> Option<Regex> {
        if !template.contains(&self.region_placeholder) {
            return None;
        }
        let pattern = template
            .split(self.region_placeholder.as_str())
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"([a-z0-9-]+)");
        Regex::new(&format!("^{pattern}$")).ok()
    }

    /// 去掉自动附加的安全组；返回值为空时表示只有默认组
    pub fn normalize_security_groups(
        &self,
        names: &BTreeSet<String>,
        application: &str,
    ) -> (BTreeSet<String>, bool) {
        let explicit: BTreeSet<String> = names
            .iter()
            .filter(|n| !self.is_auto_assigned_security_group(application, n))
            .cloned()
            .collect();
        let is_default = explicit.is_empty();
        (explicit, is_default)
    }
}

/// 与内建默认值比较
pub fn normalize_against<T: PartialEq + Clone>(value: &T, default: &T) -> (T, bool) {
    (value.clone(), value == default)
}

/// 集合为空视为默认
pub fn normalize_set<T: Clone + Ord>(value: &BTreeSet<T>) -> (BTreeSet<T>, bool) {
    (value.clone(), value.is_empty())
}

/// `(value, is_default)` → 导出字段：默认值省略为 None
pub fn elide<T>((value, is_default): (T, bool)) -> Option<T> {
    if is_default {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iam_role_default() {
        let conventions = Conventions::default();
        assert_eq!(conventions.default_iam_role("fnord"), "fnordInstanceProfile");
        assert!(conventions.normalize_iam_role("fnordInstanceProfile", "fnord").1);
        assert!(!conventions.normalize_iam_role("customRole", "fnord").1);
    }

    #[test]
    fn test_key_pair_matches_templated_pattern() {
        let conventions = Conventions::default();
        let template = "nf-keypair-test-{{region}}";
        let west = "us-west-2";
        assert!(conventions.normalize_key_pair("nf-keypair-test-us-west-2", template, west).1);
        assert!(!conventions.normalize_key_pair("nf-keypair-prod-us-west-2", template, west).1);
        assert!(!conventions.normalize_key_pair("fnord-keypair", template, west).1);
        assert_eq!(
            conventions.key_pair_for_region(template, "us-east-1"),
            "nf-keypair-test-us-east-1"
        );
    }

    #[test]
    fn test_key_pair_of_another_region_is_explicit() {
        let conventions = Conventions::default();
        let template = "nf-keypair-test-{{region}}";
        let (key_pair, is_default) =
            conventions.normalize_key_pair("nf-keypair-test-us-east-1", template, "us-west-2");
        assert_eq!(key_pair, "nf-keypair-test-us-east-1");
        assert!(!is_default);
    }

    #[test]
    fn test_key_pair_without_placeholder_is_literal() {
        let conventions = Conventions::default();
        let template = "nf-test-keypair-a";
        assert!(conventions.normalize_key_pair("nf-test-keypair-a", template, "us-west-2").1);
        assert!(!conventions.normalize_key_pair("nf-test-keypair-b", template, "us-west-2").1);
    }

    #[test]
    fn test_template_metacharacters_are_escaped() {
        let conventions = Conventions::default();
        let template = "kp.{{region}}";
        assert!(conventions.normalize_key_pair("kp.us-west-2", template, "us-west-2").1);
        assert!(!conventions.normalize_key_pair("kpXus-west-2", template, "us-west-2").1);
    }

    #[test]
    fn test_security_groups_drop_auto_assigned() {
        let conventions = Conventions::default();
        let names: BTreeSet<String> = ["nf-infrastructure", "nf-datacenter", "fnord", "extra-group"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (explicit, is_default) = conventions.normalize_security_groups(&names, "fnord");
        assert_eq!(explicit.into_iter().collect::<Vec<_>>(), vec!["extra-group"]);
        assert!(!is_default);
    }

    #[test]
    fn test_elide() {
        assert_eq!(elide(normalize_against(&10u64, &10u64)), None);
        assert_eq!(elide(normalize_against(&30u64, &10u64)), Some(30));
    }
}
