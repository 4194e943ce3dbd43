//! 操作定义模块
//!
//! 提供操作（Action）与操作集合（ActionSet）的定义。
//!
//! 操作按字符串精确比较；`s3:*`、`admin:*` 这类"全部"哨兵值原样保存，
//! 不在此处展开。

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// 操作名称，例如 `s3:GetObject`
pub type Action = String;

/// 创建受限访问密钥（Service Account）的管理操作
pub const CREATE_SERVICE_ACCOUNT_ACTION: &str = "admin:CreateServiceAccount";

/// 操作集合
///
/// 集合内元素唯一，迭代和序列化时按字典序排列。
///
/// # 示例
///
/// ```rust
/// use iamrs::policy::ActionSet;
///
/// let mut set = ActionSet::from_actions(["s3:PutObject", "s3:GetObject"]);
/// set.add("s3:GetObject");
///
/// assert_eq!(set.len(), 2);
/// assert_eq!(set.to_vec(), vec!["s3:GetObject", "s3:PutObject"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionSet {
    actions: BTreeSet<Action>,
}

impl ActionSet {
    /// 创建空的操作集合
    pub fn new() -> Self {
        Self {
            actions: BTreeSet::new(),
        }
    }

    /// 从操作列表创建
    pub fn from_actions<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Action>,
    {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }

    /// 添加操作，返回是否为新元素
    pub fn add(&mut self, action: impl Into<Action>) -> bool {
        self.actions.insert(action.into())
    }

    /// 移除操作
    pub fn remove(&mut self, action: &str) -> bool {
        self.actions.remove(action)
    }

    /// 检查是否包含某个操作（精确匹配）
    pub fn contains(&self, action: &str) -> bool {
        self.actions.contains(action)
    }

    /// 合并另一个集合
    pub fn merge(&mut self, other: &ActionSet) {
        self.actions.extend(other.actions.iter().cloned());
    }

    /// 移除所有出现在 `other` 中的操作
    pub fn subtract(&mut self, other: &ActionSet) {
        self.actions.retain(|a| !other.contains(a));
    }

    /// 返回不在 `other` 中的操作组成的新集合
    pub fn difference(&self, other: &ActionSet) -> ActionSet {
        self.actions
            .iter()
            .filter(|a| !other.contains(a))
            .cloned()
            .collect()
    }

    /// 获取操作数量
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// 检查是否为空
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// 按字典序迭代
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(String::as_str)
    }

    /// 按字典序导出为列表
    pub fn to_vec(&self) -> Vec<String> {
        self.actions.iter().cloned().collect()
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "[{}]", joined.join(", "))
    }
}

impl IntoIterator for ActionSet {
    type Item = Action;
    type IntoIter = std::collections::btree_set::IntoIter<Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}

impl<'a> IntoIterator for &'a ActionSet {
    type Item = &'a Action;
    type IntoIter = std::collections::btree_set::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

impl<S: Into<Action>> FromIterator<S> for ActionSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::from_actions(iter)
    }
}

impl<S: Into<Action>> Extend<S> for ActionSet {
    fn extend<T: IntoIterator<Item = S>>(&mut self, iter: T) {
        self.actions.extend(iter.into_iter().map(Into::into));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_set_dedup() {
        let set = ActionSet::from_actions(["s3:GetObject", "s3:GetObject", "s3:PutObject"]);
        assert_eq!(set.len(), 2);
        assert!(set.contains("s3:GetObject"));
        assert!(!set.contains("s3:*"));
    }

    #[test]
    fn test_action_set_sorted_serialization() {
        let set = ActionSet::from_actions(["s3:PutObject", "admin:ServerInfo", "s3:GetObject"]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["admin:ServerInfo","s3:GetObject","s3:PutObject"]"#);
    }

    #[test]
    fn test_action_set_subtract_and_difference() {
        let mut set = ActionSet::from_actions(["s3:GetObject", "s3:PutObject", "s3:ListBucket"]);
        let denied = ActionSet::from_actions(["s3:PutObject"]);

        let diff = set.difference(&denied);
        assert_eq!(diff.to_vec(), vec!["s3:GetObject", "s3:ListBucket"]);

        set.subtract(&denied);
        assert_eq!(set, diff);
    }

    #[test]
    fn test_action_set_merge() {
        let mut set = ActionSet::from_actions(["s3:GetObject"]);
        set.merge(&ActionSet::from_actions(["s3:GetObject", "s3:PutObject"]));
        assert_eq!(set.to_vec(), vec!["s3:GetObject", "s3:PutObject"]);
    }

    #[test]
    fn test_action_set_display() {
        let set = ActionSet::from_actions(["b", "a"]);
        assert_eq!(set.to_string(), "[a, b]");
        assert_eq!(ActionSet::new().to_string(), "[]");
    }
}
