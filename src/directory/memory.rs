//! 内存策略目录
//!
//! 适用于测试和把引擎嵌入到已自行管理策略的程序中。

use super::{GroupInfo, PolicyDirectory, UserInfo};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// 内存策略目录
///
/// 所有列表按名称排序返回。
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    policies: BTreeMap<String, String>,
    users: BTreeMap<String, UserInfo>,
    groups: BTreeMap<String, GroupInfo>,
}

impl InMemoryDirectory {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加策略
    pub fn with_policy(mut self, name: impl Into<String>, raw: impl Into<String>) -> Self {
        self.policies.insert(name.into(), raw.into());
        self
    }

    /// 添加用户
    pub fn with_user(mut self, user: UserInfo) -> Self {
        self.users.insert(user.access_key.clone(), user);
        self
    }

    /// 添加组
    pub fn with_group(mut self, group: GroupInfo) -> Self {
        self.groups.insert(group.name.clone(), group);
        self
    }

    /// 策略数量
    pub fn policy_count(&self) -> usize {
        self.policies.len()
    }
}

#[async_trait]
impl PolicyDirectory for InMemoryDirectory {
    async fn get_policy(&self, name: &str) -> Result<String> {
        self.policies
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("policy {}", name)))
    }

    async fn list_policies(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.policies.clone())
    }

    async fn list_users(&self) -> Result<Vec<UserInfo>> {
        Ok(self.users.values().cloned().collect())
    }

    async fn user_info(&self, access_key: &str) -> Result<UserInfo> {
        self.users
            .get(access_key)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("user {}", access_key)))
    }

    async fn list_groups(&self) -> Result<Vec<String>> {
        Ok(self.groups.keys().cloned().collect())
    }

    async fn group_info(&self, name: &str) -> Result<GroupInfo> {
        self.groups
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("group {}", name)))
    }
}
