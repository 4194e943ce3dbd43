//! # 策略目录模块
//!
//! 定义策略、用户与组记录的来源（通常是管理端客户端），以及在其之上
//! 做并发拉取并调用纯评估引擎的 [`AccessResolver`]。
//!
//! ## 使用示例
//!
//! ```rust
//! use iamrs::directory::{AccessResolver, GroupInfo, InMemoryDirectory, UserInfo};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> iamrs::Result<()> {
//! let directory = InMemoryDirectory::new()
//!     .with_policy(
//!         "readwrite-photos",
//!         r#"{"Statement":[{"Effect":"Allow","Action":"s3:*","Resource":"arn:aws:s3:::photos/*"}]}"#,
//!     )
//!     .with_user(UserInfo::new("alice").member_of("editors"))
//!     .with_group(GroupInfo::new("editors").with_policy("readwrite-photos").with_member("alice"));
//!
//! let resolver = AccessResolver::with_default_config(Arc::new(directory));
//! let users = resolver.users_with_access_to_bucket("photos").await?;
//! assert_eq!(users.principals, vec!["alice"]);
//! # Ok(())
//! # }
//! ```

mod memory;
mod resolver;

pub use memory::InMemoryDirectory;
pub use resolver::{AccessResolver, ResolverConfig};

use crate::engine::split_policy_names;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 用户记录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    /// 访问密钥（用户标识）
    pub access_key: String,
    /// 逗号连接的策略名称
    pub policy_name: String,
    /// 所属组（按加入顺序）
    pub member_of: Vec<String>,
}

impl UserInfo {
    /// 创建用户记录
    pub fn new(access_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            ..Default::default()
        }
    }

    /// 设置策略名称字段
    pub fn with_policy(mut self, policy_name: impl Into<String>) -> Self {
        self.policy_name = policy_name.into();
        self
    }

    /// 追加所属组
    pub fn member_of(mut self, group: impl Into<String>) -> Self {
        self.member_of.push(group.into());
        self
    }

    /// 拆分后的策略名称
    pub fn policies(&self) -> Vec<String> {
        split_policy_names(&self.policy_name)
    }

    /// 是否直接挂载了某个策略
    pub fn has_policy(&self, name: &str) -> bool {
        self.policies().iter().any(|p| p == name)
    }
}

/// 组记录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    /// 组名
    pub name: String,
    /// 逗号连接的策略名称
    pub policy: String,
    /// 成员访问密钥
    pub members: Vec<String>,
}

impl GroupInfo {
    /// 创建组记录
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 设置策略名称字段
    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = policy.into();
        self
    }

    /// 追加成员
    pub fn with_member(mut self, access_key: impl Into<String>) -> Self {
        self.members.push(access_key.into());
        self
    }

    /// 拆分后的策略名称
    pub fn policies(&self) -> Vec<String> {
        split_policy_names(&self.policy)
    }

    /// 是否挂载了某个策略
    pub fn has_policy(&self, name: &str) -> bool {
        self.policies().iter().any(|p| p == name)
    }
}

/// 策略目录 trait
///
/// 实现此 trait 以接入实际的管理端（如 HTTP 管理接口）。返回的结果
/// 视为已认证、已授权；引擎本身不做任何认证。
#[async_trait]
pub trait PolicyDirectory: Send + Sync {
    /// 获取策略 JSON 原文，不存在时返回 NotFound
    async fn get_policy(&self, name: &str) -> Result<String>;

    /// 列出全部策略（名称 → JSON 原文）
    async fn list_policies(&self) -> Result<BTreeMap<String, String>>;

    /// 列出全部用户
    async fn list_users(&self) -> Result<Vec<UserInfo>>;

    /// 获取用户记录，不存在时返回 NotFound
    async fn user_info(&self, access_key: &str) -> Result<UserInfo>;

    /// 列出全部组名
    async fn list_groups(&self) -> Result<Vec<String>>;

    /// 获取组记录，不存在时返回 NotFound
    async fn group_info(&self, name: &str) -> Result<GroupInfo>;
}
