//! # IamRS
//!
//! IAM 风格存储桶策略的有效权限解析库。
//!
//! ## 功能特性
//!
//! - **策略解析**: 将 JSON 策略文档规范化为语句、操作集合与资源模式
//! - **资源匹配**: `arn:aws:s3:::` 前缀约定下的通配符匹配与策略变量替换
//! - **策略聚合**: 自身策略与组策略的有序合并
//! - **权限评估**: 资源 → 允许操作集合，先出现的拒绝压制后续允许
//! - **桶访问解析**: 列出对某个桶拥有访问权限的用户，拒绝不可恢复
//! - **目录编排**: 通过异步目录 trait 以有上限的并发拉取策略并评估
//!
//! ## Features
//!
//! - `directory` - 启用异步策略目录与访问解析编排（默认启用）
//! - `full` - 启用所有功能
//!
//! ## 权限评估示例
//!
//! ```rust
//! use iamrs::{ConditionValues, Policy, aggregate, evaluate};
//!
//! let admin = Policy::parse(
//!     "consoleAdmin",
//!     r#"{
//!         "Version": "2012-10-17",
//!         "Statement": [
//!             {"Effect": "Allow", "Action": ["admin:*"]},
//!             {"Effect": "Allow", "Action": ["s3:*"], "Resource": ["arn:aws:s3:::*"]}
//!         ]
//!     }"#,
//! )
//! .unwrap();
//!
//! let statements = aggregate(&[admin], &[]);
//! let result = evaluate(&statements, &ConditionValues::new()).unwrap();
//!
//! assert!(result.is_allowed("default", "admin:*"));
//! assert!(result.is_allowed("arn:aws:s3:::*", "s3:*"));
//! ```
//!
//! ## 桶访问示例
//!
//! ```rust
//! use iamrs::{PrincipalPolicies, users_with_access};
//!
//! let allow = r#"{"Statement":[{"Effect":"Allow","Action":"s3:*","Resource":"arn:aws:s3:::bucket2/*"}]}"#;
//! let deny = r#"{"Statement":[{"Effect":"Deny","Action":"s3:*","Resource":"arn:aws:s3:::bucket1"}]}"#;
//!
//! let principals = vec![
//!     PrincipalPolicies::new("u1").with_document("otherPolicy", allow),
//!     PrincipalPolicies::new("u2").with_document("testPolicy", deny),
//! ];
//!
//! assert_eq!(users_with_access("bucket2", &principals), vec!["u1"]);
//! ```
//!
//! ## 日志
//!
//! 库内部通过 `tracing` 记录评估摘要与被跳过的策略，不会安装任何订阅者。

pub mod engine;
pub mod error;
pub mod policy;

#[cfg(feature = "directory")]
pub mod directory;

pub use error::{Error, Result};

// ============================================================================
// 策略相关导出
// ============================================================================

pub use policy::{
    Action, ActionSet, Condition, ConditionValues, Effect, Policy, Statement, parse_policy,
};

// ============================================================================
// 引擎相关导出
// ============================================================================

pub use engine::{
    AllowResource, BucketAccessReport, BucketVerdict, ConditionContext, EvaluatorConfig,
    GroupFailure, PermissionEvaluator, PermissionResult, PolicyDocument, PrincipalPolicies,
    aggregate, bucket_verdict, evaluate, policy_matches_bucket, resolve_bucket_access,
    users_with_access,
};

// ============================================================================
// 目录相关导出
// ============================================================================

#[cfg(feature = "directory")]
pub use directory::{
    AccessResolver, GroupInfo, InMemoryDirectory, PolicyDirectory, ResolverConfig, UserInfo,
};
