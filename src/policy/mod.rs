//! # 策略模块
//!
//! 提供 IAM 风格策略的规范化内存表示：
//!
//! - **操作集合**: 去重、按字典序排列的操作名称集合
//! - **资源匹配**: `arn:aws:s3:::` 前缀约定下的通配符资源匹配
//! - **语句**: 效果、操作、资源模式与条件块
//! - **策略文档**: JSON 文档解析与序列化
//!
//! ## 使用示例
//!
//! ```rust
//! use iamrs::policy::Policy;
//!
//! let policy = Policy::parse(
//!     "photos-rw",
//!     r#"{
//!         "Version": "2012-10-17",
//!         "Statement": [
//!             {
//!                 "Effect": "Allow",
//!                 "Action": ["s3:GetObject", "s3:PutObject"],
//!                 "Resource": "arn:aws:s3:::photos/*"
//!             },
//!             {
//!                 "Effect": "Deny",
//!                 "Action": "s3:DeleteObject",
//!                 "Resource": "arn:aws:s3:::photos/*"
//!             }
//!         ]
//!     }"#,
//! )
//! .unwrap();
//!
//! assert_eq!(policy.statements().len(), 2);
//! assert!(policy.matches_bucket("photos"));
//! assert!(!policy.matches_bucket("videos"));
//! ```

mod action;
mod document;
pub mod resource;
mod statement;

pub use action::{Action, ActionSet, CREATE_SERVICE_ACCOUNT_ACTION};
pub use document::{POLICY_VERSION, Policy, parse_policy};
pub use statement::{Condition, ConditionValues, Effect, Statement, StatementBuilder};
