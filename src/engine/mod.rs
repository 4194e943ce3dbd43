//! # 权限解析引擎
//!
//! 纯函数式的有效权限计算，不做任何 I/O：
//!
//! - **策略聚合**: 自身策略在前、组策略在后的有序语句序列
//! - **权限评估**: 资源 → 允许操作集合，先出现的拒绝压制后续允许
//! - **桶访问解析**: 对单个桶列出拥有访问权限的主体，拒绝不可恢复
//! - **条件上下文**: 会话条件值表
//!
//! ## 使用示例
//!
//! ```rust
//! use iamrs::engine::{ConditionContext, aggregate, evaluate};
//! use iamrs::policy::Policy;
//!
//! let own = Policy::parse(
//!     "home",
//!     r#"{"Statement":[{"Effect":"Allow","Action":"s3:*","Resource":"arn:aws:s3:::home/${aws:username}/*"}]}"#,
//! )
//! .unwrap();
//! let group = Policy::parse(
//!     "diagnostics",
//!     r#"{"Statement":[{"Effect":"Allow","Action":["admin:ServerInfo"]}]}"#,
//! )
//! .unwrap();
//!
//! let statements = aggregate(&[own], &[group]);
//! let values = ConditionContext::new("alice").build();
//! let result = evaluate(&statements, &values).unwrap();
//!
//! assert!(result.is_allowed("default", "admin:ServerInfo"));
//! assert!(result.is_allowed("arn:aws:s3:::home/alice/*", "s3:*"));
//! ```

mod aggregate;
mod bucket;
mod context;
mod evaluator;

pub use aggregate::{aggregate, collect_policy_names, combine_statements, split_policy_names};
pub use bucket::{
    AccessFailure, BucketAccessReport, BucketVerdict, GroupFailure, PolicyDocument,
    PrincipalPolicies, bucket_verdict, policy_matches_bucket, resolve_bucket_access,
    users_with_access,
};
pub use context::{AUTH_TYPE, ConditionContext, DEFAULT_PRINCIPAL_TYPE, SIGNATURE_VERSION};
pub use evaluator::{
    AllowResource, DEFAULT_RESOURCE, EvaluatorConfig, PREFIX_CONDITION_KEY, PermissionEvaluator,
    PermissionResult, evaluate,
};
