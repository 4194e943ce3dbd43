//! 桶访问解析模块
//!
//! 对单个桶回答"哪些主体当前拥有访问权限"。与权限评估不同，这里每条
//! 语句只看一次效果：命中桶的 Allow 给出暂定访问标记，命中桶的 Deny
//! 给出永久拒绝标记。拒绝标记一旦出现，同一次解析中任何来源的 Allow
//! 都不能恢复访问。
//!
//! 单个主体的策略解析失败只会把该主体排除在结果之外，不影响其他主体。

use crate::error::Error;
use crate::policy::{Effect, Policy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// 原始策略文档
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// 策略名称
    pub name: String,
    /// JSON 原文
    pub raw: String,
}

impl PolicyDocument {
    /// 创建策略文档
    pub fn new(name: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw: raw.into(),
        }
    }

    /// 解析为策略
    pub fn parse(&self) -> crate::error::Result<Policy> {
        Policy::parse(self.name.as_str(), &self.raw)
    }
}

/// 一个主体及其一组策略文档
///
/// 同一主体可以出现在多个条目中（自身一条，每个所属组各一条），
/// 解析时按主体标识合并标记。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalPolicies {
    /// 主体标识（用户访问密钥）
    pub principal: String,
    /// 有序策略文档
    pub documents: Vec<PolicyDocument>,
}

impl PrincipalPolicies {
    /// 创建空条目
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            documents: Vec::new(),
        }
    }

    /// 追加策略文档
    pub fn with_document(mut self, name: impl Into<String>, raw: impl Into<String>) -> Self {
        self.documents.push(PolicyDocument::new(name, raw));
        self
    }
}

/// 解析失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessFailure {
    /// 受影响的主体
    pub principal: String,
    /// 出错的策略名称
    pub policy: String,
    /// 错误描述
    pub message: String,
}

/// 无法加载的组
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFailure {
    /// 组名
    pub group: String,
    /// 错误描述
    pub message: String,
}

/// 桶访问解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketAccessReport {
    /// 拥有访问权限的主体（按字典序）
    pub principals: Vec<String>,
    /// 被排除主体的失败记录
    pub failures: Vec<AccessFailure>,
    /// 未能应用其策略的组
    #[serde(default)]
    pub skipped_groups: Vec<GroupFailure>,
}

impl BucketAccessReport {
    /// 是否没有任何失败
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.skipped_groups.is_empty()
    }
}

/// 单个策略对某个桶的结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BucketVerdict {
    /// 有命中桶的允许语句且没有命中桶的拒绝语句
    Allow,
    /// 有命中桶的拒绝语句
    Deny,
    /// 没有任何语句命中该桶
    Unknown,
}

/// 主体的访问标记
#[derive(Debug, Clone, Copy, Default)]
struct Marks {
    allowed: bool,
    denied: bool,
    failed: bool,
}

impl Marks {
    fn apply(&mut self, verdict: BucketVerdict) {
        match verdict {
            BucketVerdict::Allow if !self.denied => self.allowed = true,
            BucketVerdict::Deny => {
                self.denied = true;
                self.allowed = false;
            }
            _ => {}
        }
    }

    fn has_access(&self) -> bool {
        self.allowed && !self.denied && !self.failed
    }
}

/// 检查策略中是否有语句覆盖该桶
///
/// # 示例
///
/// ```rust
/// use iamrs::engine::policy_matches_bucket;
/// use iamrs::policy::Policy;
///
/// let policy = Policy::parse(
///     "test",
///     r#"{"Statement":[{"Effect":"Allow","Action":"s3:*","Resource":"arn:aws:s3:::test"}]}"#,
/// )
/// .unwrap();
///
/// assert!(policy_matches_bucket(&policy, "test"));
/// assert!(!policy_matches_bucket(&policy, "other"));
/// ```
pub fn policy_matches_bucket(policy: &Policy, bucket: &str) -> bool {
    policy.matches_bucket(bucket)
}

/// 单个策略对某个桶的结论
///
/// 任一命中桶的语句为拒绝即为 [`BucketVerdict::Deny`]。
pub fn bucket_verdict(policy: &Policy, bucket: &str) -> BucketVerdict {
    let mut verdict = BucketVerdict::Unknown;
    for statement in policy.statements() {
        if !statement.matches_bucket(bucket) {
            continue;
        }
        match statement.effect() {
            Effect::Deny => return BucketVerdict::Deny,
            Effect::Allow => verdict = BucketVerdict::Allow,
        }
    }
    verdict
}

/// 解析桶访问并返回完整报告
pub fn resolve_bucket_access(bucket: &str, principals: &[PrincipalPolicies]) -> BucketAccessReport {
    let mut marks: BTreeMap<&str, Marks> = BTreeMap::new();
    let mut failures = Vec::new();

    for entry in principals {
        let mark = marks.entry(entry.principal.as_str()).or_default();

        for document in &entry.documents {
            let policy = match document.parse() {
                Ok(policy) => policy,
                Err(err) => {
                    warn!(
                        principal = %entry.principal,
                        policy = %document.name,
                        error = %err,
                        "excluding principal with unparsable policy"
                    );
                    mark.failed = true;
                    failures.push(failure(&entry.principal, &document.name, &err));
                    continue;
                }
            };

            for statement in policy.statements() {
                if !statement.matches_bucket(bucket) {
                    continue;
                }
                mark.apply(match statement.effect() {
                    Effect::Allow => BucketVerdict::Allow,
                    Effect::Deny => BucketVerdict::Deny,
                });
            }
        }
    }

    let principals: Vec<String> = marks
        .into_iter()
        .filter(|(_, m)| m.has_access())
        .map(|(p, _)| p.to_string())
        .collect();

    debug!(
        bucket,
        granted = principals.len(),
        failures = failures.len(),
        "resolved bucket access"
    );

    BucketAccessReport {
        principals,
        failures,
        skipped_groups: Vec::new(),
    }
}

/// 返回拥有桶访问权限的主体（按字典序）
pub fn users_with_access(bucket: &str, principals: &[PrincipalPolicies]) -> Vec<String> {
    resolve_bucket_access(bucket, principals).principals
}

fn failure(principal: &str, policy: &str, err: &Error) -> AccessFailure {
    AccessFailure {
        principal: principal.to_string(),
        policy: policy.to_string(),
        message: err.to_string(),
    }
}
