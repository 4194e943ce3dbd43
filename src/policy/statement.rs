//! 策略语句模块
//!
//! 定义规范化后的策略语句：效果、操作集合、资源模式集合与可选条件块。

use super::action::ActionSet;
use super::resource;
use crate::error::PolicyError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// 条件块
///
/// 条件运算符（如 `StringLike`）到其原始内容的映射。内容结构由使用方
/// 按需解码，这样 `Bool`、`NumericLessThan` 等非字符串条件也能完整保留。
pub type Condition = BTreeMap<String, serde_json::Value>;

/// 运行时条件值上下文（如 `aws:username` → `["alice"]`）
pub type ConditionValues = HashMap<String, Vec<String>>;

/// 语句效果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// 允许
    Allow,
    /// 拒绝
    Deny,
}

impl Effect {
    /// 获取效果名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        }
    }
}

impl FromStr for Effect {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Allow" => Ok(Effect::Allow),
            "Deny" => Ok(Effect::Deny),
            other => Err(PolicyError::InvalidEffect(other.to_string())),
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 策略语句
///
/// 解析后不可变；通过 [`Statement::allow`] / [`Statement::deny`] 构建器
/// 也可以在代码中直接构造。
///
/// # 示例
///
/// ```rust
/// use iamrs::policy::{Effect, Statement};
///
/// let statement = Statement::allow()
///     .action("s3:GetObject")
///     .resource("arn:aws:s3:::photos/*")
///     .build();
///
/// assert_eq!(statement.effect(), Effect::Allow);
/// assert!(statement.actions().contains("s3:GetObject"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub(crate) sid: Option<String>,
    pub(crate) effect: Effect,
    pub(crate) actions: ActionSet,
    pub(crate) resources: BTreeSet<String>,
    pub(crate) conditions: Condition,
}

impl Statement {
    /// 创建允许语句构建器
    pub fn allow() -> StatementBuilder {
        StatementBuilder::new(Effect::Allow)
    }

    /// 创建拒绝语句构建器
    pub fn deny() -> StatementBuilder {
        StatementBuilder::new(Effect::Deny)
    }

    /// 语句 ID
    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    /// 语句效果
    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// 是否为允许语句
    pub fn is_allow(&self) -> bool {
        self.effect == Effect::Allow
    }

    /// 是否为拒绝语句
    pub fn is_deny(&self) -> bool {
        self.effect == Effect::Deny
    }

    /// 操作集合
    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    /// 资源模式集合（按字典序）
    pub fn resources(&self) -> &BTreeSet<String> {
        &self.resources
    }

    /// 条件块
    pub fn conditions(&self) -> &Condition {
        &self.conditions
    }

    /// 是否带有至少一个条件
    pub fn has_conditions(&self) -> bool {
        !self.conditions.is_empty()
    }

    /// 是否不限定具体资源
    ///
    /// 没有资源，或者任一资源模式能命中空资源（如 `*`、`arn:aws:s3:::*`）。
    pub fn is_unscoped(&self) -> bool {
        self.resources.is_empty() || self.resources.iter().any(|r| resource::is_unscoped(r))
    }

    /// 检查语句中是否有资源模式覆盖该桶
    pub fn matches_bucket(&self, bucket: &str) -> bool {
        self.resources
            .iter()
            .any(|r| resource::matches_bucket(r, bucket))
    }

    /// 用条件值替换资源模式中的策略变量，返回新语句
    pub fn resolve_variables(&self, values: &ConditionValues) -> Statement {
        let resources = self
            .resources
            .iter()
            .map(|r| resource::substitute_variables(r, values).into_owned())
            .collect();
        Statement {
            resources,
            ..self.clone()
        }
    }
}

/// 语句构建器
pub struct StatementBuilder {
    sid: Option<String>,
    effect: Effect,
    actions: ActionSet,
    resources: BTreeSet<String>,
    conditions: Condition,
}

impl StatementBuilder {
    /// 创建新的语句构建器
    pub fn new(effect: Effect) -> Self {
        Self {
            sid: None,
            effect,
            actions: ActionSet::new(),
            resources: BTreeSet::new(),
            conditions: Condition::new(),
        }
    }

    /// 设置语句 ID
    pub fn sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    /// 添加操作
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.actions.add(action);
        self
    }

    /// 添加多个操作
    pub fn actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions.extend(actions);
        self
    }

    /// 添加资源模式
    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resources.insert(resource.into());
        self
    }

    /// 添加多个资源模式
    pub fn resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources
            .extend(resources.into_iter().map(Into::into));
        self
    }

    /// 添加条件运算符及其内容
    pub fn condition(mut self, operator: impl Into<String>, body: serde_json::Value) -> Self {
        self.conditions.insert(operator.into(), body);
        self
    }

    /// 构建语句
    pub fn build(self) -> Statement {
        Statement {
            sid: self.sid,
            effect: self.effect,
            actions: self.actions,
            resources: self.resources,
            conditions: self.conditions,
        }
    }
}
