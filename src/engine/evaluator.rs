//! 权限评估模块
//!
//! 对聚合后的语句序列做一次从左到右的折叠，得到"资源 → 允许操作集合"
//! 的有效权限表。
//!
//! ## 决策逻辑
//!
//! 1. 用不限定资源的语句计算默认操作集合，写入默认资源键
//! 2. 逐条语句、逐个资源模式：
//!    - Allow：去掉该资源上已记录的拒绝操作后并入权限表，
//!      并按条件运算符记录允许资源条目
//!    - Deny：累加到该资源的拒绝集合，并从权限表中移除
//! 3. 资源之间互不影响：拒绝只作用于语句中写明的资源键，
//!    不按通配符重叠传播
//!
//! 条件块只被提取用于展示（`s3:prefix`），不会参与放行判断。

use crate::error::{ConditionError, ConfigError, Error, Result};
use crate::policy::{
    ActionSet, CREATE_SERVICE_ACCOUNT_ACTION, ConditionValues, Statement,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// 默认资源键
pub const DEFAULT_RESOURCE: &str = "default";

/// 前缀条件键
pub const PREFIX_CONDITION_KEY: &str = "s3:prefix";

/// 权限评估配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// 默认资源在结果中使用的键
    pub default_resource: String,

    /// 带条件拒绝时需要加回默认集合的操作
    pub scoped_key_action: String,

    /// 提取前缀时读取的条件键
    pub prefix_condition_key: String,

    /// 条件块无法解码时是否终止整个评估（默认启用）
    ///
    /// 关闭后，无法解码的条件块只会被跳过并记录警告，权限表照常计算。
    pub strict_conditions: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            default_resource: DEFAULT_RESOURCE.to_string(),
            scoped_key_action: CREATE_SERVICE_ACCOUNT_ACTION.to_string(),
            prefix_condition_key: PREFIX_CONDITION_KEY.to_string(),
            strict_conditions: true,
        }
    }
}

impl EvaluatorConfig {
    /// 创建新的配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置默认资源键
    pub fn with_default_resource(mut self, key: impl Into<String>) -> Self {
        self.default_resource = key.into();
        self
    }

    /// 设置带条件拒绝时加回的操作
    pub fn with_scoped_key_action(mut self, action: impl Into<String>) -> Self {
        self.scoped_key_action = action.into();
        self
    }

    /// 设置前缀条件键
    pub fn with_prefix_condition_key(mut self, key: impl Into<String>) -> Self {
        self.prefix_condition_key = key.into();
        self
    }

    /// 设置是否严格解码条件块
    pub fn with_strict_conditions(mut self, strict: bool) -> Self {
        self.strict_conditions = strict;
        self
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.default_resource.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "default_resource".to_string(),
                message: "must not be empty".to_string(),
            }
            .into());
        }
        if self.prefix_condition_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "prefix_condition_key".to_string(),
                message: "must not be empty".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// 带条件的允许资源条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowResource {
    /// 资源模式
    pub resource: String,
    /// 条件中提取出的前缀
    pub prefixes: Vec<String>,
    /// 条件运算符名称
    pub condition_operator: String,
}

/// 权限评估结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResult {
    /// 资源 → 允许操作集合；总是包含默认资源键
    pub permissions: BTreeMap<String, ActionSet>,
    /// 带条件的允许资源条目
    pub allow_resources: Vec<AllowResource>,
    /// 本次评估使用的默认资源键
    #[serde(skip, default = "default_resource_key")]
    default_resource: String,
}

fn default_resource_key() -> String {
    DEFAULT_RESOURCE.to_string()
}

impl PermissionResult {
    /// 获取某个资源键上的允许操作
    pub fn actions_for(&self, resource: &str) -> Option<&ActionSet> {
        self.permissions.get(resource)
    }

    /// 获取默认资源上的允许操作
    ///
    /// 使用评估时配置的默认资源键。
    pub fn default_actions(&self) -> Option<&ActionSet> {
        self.permissions.get(&self.default_resource)
    }

    /// 默认资源键
    pub fn default_resource(&self) -> &str {
        &self.default_resource
    }

    /// 检查某个资源键上是否允许某个操作
    pub fn is_allowed(&self, resource: &str, action: &str) -> bool {
        self.permissions
            .get(resource)
            .is_some_and(|actions| actions.contains(action))
    }

    /// 结果中出现的资源键（按字典序）
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.permissions.keys().map(String::as_str)
    }
}

/// 权限评估器
///
/// # 示例
///
/// ```rust
/// use iamrs::engine::PermissionEvaluator;
/// use iamrs::policy::{ConditionValues, Statement};
///
/// let statements = vec![
///     Statement::allow()
///         .actions(["s3:GetObject", "s3:PutObject"])
///         .resource("arn:aws:s3:::photos/*")
///         .build(),
///     Statement::deny()
///         .action("s3:PutObject")
///         .resource("arn:aws:s3:::photos/*")
///         .build(),
/// ];
///
/// let evaluator = PermissionEvaluator::with_default_config();
/// let result = evaluator.evaluate(&statements, &ConditionValues::new()).unwrap();
///
/// assert!(result.is_allowed("arn:aws:s3:::photos/*", "s3:GetObject"));
/// assert!(!result.is_allowed("arn:aws:s3:::photos/*", "s3:PutObject"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PermissionEvaluator {
    config: EvaluatorConfig,
}

impl PermissionEvaluator {
    /// 使用指定配置创建评估器
    ///
    /// 配置未通过 [`EvaluatorConfig::validate`] 时返回 [`ConfigError`]。
    pub fn new(config: EvaluatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// 使用默认配置创建评估器
    pub fn with_default_config() -> Self {
        Self {
            config: EvaluatorConfig::default(),
        }
    }

    /// 获取配置
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// 评估语句序列
    ///
    /// 严格模式下，任一允许语句的条件块无法解码都会终止整个评估，
    /// 不返回部分结果。
    pub fn evaluate(
        &self,
        statements: &[Statement],
        condition_values: &ConditionValues,
    ) -> Result<PermissionResult> {
        let statements: Vec<Statement> = statements
            .iter()
            .map(|s| s.resolve_variables(condition_values))
            .collect();

        let default_actions = self.seed_default_actions(&statements);

        let mut permissions: BTreeMap<String, ActionSet> = BTreeMap::new();
        permissions.insert(self.config.default_resource.clone(), default_actions.clone());
        let mut denied: HashMap<String, ActionSet> = HashMap::new();
        let mut allow_resources: Vec<AllowResource> = Vec::new();

        for statement in &statements {
            if statement.resources().is_empty() {
                continue;
            }

            if statement.is_allow() {
                let prefixes = self.extract_prefixes(statement)?;

                for resource in statement.resources() {
                    let denied_here = denied.get(resource);
                    let allowed = match denied_here {
                        Some(d) => statement.actions().difference(d),
                        None => statement.actions().clone(),
                    };

                    permissions
                        .entry(resource.clone())
                        .or_insert_with(|| match denied_here {
                            Some(d) => default_actions.difference(d),
                            None => default_actions.clone(),
                        })
                        .merge(&allowed);

                    for (operator, prefixes) in &prefixes {
                        let entry = AllowResource {
                            resource: resource.clone(),
                            prefixes: prefixes.clone(),
                            condition_operator: operator.clone(),
                        };
                        if !allow_resources.contains(&entry) {
                            allow_resources.push(entry);
                        }
                    }
                }
            } else {
                for resource in statement.resources() {
                    let denied_here = denied.entry(resource.clone()).or_default();
                    denied_here.merge(statement.actions());

                    if let Some(current) = permissions.get_mut(resource) {
                        current.subtract(denied_here);
                    }
                }
            }
        }

        debug!(
            statements = statements.len(),
            resources = permissions.len(),
            allow_resources = allow_resources.len(),
            "evaluated effective permissions"
        );

        Ok(PermissionResult {
            permissions,
            allow_resources,
            default_resource: self.config.default_resource.clone(),
        })
    }

    /// 计算默认操作集合
    ///
    /// 不限定资源的允许语句的操作并集，减去不限定资源的拒绝语句的操作；
    /// 随后把带条件拒绝中的受限密钥创建操作加回。
    fn seed_default_actions(&self, statements: &[Statement]) -> ActionSet {
        let mut allowed = ActionSet::new();
        let mut denied = ActionSet::new();

        for statement in statements.iter().filter(|s| s.is_unscoped()) {
            if statement.is_allow() {
                allowed.merge(statement.actions());
            } else {
                denied.merge(statement.actions());
            }
        }
        allowed.subtract(&denied);

        let scoped_key_action = self.config.scoped_key_action.as_str();
        let carve_out = statements.iter().any(|s| {
            s.is_deny() && s.has_conditions() && s.actions().contains(scoped_key_action)
        });
        if carve_out {
            allowed.add(scoped_key_action);
        }

        allowed
    }

    /// 从语句条件块中按运算符提取前缀（运算符按字典序）
    fn extract_prefixes(&self, statement: &Statement) -> Result<Vec<(String, Vec<String>)>> {
        let mut out = Vec::with_capacity(statement.conditions().len());

        for (operator, body) in statement.conditions() {
            match decode_prefixes(operator, body, &self.config.prefix_condition_key) {
                Ok(prefixes) => out.push((operator.clone(), prefixes)),
                Err(err) if self.config.strict_conditions => return Err(err),
                Err(err) => {
                    warn!(operator = %operator, error = %err, "skipping undecodable condition block");
                }
            }
        }
        Ok(out)
    }
}

/// 解码一个条件运算符的内容并读取前缀
///
/// 内容必须是对象；前缀键存在时必须是字符串或字符串数组。
fn decode_prefixes(operator: &str, body: &serde_json::Value, key: &str) -> Result<Vec<String>> {
    let unmarshal = |message: &str| -> Error {
        ConditionError::Unmarshal {
            operator: operator.to_string(),
            message: message.to_string(),
        }
        .into()
    };

    let block = body
        .as_object()
        .ok_or_else(|| unmarshal("expected an object of condition keys"))?;

    match block.get(key) {
        None => Ok(Vec::new()),
        Some(serde_json::Value::String(prefix)) => Ok(vec![prefix.clone()]),
        Some(serde_json::Value::Array(values)) => values
            .iter()
            .map(|v| {
                v.as_str()
                    .map(String::from)
                    .ok_or_else(|| unmarshal("prefix values must be strings"))
            })
            .collect(),
        Some(_) => Err(unmarshal("prefix must be a string or a list of strings")),
    }
}

/// 使用默认配置评估语句序列
pub fn evaluate(
    statements: &[Statement],
    condition_values: &ConditionValues,
) -> Result<PermissionResult> {
    PermissionEvaluator::with_default_config().evaluate(statements, condition_values)
}
