//! 策略文档模块
//!
//! 负责 IAM 风格 JSON 策略文档与规范化 [`Policy`] 之间的转换。
//!
//! `Action`、`Resource` 与 `Statement` 字段在源文档中既可以是单个值，
//! 也可以是数组；解析时统一规范化，单值/多值的区别不会越过解析边界。

use super::action::ActionSet;
use super::statement::{Condition, Effect, Statement};
use crate::error::{Error, PolicyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 默认的策略语言版本
pub const POLICY_VERSION: &str = "2012-10-17";

/// 单值或数组
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}

/// 源文档中的策略结构
#[derive(Debug, Deserialize)]
struct RawPolicy {
    #[serde(rename = "Version", default)]
    version: Option<String>,
    #[serde(rename = "Statement", default)]
    statement: Option<OneOrMany<RawStatement>>,
}

/// 源文档中的语句结构
#[derive(Debug, Deserialize)]
struct RawStatement {
    #[serde(rename = "Sid", default)]
    sid: Option<String>,
    #[serde(rename = "Effect", default)]
    effect: Option<String>,
    #[serde(rename = "Action", default)]
    action: Option<OneOrMany<String>>,
    #[serde(rename = "Resource", default)]
    resource: Option<OneOrMany<String>>,
    #[serde(rename = "Condition", default)]
    condition: Option<Condition>,
}

impl RawStatement {
    fn normalize(self, index: usize) -> Result<Statement> {
        let effect: Effect = match self.effect {
            Some(effect) => effect.parse()?,
            None => {
                return Err(Error::malformed(format!(
                    "statement {} is missing Effect",
                    index
                )));
            }
        };

        Ok(Statement {
            sid: self.sid,
            effect,
            actions: self
                .action
                .map(OneOrMany::into_vec)
                .unwrap_or_default()
                .into_iter()
                .collect(),
            resources: self
                .resource
                .map(OneOrMany::into_vec)
                .unwrap_or_default()
                .into_iter()
                .collect(),
            conditions: self.condition.unwrap_or_default(),
        })
    }
}

/// 序列化回 IAM 文档时使用的语句结构
#[derive(Serialize)]
struct OutStatement<'a> {
    #[serde(rename = "Sid", skip_serializing_if = "Option::is_none")]
    sid: Option<&'a str>,
    #[serde(rename = "Effect")]
    effect: Effect,
    #[serde(rename = "Action")]
    action: &'a ActionSet,
    #[serde(rename = "Resource", skip_serializing_if = "BTreeSet::is_empty")]
    resource: &'a BTreeSet<String>,
    #[serde(rename = "Condition", skip_serializing_if = "Condition::is_empty")]
    condition: &'a Condition,
}

#[derive(Serialize)]
struct OutPolicy<'a> {
    #[serde(rename = "Version")]
    version: &'a str,
    #[serde(rename = "Statement")]
    statement: Vec<OutStatement<'a>>,
}

/// 命名策略
///
/// 一个策略对应一份 JSON 文档，内含有序的语句列表。
///
/// # 示例
///
/// ```rust
/// use iamrs::policy::Policy;
///
/// let policy = Policy::parse(
///     "readonly",
///     r#"{"Statement":[{"Effect":"Allow","Action":"s3:GetObject","Resource":"arn:aws:s3:::test/*"}]}"#,
/// )
/// .unwrap();
///
/// assert_eq!(policy.name(), "readonly");
/// assert_eq!(policy.statements().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    name: String,
    version: Option<String>,
    statements: Vec<Statement>,
}

impl Policy {
    /// 从语句列表创建策略
    pub fn new(name: impl Into<String>, statements: Vec<Statement>) -> Self {
        Self {
            name: name.into(),
            version: Some(POLICY_VERSION.to_string()),
            statements,
        }
    }

    /// 解析命名策略文档
    ///
    /// JSON 结构不符或 Effect 非法时返回 [`PolicyError`]。
    pub fn parse(name: impl Into<String>, raw: &str) -> Result<Self> {
        Self::parse_bytes(name, raw.as_bytes())
    }

    /// 从原始字节解析命名策略文档
    pub fn parse_bytes(name: impl Into<String>, raw: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(raw)
            .map_err(|e| Error::Policy(PolicyError::Malformed(e.to_string())))?;
        // 结构体也能从 JSON 数组反序列化，这里先确认顶层是对象
        if !value.is_object() {
            return Err(Error::malformed("policy document must be a JSON object"));
        }
        let doc: RawPolicy = serde_json::from_value(value)
            .map_err(|e| Error::Policy(PolicyError::Malformed(e.to_string())))?;

        let statements = doc
            .statement
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, s)| s.normalize(i))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: name.into(),
            version: doc.version,
            statements,
        })
    }

    /// 策略名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 策略语言版本
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// 有序语句列表
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// 取出语句列表
    pub fn into_statements(self) -> Vec<Statement> {
        self.statements
    }

    /// 检查是否有语句覆盖该桶
    pub fn matches_bucket(&self, bucket: &str) -> bool {
        self.statements.iter().any(|s| s.matches_bucket(bucket))
    }

    /// 序列化为 IAM 文档 JSON
    pub fn to_json(&self) -> Result<String> {
        let out = OutPolicy {
            version: self.version.as_deref().unwrap_or(POLICY_VERSION),
            statement: self
                .statements
                .iter()
                .map(|s| OutStatement {
                    sid: s.sid.as_deref(),
                    effect: s.effect,
                    action: &s.actions,
                    resource: &s.resources,
                    condition: &s.conditions,
                })
                .collect(),
        };
        serde_json::to_string(&out).map_err(|e| Error::internal(e.to_string()))
    }
}

/// 解析未命名策略文档
pub fn parse_policy(raw: &str) -> Result<Policy> {
    Policy::parse("", raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CONSOLE_ADMIN: &str = r#"{
        "Version": "2012-10-17",
        "Statement": [
            {"Effect": "Allow", "Action": ["admin:*"]},
            {"Effect": "Allow", "Action": ["s3:*"], "Resource": ["arn:aws:s3:::*"]}
        ]
    }"#;

    #[test]
    fn test_parse_list_form() {
        let policy = Policy::parse("consoleAdmin", CONSOLE_ADMIN).unwrap();
        assert_eq!(policy.version(), Some("2012-10-17"));
        assert_eq!(policy.statements().len(), 2);

        let admin = &policy.statements()[0];
        assert!(admin.is_allow());
        assert!(admin.resources().is_empty());
        assert!(admin.actions().contains("admin:*"));
    }

    #[test]
    fn test_parse_single_string_form() {
        let policy = parse_policy(
            r#"{"Statement":[{"Effect":"Allow","Action":"s3:*","Resource":"arn:aws:s3:::test"}]}"#,
        )
        .unwrap();

        let statement = &policy.statements()[0];
        assert_eq!(statement.actions().to_vec(), vec!["s3:*"]);
        assert!(statement.resources().contains("arn:aws:s3:::test"));
    }

    #[test]
    fn test_parse_single_statement_object() {
        let policy = parse_policy(
            r#"{"Statement":{"Effect":"Deny","Action":"s3:DeleteObject","Resource":"*"}}"#,
        )
        .unwrap();
        assert_eq!(policy.statements().len(), 1);
        assert!(policy.statements()[0].is_deny());
    }

    #[test]
    fn test_parse_invalid_effect() {
        let err = parse_policy(r#"{"Statement":[{"Effect":"Perhaps","Action":"s3:*"}]}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Policy(PolicyError::InvalidEffect(ref e)) if e == "Perhaps"
        ));
    }

    #[test]
    fn test_parse_missing_effect() {
        let err = parse_policy(r#"{"Statement":[{"Action":"s3:*"}]}"#).unwrap_err();
        assert!(matches!(err, Error::Policy(PolicyError::Malformed(_))));
    }

    #[test]
    fn test_parse_malformed_shapes() {
        assert!(parse_policy("not json").unwrap_err().is_parse_error());
        assert!(parse_policy("[]").unwrap_err().is_parse_error());
        assert!(
            parse_policy(r#"{"Statement":[{"Effect":"Allow","Action":42}]}"#)
                .unwrap_err()
                .is_parse_error()
        );
        assert!(
            parse_policy(r#"{"Statement":[{"Effect":"Allow","Action":"s3:*","Condition":"x"}]}"#)
                .unwrap_err()
                .is_parse_error()
        );
    }

    #[test]
    fn test_parse_condition_block() {
        let policy = parse_policy(
            r#"{"Statement":[{
                "Effect":"Allow",
                "Action":"s3:ListBucket",
                "Resource":"arn:aws:s3:::photos",
                "Condition":{"StringLike":{"s3:prefix":["2024/*","2025/*"]},"Bool":{"aws:SecureTransport":true}}
            }]}"#,
        )
        .unwrap();

        let statement = &policy.statements()[0];
        assert!(statement.has_conditions());
        assert_eq!(
            statement.conditions().get("StringLike"),
            Some(&json!({"s3:prefix": ["2024/*", "2025/*"]}))
        );
        assert!(statement.conditions().contains_key("Bool"));
    }

    #[test]
    fn test_parse_empty_statement_list() {
        let policy = parse_policy(r#"{"Version":"2012-10-17","Statement":[]}"#).unwrap();
        assert!(policy.statements().is_empty());
    }

    #[test]
    fn test_empty_condition_is_no_condition() {
        let policy =
            parse_policy(r#"{"Statement":[{"Effect":"Deny","Action":"s3:*","Condition":{}}]}"#)
                .unwrap();
        assert!(!policy.statements()[0].has_conditions());
    }

    #[test]
    fn test_to_json_round_trip() {
        let policy = Policy::parse("consoleAdmin", CONSOLE_ADMIN).unwrap();
        let json = policy.to_json().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["Version"], "2012-10-17");
        assert_eq!(value["Statement"][0]["Action"], json!(["admin:*"]));
        assert!(value["Statement"][0].get("Resource").is_none());

        let reparsed = Policy::parse("consoleAdmin", &json).unwrap();
        assert_eq!(reparsed, policy);
    }

    #[test]
    fn test_policy_matches_bucket() {
        let policy = Policy::parse("consoleAdmin", CONSOLE_ADMIN).unwrap();
        assert!(policy.matches_bucket("test1"));

        let scoped = parse_policy(
            r#"{"Statement":[{"Effect":"Allow","Action":["s3:*"],"Resource":["arn:aws:s3:::bucket1"]}]}"#,
        )
        .unwrap();
        assert!(scoped.matches_bucket("bucket1"));
        assert!(!scoped.matches_bucket("test1"));
    }
}
