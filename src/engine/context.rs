//! 条件上下文模块
//!
//! 为一次会话评估组装条件值表（`aws:username`、`aws:CurrentTime` 等）。
//! 这些值用于替换资源模式中的策略变量。

use crate::policy::ConditionValues;
use chrono::{DateTime, SecondsFormat, Utc};

/// 默认主体类型
pub const DEFAULT_PRINCIPAL_TYPE: &str = "AssumeRole";

/// 签名版本
pub const SIGNATURE_VERSION: &str = "AWS4-HMAC-SHA256";

/// 认证方式
pub const AUTH_TYPE: &str = "REST-HEADER";

/// 条件上下文构建器
///
/// # 示例
///
/// ```rust
/// use iamrs::engine::ConditionContext;
///
/// let values = ConditionContext::new("alice")
///     .secure_transport(true)
///     .region("us-east-1")
///     .build();
///
/// assert_eq!(values["aws:username"], vec!["alice"]);
/// assert_eq!(values["aws:SecureTransport"], vec!["true"]);
/// assert_eq!(values["s3:LocationConstraint"], vec!["us-east-1"]);
/// ```
#[derive(Debug, Clone)]
pub struct ConditionContext {
    username: String,
    principal_type: String,
    secure_transport: bool,
    region: String,
    now: Option<DateTime<Utc>>,
    claims: serde_json::Map<String, serde_json::Value>,
}

impl ConditionContext {
    /// 为指定用户创建上下文
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            principal_type: DEFAULT_PRINCIPAL_TYPE.to_string(),
            secure_transport: false,
            region: String::new(),
            now: None,
            claims: serde_json::Map::new(),
        }
    }

    /// 设置主体类型
    pub fn principal_type(mut self, principal_type: impl Into<String>) -> Self {
        self.principal_type = principal_type.into();
        self
    }

    /// 设置是否经由安全连接
    pub fn secure_transport(mut self, secure: bool) -> Self {
        self.secure_transport = secure;
        self
    }

    /// 设置区域
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// 固定请求时间（默认取构建时的当前时间）
    pub fn now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// 设置令牌声明
    ///
    /// 只复制字符串类型的声明，同名时覆盖内置条件值。
    pub fn claims(mut self, claims: serde_json::Map<String, serde_json::Value>) -> Self {
        self.claims = claims;
        self
    }

    /// 构建条件值表
    pub fn build(self) -> ConditionValues {
        let now = self.now.unwrap_or_else(Utc::now);
        let mut values = ConditionValues::new();

        let mut set = |key: &str, value: String| {
            values.insert(key.to_string(), vec![value]);
        };
        set("aws:username", self.username);
        set("aws:principaltype", self.principal_type);
        set("aws:SecureTransport", self.secure_transport.to_string());
        set(
            "aws:CurrentTime",
            now.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        set("aws:EpochTime", now.timestamp().to_string());
        set("s3:signatureversion", SIGNATURE_VERSION.to_string());
        set("s3:authType", AUTH_TYPE.to_string());
        set("s3:LocationConstraint", self.region);

        for (key, value) in self.claims {
            if let serde_json::Value::String(s) = value {
                values.insert(key, vec![s]);
            }
        }
        values
    }
}
