//! 统一错误类型模块
//!
//! 提供 iamrs 库中所有操作的错误类型定义。

use std::fmt;

/// iamrs 库的统一结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// iamrs 库的错误类型
#[derive(Debug)]
pub enum Error {
    /// 策略文档解析错误
    Policy(PolicyError),

    /// 条件块解码错误
    Condition(ConditionError),

    /// 目录（存储）错误
    Storage(StorageError),

    /// 配置错误
    Config(ConfigError),

    /// 拉取阶段被取消
    Cancelled,

    /// 内部错误
    Internal(String),
}

impl Error {
    /// 创建一个内部错误
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// 创建一个"未找到"错误
    pub fn not_found(item: impl Into<String>) -> Self {
        Error::Storage(StorageError::NotFound(item.into()))
    }

    /// 创建一个策略格式错误
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::Policy(PolicyError::Malformed(msg.into()))
    }

    /// 是否为"未找到"错误
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Storage(StorageError::NotFound(_)))
    }

    /// 是否为策略解析错误
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Error::Policy(_))
    }
}

/// 策略解析相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// JSON 无法解码为策略文档结构
    Malformed(String),
    /// Effect 既不是 Allow 也不是 Deny
    InvalidEffect(String),
}

/// 条件块相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionError {
    /// 条件块无法解码为预期结构
    Unmarshal { operator: String, message: String },
}

/// 存储相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// 记录未找到
    NotFound(String),
    /// 操作失败
    OperationFailed(String),
}

/// 配置相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 无效的配置值
    InvalidValue { key: String, message: String },
}

// ============================================================================
// Display 实现
// ============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Policy(e) => write!(f, "Policy error: {}", e),
            Error::Condition(e) => write!(f, "Condition error: {}", e),
            Error::Storage(e) => write!(f, "Storage error: {}", e),
            Error::Config(e) => write!(f, "Config error: {}", e),
            Error::Cancelled => write!(f, "operation cancelled"),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::Malformed(msg) => write!(f, "malformed policy: {}", msg),
            PolicyError::InvalidEffect(effect) => {
                write!(f, "invalid effect '{}': expected Allow or Deny", effect)
            }
        }
    }
}

impl fmt::Display for ConditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionError::Unmarshal { operator, message } => {
                write!(f, "unable to decode condition '{}': {}", operator, message)
            }
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound(item) => write!(f, "not found: {}", item),
            StorageError::OperationFailed(msg) => write!(f, "storage operation failed: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { key, message } => {
                write!(f, "invalid configuration value for '{}': {}", key, message)
            }
        }
    }
}

// ============================================================================
// std::error::Error 实现
// ============================================================================

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Policy(e) => Some(e),
            Error::Condition(e) => Some(e),
            Error::Storage(e) => Some(e),
            Error::Config(e) => Some(e),
            Error::Cancelled | Error::Internal(_) => None,
        }
    }
}

impl std::error::Error for PolicyError {}
impl std::error::Error for ConditionError {}
impl std::error::Error for StorageError {}
impl std::error::Error for ConfigError {}

// ============================================================================
// From 实现 - 方便错误转换
// ============================================================================

impl From<PolicyError> for Error {
    fn from(err: PolicyError) -> Self {
        Error::Policy(err)
    }
}

impl From<ConditionError> for Error {
    fn from(err: ConditionError) -> Self {
        Error::Condition(err)
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::Storage(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}
