//! 资源匹配模块
//!
//! 判断具体资源标识（桶，或 桶/前缀）是否命中策略语句中的资源模式。
//!
//! ## 匹配规则
//!
//! - 模式与候选值两侧的 `arn:aws:s3:::` 前缀均会被去掉
//! - `*` 匹配任意长度（可为空）的字符序列，`?` 匹配恰好一个字符
//! - 其余字符逐个精确比较
//!
//! ```rust
//! use iamrs::policy::resource::{matches, matches_bucket};
//!
//! assert!(matches("bucket/*", "bucket/a/b"));
//! assert!(!matches("bucket", "bucket2"));
//! assert!(matches("*", "anything"));
//!
//! // 指向 `bucket/*` 的语句也视为覆盖了桶本身
//! assert!(matches_bucket("arn:aws:s3:::bucket/*", "bucket"));
//! ```

use std::borrow::Cow;
use std::collections::HashMap;

/// S3 资源 ARN 前缀
pub const ARN_PREFIX: &str = "arn:aws:s3:::";

/// 通配符常量，表示匹配所有
pub const WILDCARD: &str = "*";

/// 去掉 `arn:aws:s3:::` 前缀
pub fn strip_arn(pattern: &str) -> &str {
    pattern.strip_prefix(ARN_PREFIX).unwrap_or(pattern)
}

/// 检查候选资源是否命中资源模式
pub fn matches(pattern: &str, candidate: &str) -> bool {
    wildcard_match(strip_arn(pattern), strip_arn(candidate))
}

/// 检查资源模式是否覆盖某个桶
///
/// `bucket` 与 `bucket/*` 任意一种形式命中即可。
pub fn matches_bucket(pattern: &str, bucket: &str) -> bool {
    let bucket = strip_arn(bucket);
    matches(pattern, bucket) || matches(pattern, &format!("{}/*", bucket))
}

/// 检查资源模式是否能命中空资源（即不限定具体资源）
pub fn is_unscoped(pattern: &str) -> bool {
    matches(pattern, "")
}

/// 替换模式中的策略变量
///
/// `${aws:username}` 这类变量会被替换为 `values` 中对应键的第一个值；
/// 未知变量与未闭合的 `${` 保持原样。
///
/// ```rust
/// use std::collections::HashMap;
/// use iamrs::policy::resource::substitute_variables;
///
/// let mut values = HashMap::new();
/// values.insert("aws:username".to_string(), vec!["alice".to_string()]);
///
/// let resolved = substitute_variables("arn:aws:s3:::home/${aws:username}/*", &values);
/// assert_eq!(resolved, "arn:aws:s3:::home/alice/*");
/// ```
pub fn substitute_variables<'a>(
    pattern: &'a str,
    values: &HashMap<String, Vec<String>>,
) -> Cow<'a, str> {
    if !pattern.contains("${") {
        return Cow::Borrowed(pattern);
    }

    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match values.get(key).and_then(|v| v.first()) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// 通配符匹配（支持 `*` 与 `?`）
///
/// 单次回溯实现：记录最近一个 `*` 的位置，失配时让它多吞一个字符。
fn wildcard_match(pattern: &str, text: &str) -> bool {
    if pattern == WILDCARD {
        return true;
    }

    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut star_ti = 0usize;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            star_ti = ti;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            star_ti += 1;
            ti = star_ti;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
