//! 策略聚合模块
//!
//! 把主体自身的策略与其所属各组的策略合并为一条有序语句序列：
//! 自身策略的语句在前，随后按组的给出顺序追加各组策略的语句。
//!
//! 聚合不去重；重复语句只会被冗余地再评估一次，不影响最终结果。

use crate::policy::{Policy, Statement};
use std::collections::HashSet;

/// 聚合主体自身策略与组策略
///
/// # 示例
///
/// ```rust
/// use iamrs::engine::aggregate;
/// use iamrs::policy::{Policy, Statement};
///
/// let own = Policy::new("own", vec![Statement::allow().action("s3:GetObject").build()]);
/// let group = Policy::new("group", vec![Statement::deny().action("s3:PutObject").build()]);
///
/// let statements = aggregate(&[own], &[group]);
/// assert_eq!(statements.len(), 2);
/// assert!(statements[0].is_allow());
/// assert!(statements[1].is_deny());
/// ```
pub fn aggregate(own_policies: &[Policy], group_policies: &[Policy]) -> Vec<Statement> {
    own_policies
        .iter()
        .chain(group_policies.iter())
        .flat_map(|p| p.statements().iter().cloned())
        .collect()
}

/// 拆分逗号连接的策略名称字段
///
/// 去掉首尾空白并丢弃空项，保持原有顺序。
///
/// ```rust
/// use iamrs::engine::split_policy_names;
///
/// assert_eq!(split_policy_names("a, b,,c "), vec!["a", "b", "c"]);
/// assert!(split_policy_names("").is_empty());
/// ```
pub fn split_policy_names(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// 收集主体自身与各组的策略名称
///
/// 结果按"自身在前、各组按给出顺序"排列，重复名称只保留第一次出现。
pub fn collect_policy_names<'a, I>(own: &str, group_policy_fields: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    let own_names = split_policy_names(own);
    let group_names = group_policy_fields
        .into_iter()
        .flat_map(split_policy_names);

    for name in own_names.into_iter().chain(group_names) {
        if seen.insert(name.clone()) {
            names.push(name);
        }
    }
    names
}

/// 把语句序列合并为一份策略文档
pub fn combine_statements(name: impl Into<String>, statements: Vec<Statement>) -> Policy {
    Policy::new(name, statements)
}
