//! 集成测试：目录编排
//!
//! 测试通过内存目录进行的会话权限计算、桶访问列表与策略反查。

#![cfg(feature = "directory")]

use iamrs::engine::ConditionContext;
use iamrs::{AccessResolver, GroupInfo, InMemoryDirectory, ResolverConfig, UserInfo};
use std::sync::Arc;

const CONSOLE_ADMIN: &str = r#"{
    "Version": "2012-10-17",
    "Statement": [
        {"Effect": "Allow", "Action": ["admin:*"]},
        {"Effect": "Allow", "Action": ["s3:*"], "Resource": ["arn:aws:s3:::*"]}
    ]
}"#;
const TEST_POLICY: &str = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Deny","Action":["s3:*"],"Resource":["arn:aws:s3:::bucket1"]}]}"#;
const OTHER_POLICY: &str = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Action":["s3:*"],"Resource":["arn:aws:s3:::bucket2"]}]}"#;
const THIRD_POLICY: &str = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Action":["s3:*"],"Resource":["arn:aws:s3:::bucket3"]}]}"#;
const HOME_POLICY: &str = r#"{"Version":"2012-10-17","Statement":[
    {"Effect":"Allow","Action":["s3:ListBucket"],"Resource":["arn:aws:s3:::home"],"Condition":{"StringLike":{"s3:prefix":["${aws:username}/*"]}}},
    {"Effect":"Allow","Action":["s3:GetObject","s3:PutObject"],"Resource":["arn:aws:s3:::home/${aws:username}/*"]}
]}"#;

/// testuser1 挂载了一个不存在的 redundantPolicy
fn resolver() -> AccessResolver<InMemoryDirectory> {
    let directory = InMemoryDirectory::new()
        .with_policy("consoleAdmin", CONSOLE_ADMIN)
        .with_policy("testPolicy", TEST_POLICY)
        .with_policy("otherPolicy", OTHER_POLICY)
        .with_policy("thirdPolicy", THIRD_POLICY)
        .with_policy("homePolicy", HOME_POLICY)
        .with_user(
            UserInfo::new("testuser1")
                .with_policy("consoleAdmin,testPolicy,redundantPolicy")
                .member_of("group1"),
        )
        .with_user(
            UserInfo::new("testuser2")
                .with_policy("testPolicy, otherPolicy")
                .member_of("group1"),
        )
        .with_user(UserInfo::new("frank").with_policy("homePolicy").member_of("group1"))
        .with_group(
            GroupInfo::new("group1")
                .with_policy("thirdPolicy")
                .with_member("testuser1")
                .with_member("testuser2"),
        );

    AccessResolver::new(
        Arc::new(directory),
        ResolverConfig::new().with_max_concurrent_fetches(2),
    )
    .expect("valid resolver config")
}

/// 测试桶访问列表
#[tokio::test]
async fn test_users_with_access_to_bucket() {
    let resolver = resolver();

    let report = resolver.users_with_access_to_bucket("bucket0").await.unwrap();
    assert_eq!(report.principals, vec!["testuser1"]);

    let report = resolver.users_with_access_to_bucket("bucket1").await.unwrap();
    assert!(report.principals.is_empty());

    let report = resolver.users_with_access_to_bucket("bucket2").await.unwrap();
    assert_eq!(report.principals, vec!["testuser1", "testuser2"]);

    let report = resolver.users_with_access_to_bucket("bucket3").await.unwrap();
    assert_eq!(report.principals, vec!["testuser1", "testuser2"]);

    // 不存在的策略被跳过并记录
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].principal, "testuser1");
    assert_eq!(report.failures[0].policy, "redundantPolicy");
}

/// 测试会话权限：自身策略 + 组策略 + 变量替换
#[tokio::test]
async fn test_session_permissions() {
    let resolver = resolver();
    let values = ConditionContext::new("frank").build();

    let result = resolver.session_permissions("frank", &values).await.unwrap();

    assert!(result.default_actions().unwrap().is_empty());
    assert!(result.is_allowed("arn:aws:s3:::home", "s3:ListBucket"));
    assert!(result.is_allowed("arn:aws:s3:::home/frank/*", "s3:PutObject"));
    assert!(result.is_allowed("arn:aws:s3:::bucket3", "s3:*"));

    assert_eq!(result.allow_resources.len(), 1);
    assert_eq!(result.allow_resources[0].prefixes, vec!["${aws:username}/*"]);
}

/// 测试会话权限在策略缺失时终止
#[tokio::test]
async fn test_session_permissions_missing_policy() {
    let resolver = resolver();
    let values = ConditionContext::new("testuser1").build();

    let err = resolver
        .session_permissions("testuser1", &values)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = resolver
        .session_permissions("nobody", &values)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

/// 测试合并后的用户策略文档
#[tokio::test]
async fn test_effective_policy() {
    let resolver = resolver();

    let policy = resolver.effective_policy("testuser2").await.unwrap();
    assert_eq!(policy.name(), "testuser2");
    assert_eq!(policy.version(), Some("2012-10-17"));
    assert_eq!(policy.statements().len(), 3);
    assert!(policy.statements()[0].is_deny());

    let json = policy.to_json().unwrap();
    assert!(json.contains("arn:aws:s3:::bucket3"));
}

/// 测试覆盖某个桶的策略列表
#[tokio::test]
async fn test_policies_for_bucket() {
    let resolver = resolver();

    let names: Vec<String> = resolver
        .policies_for_bucket("bucket2")
        .await
        .unwrap()
        .iter()
        .map(|p| p.name().to_string())
        .collect();
    assert_eq!(names, vec!["consoleAdmin", "otherPolicy"]);
}

/// 测试策略反查用户与组
#[tokio::test]
async fn test_users_and_groups_for_policy() {
    let resolver = resolver();

    assert_eq!(
        resolver.users_for_policy("testPolicy").await.unwrap(),
        vec!["testuser1", "testuser2"]
    );
    assert_eq!(
        resolver.groups_for_policy("thirdPolicy").await.unwrap(),
        vec!["group1"]
    );
    assert!(resolver.groups_for_policy("otherPolicy").await.unwrap().is_empty());

    assert!(resolver.users_for_policy("missing").await.unwrap_err().is_not_found());
    assert!(resolver.groups_for_policy("missing").await.unwrap_err().is_not_found());
}
