//! 集成测试：策略解析与资源匹配
//!
//! 测试 JSON 策略文档的规范化、序列化以及资源模式匹配。

use iamrs::policy::resource::{matches, matches_bucket, substitute_variables};
use iamrs::{ConditionValues, Effect, Error, Policy, parse_policy};

/// 测试通配符资源匹配的基本规则
#[test]
fn test_wildcard_matching() {
    assert!(matches("bucket/*", "bucket/a/b"));
    assert!(!matches("bucket", "bucket2"));
    assert!(matches("*", "anything"));
    assert!(matches("*", ""));

    // ARN 前缀两侧等价
    assert!(matches("arn:aws:s3:::bucket/*", "bucket/key"));
    assert!(matches("bucket/*", "arn:aws:s3:::bucket/key"));

    // 桶级匹配同时接受 bucket 与 bucket/*
    assert!(matches_bucket("arn:aws:s3:::bucket/*", "bucket"));
    assert!(!matches_bucket("arn:aws:s3:::bucket/*", "bucket2"));
}

/// 测试策略变量替换
#[test]
fn test_substitute_variables() {
    let mut values = ConditionValues::new();
    values.insert("aws:username".to_string(), vec!["alice".to_string()]);

    assert_eq!(
        substitute_variables("arn:aws:s3:::home/${aws:username}/*", &values),
        "arn:aws:s3:::home/alice/*"
    );
    // 未知变量保持原样
    assert_eq!(
        substitute_variables("arn:aws:s3:::home/${jwt:sub}/*", &values),
        "arn:aws:s3:::home/${jwt:sub}/*"
    );
}

/// 测试单值与数组两种写法解析后等价
#[test]
fn test_single_and_list_forms_equivalent() {
    let single = Policy::parse(
        "p",
        r#"{"Statement":[{"Effect":"Allow","Action":"s3:GetObject","Resource":"arn:aws:s3:::a"}]}"#,
    )
    .expect("single-value form should parse");
    let list = Policy::parse(
        "p",
        r#"{"Statement":[{"Effect":"Allow","Action":["s3:GetObject"],"Resource":["arn:aws:s3:::a"]}]}"#,
    )
    .expect("list form should parse");

    assert_eq!(single.statements(), list.statements());
}

/// 测试解析错误分类
#[test]
fn test_parse_errors() {
    let cases = [
        "",
        "{",
        r#"{"Statement":[{"Effect":"allow","Action":"s3:*"}]}"#,
        r#"{"Statement":[{"Action":"s3:*"}]}"#,
        r#"{"Statement":[{"Effect":"Allow","Resource":{"bad":1}}]}"#,
        r#"{"Statement":[{"Effect":"Allow","Condition":["StringLike"]}]}"#,
    ];

    for raw in cases {
        let err = parse_policy(raw).expect_err(raw);
        assert!(err.is_parse_error(), "{} should be a parse error", raw);
        assert!(matches!(err, Error::Policy(_)));
    }
}

/// 测试操作集合去重且有序
#[test]
fn test_action_set_deduplicated_and_sorted() {
    let policy = parse_policy(
        r#"{"Statement":[{"Effect":"Deny","Action":["s3:PutObject","s3:GetObject","s3:PutObject"]}]}"#,
    )
    .unwrap();

    let statement = &policy.statements()[0];
    assert_eq!(statement.effect(), Effect::Deny);
    assert_eq!(statement.actions().to_vec(), vec!["s3:GetObject", "s3:PutObject"]);
}

/// 测试序列化回文档后可以再次解析为相同策略
#[test]
fn test_to_json_reparse() {
    let policy = Policy::parse(
        "withCondition",
        r#"{"Version":"2012-10-17","Statement":[{
            "Sid":"ListPhotos",
            "Effect":"Allow",
            "Action":"s3:ListBucket",
            "Resource":"arn:aws:s3:::photos",
            "Condition":{"StringLike":{"s3:prefix":["2024/*"]}}
        }]}"#,
    )
    .unwrap();

    let json = policy.to_json().unwrap();
    let reparsed = Policy::parse("withCondition", &json).unwrap();
    assert_eq!(reparsed, policy);
    assert_eq!(reparsed.statements()[0].sid(), Some("ListPhotos"));
}
