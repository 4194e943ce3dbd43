//! 访问解析编排
//!
//! 通过 [`PolicyDirectory`] 拉取用户、组与策略，再交给纯评估引擎。
//! 拉取阶段以有上限的并发进行，并响应取消信号；结果按请求顺序重新
//! 组装，因此同一主体的语句顺序不会因并发而改变。评估本身同步完成，
//! 不会在中途被取消。

use super::{GroupInfo, PolicyDirectory, UserInfo};
use crate::engine::{
    AccessFailure, BucketAccessReport, EvaluatorConfig, GroupFailure, PermissionEvaluator,
    PermissionResult, PolicyDocument, PrincipalPolicies, aggregate, collect_policy_names,
    combine_statements, policy_matches_bucket, resolve_bucket_access,
};
use crate::error::{ConfigError, Error, Result};
use crate::policy::{ConditionValues, Policy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// 默认的最大并发拉取数
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

/// 访问解析配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// 同时进行的目录调用上限
    pub max_concurrent_fetches: usize,

    /// 权限评估配置
    pub evaluator: EvaluatorConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            evaluator: EvaluatorConfig::default(),
        }
    }
}

impl ResolverConfig {
    /// 创建新的配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置最大并发拉取数
    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.max_concurrent_fetches = max;
        self
    }

    /// 设置权限评估配置
    pub fn with_evaluator(mut self, evaluator: EvaluatorConfig) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_fetches == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_concurrent_fetches".to_string(),
                message: "must be at least 1".to_string(),
            }
            .into());
        }
        self.evaluator.validate()
    }
}

/// 访问解析器
pub struct AccessResolver<D> {
    directory: Arc<D>,
    config: ResolverConfig,
    evaluator: PermissionEvaluator,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl<D: PolicyDirectory + 'static> AccessResolver<D> {
    /// 使用指定配置创建解析器
    pub fn new(directory: Arc<D>, config: ResolverConfig) -> Result<Self> {
        config.validate()?;
        let evaluator = PermissionEvaluator::new(config.evaluator.clone())?;
        Ok(Self::build(directory, config, evaluator))
    }

    /// 使用默认配置创建解析器
    pub fn with_default_config(directory: Arc<D>) -> Self {
        Self::build(
            directory,
            ResolverConfig::default(),
            PermissionEvaluator::with_default_config(),
        )
    }

    fn build(directory: Arc<D>, config: ResolverConfig, evaluator: PermissionEvaluator) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(config.max_concurrent_fetches)),
            evaluator,
            directory,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// 使用外部取消令牌
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// 获取取消令牌
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 取消所有未完成的拉取
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// 获取配置
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// 获取目录
    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    // ========================================================================
    // 会话权限
    // ========================================================================

    /// 计算用户的有效权限
    ///
    /// 自身策略在前，随后按组的加入顺序追加各组策略。任一策略无法拉取
    /// 或解析都会终止整个计算。
    #[tracing::instrument(skip(self, values))]
    pub async fn session_permissions(
        &self,
        user: &str,
        values: &ConditionValues,
    ) -> Result<PermissionResult> {
        let info = self.guard(self.directory.user_info(user)).await?;
        let groups = self.fetch_groups(info.member_of.clone()).await?;

        let own = self.fetch_policies(info.policies()).await?;
        let inherited = self
            .fetch_policies(groups.iter().flat_map(GroupInfo::policies).collect())
            .await?;

        let statements = aggregate(&own, &inherited);
        let result = self.evaluator.evaluate(&statements, values)?;

        debug!(
            own = own.len(),
            inherited = inherited.len(),
            statements = statements.len(),
            "computed session permissions"
        );
        Ok(result)
    }

    /// 合并用户自身与所属组的策略为一份文档
    ///
    /// 策略名称去重，保留第一次出现的位置。
    #[tracing::instrument(skip(self))]
    pub async fn effective_policy(&self, user: &str) -> Result<Policy> {
        let info = self.guard(self.directory.user_info(user)).await?;
        let groups = self.fetch_groups(info.member_of.clone()).await?;

        let names = collect_policy_names(
            &info.policy_name,
            groups.iter().map(|g| g.policy.as_str()),
        );
        let policies = self.fetch_policies(names).await?;
        let statements = policies
            .into_iter()
            .flat_map(Policy::into_statements)
            .collect();

        Ok(combine_statements(user, statements))
    }

    // ========================================================================
    // 桶访问
    // ========================================================================

    /// 列出拥有桶访问权限的用户
    ///
    /// - 组列表无法获取时，退回到用户记录中的 `member_of`
    /// - 不存在的组被忽略；其他原因无法加载的组记入报告的
    ///   `skipped_groups`，声明属于该组的用户会被排除（该组可能带有拒绝）
    /// - 无法拉取的策略会被跳过并记入 `failures`
    /// - 策略解析失败的用户会被排除
    #[tracing::instrument(skip(self))]
    pub async fn users_with_access_to_bucket(&self, bucket: &str) -> Result<BucketAccessReport> {
        let users = self.guard(self.directory.list_users()).await?;

        let mut group_names: BTreeSet<String> = match self.guard(self.directory.list_groups()).await
        {
            Ok(names) => names.into_iter().collect(),
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(err) => {
                warn!(error = %err, "unable to list groups, using user memberships");
                BTreeSet::new()
            }
        };
        group_names.extend(users.iter().flat_map(|u| u.member_of.iter().cloned()));
        let group_names: Vec<String> = group_names.into_iter().collect();

        let results = self
            .fan_out(group_names.clone(), |dir, name: String| async move {
                dir.group_info(&name).await
            })
            .await;
        let mut groups = Vec::with_capacity(results.len());
        let mut skipped_groups = Vec::new();
        for (name, result) in group_names.into_iter().zip(results) {
            match result {
                Ok(group) => groups.push(group),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                // 不存在的组不带任何策略
                Err(err) if err.is_not_found() => {
                    debug!(group = %name, "ignoring membership of unknown group");
                }
                Err(err) => {
                    warn!(group = %name, error = %err, "skipping group that could not be loaded");
                    skipped_groups.push(GroupFailure {
                        group: name,
                        message: err.to_string(),
                    });
                }
            }
        }

        let names: Vec<String> = users
            .iter()
            .flat_map(UserInfo::policies)
            .chain(groups.iter().flat_map(GroupInfo::policies))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let raws = self
            .fan_out(names.clone(), |dir, name: String| async move {
                dir.get_policy(&name).await
            })
            .await;

        let mut documents = HashMap::with_capacity(names.len());
        for (name, raw) in names.into_iter().zip(raws) {
            let raw = match raw {
                Ok(raw) => Ok(raw),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(err) => {
                    warn!(policy = %name, error = %err, "skipping policy that could not be fetched");
                    Err(err.to_string())
                }
            };
            documents.insert(name, raw);
        }

        let mut fetch_failures = Vec::new();
        let mut principals = Vec::new();
        for user in &users {
            principals.push(principal_entry(
                &user.access_key,
                &user.policies(),
                &documents,
                &mut fetch_failures,
            ));
        }
        for group in &groups {
            let policies = group.policies();
            for member in &group.members {
                principals.push(principal_entry(
                    member,
                    &policies,
                    &documents,
                    &mut fetch_failures,
                ));
            }
        }

        let mut report = resolve_bucket_access(bucket, &principals);
        report.failures.extend(fetch_failures);

        // 所属组未能加载的用户无法确认是否被拒绝
        if !skipped_groups.is_empty() {
            let unresolved: BTreeSet<&str> = users
                .iter()
                .filter(|u| {
                    u.member_of
                        .iter()
                        .any(|g| skipped_groups.iter().any(|s| &s.group == g))
                })
                .map(|u| u.access_key.as_str())
                .collect();
            report.principals.retain(|p| !unresolved.contains(p.as_str()));
        }
        report.skipped_groups = skipped_groups;
        Ok(report)
    }

    /// 列出覆盖该桶的全部策略（按名称排序）
    #[tracing::instrument(skip(self))]
    pub async fn policies_for_bucket(&self, bucket: &str) -> Result<Vec<Policy>> {
        let stored = self.guard(self.directory.list_policies()).await?;

        let mut matched = Vec::new();
        for (name, raw) in stored {
            let policy = Policy::parse(name, &raw)?;
            if policy_matches_bucket(&policy, bucket) {
                matched.push(policy);
            }
        }
        Ok(matched)
    }

    // ========================================================================
    // 策略反查
    // ========================================================================

    /// 列出直接挂载该策略的用户（按字典序）
    #[tracing::instrument(skip(self))]
    pub async fn users_for_policy(&self, policy: &str) -> Result<Vec<String>> {
        self.guard(self.directory.get_policy(policy)).await?;
        let users = self.guard(self.directory.list_users()).await?;

        let mut matched: Vec<String> = users
            .into_iter()
            .filter(|u| u.has_policy(policy))
            .map(|u| u.access_key)
            .collect();
        matched.sort();
        Ok(matched)
    }

    /// 列出挂载该策略的组（按字典序）
    #[tracing::instrument(skip(self))]
    pub async fn groups_for_policy(&self, policy: &str) -> Result<Vec<String>> {
        self.guard(self.directory.get_policy(policy)).await?;
        let names = self.guard(self.directory.list_groups()).await?;
        let groups = self.fetch_groups(names).await?;

        let mut matched: Vec<String> = groups
            .into_iter()
            .filter(|g| g.has_policy(policy))
            .map(|g| g.name)
            .collect();
        matched.sort();
        Ok(matched)
    }

    // ========================================================================
    // 拉取
    // ========================================================================

    /// 拉取组记录，任一失败即返回错误
    async fn fetch_groups(&self, names: Vec<String>) -> Result<Vec<GroupInfo>> {
        self.fan_out(names, |dir, name: String| async move {
            dir.group_info(&name).await
        })
        .await
        .into_iter()
        .collect()
    }

    /// 拉取并解析策略，保持名称顺序，任一失败即返回错误
    async fn fetch_policies(&self, names: Vec<String>) -> Result<Vec<Policy>> {
        let raws = self
            .fan_out(names.clone(), |dir, name: String| async move {
                dir.get_policy(&name).await
            })
            .await;

        names
            .into_iter()
            .zip(raws)
            .map(|(name, raw)| Policy::parse(name, &raw?))
            .collect()
    }

    /// 在取消信号下等待单个目录调用
    async fn guard<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = call => result,
        }
    }

    /// 以有上限的并发执行一组目录调用，按输入顺序返回结果
    async fn fan_out<I, R, F, Fut>(&self, inputs: Vec<I>, fetch: F) -> Vec<Result<R>>
    where
        I: Send + 'static,
        R: Send + 'static,
        F: Fn(Arc<D>, I) -> Fut,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let mut slots: Vec<Option<Result<R>>> =
            std::iter::repeat_with(|| None).take(inputs.len()).collect();
        let mut tasks = JoinSet::new();

        for (index, input) in inputs.into_iter().enumerate() {
            let permits = self.permits.clone();
            let cancel = self.cancel.clone();
            let call = fetch(self.directory.clone(), input);

            tasks.spawn(async move {
                // 先等待许可，再开始实际调用
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(Error::Cancelled),
                    permit = permits.acquire_owned() => match permit {
                        Ok(_permit) => tokio::select! {
                            biased;
                            _ = cancel.cancelled() => Err(Error::Cancelled),
                            result = call => result,
                        },
                        Err(_) => Err(Error::Cancelled),
                    },
                };
                (index, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(err) => warn!(error = %err, "directory fetch task failed"),
            }
        }

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(Error::internal("directory fetch task did not complete"))))
            .collect()
    }
}

/// 为一个主体组装已拉取的策略文档，拉取失败的策略记为失败
fn principal_entry(
    principal: &str,
    names: &[String],
    documents: &HashMap<String, std::result::Result<String, String>>,
    failures: &mut Vec<AccessFailure>,
) -> PrincipalPolicies {
    let mut entry = PrincipalPolicies::new(principal);
    for name in names {
        match documents.get(name) {
            Some(Ok(raw)) => entry.documents.push(PolicyDocument::new(name.as_str(), raw.as_str())),
            Some(Err(message)) => failures.push(AccessFailure {
                principal: principal.to_string(),
                policy: name.clone(),
                message: message.clone(),
            }),
            None => failures.push(AccessFailure {
                principal: principal.to_string(),
                policy: name.clone(),
                message: "policy was not fetched".to_string(),
            }),
        }
    }
    entry
}
