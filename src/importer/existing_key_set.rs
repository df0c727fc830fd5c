// ==========================================
// 批量导入系统 - 已存在键集合
// ==========================================
// 职责: 针对持久化存储的成员判定，按 (实体类型, 自然键) 记忆化
// 生命周期: 单个 BatchJob；提交前存储不被本批次修改，缓存结果有效
// ==========================================

use crate::domain::EntityKind;
use crate::repository::{EntityImportRepository, RepositoryResult};
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub struct ExistingKeySet<'a, R: EntityImportRepository + ?Sized> {
    repo: &'a R,
    known: HashMap<EntityKind, HashMap<String, bool>>,
    store_lookups: usize,
}

impl<'a, R: EntityImportRepository + ?Sized> ExistingKeySet<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self {
            repo,
            known: HashMap::new(),
            store_lookups: 0,
        }
    }

    /// 批量预取：一次查询确定一组键的存在性
    pub async fn prefetch<I>(&mut self, kind: EntityKind, keys: I) -> RepositoryResult<()>
    where
        I: IntoIterator<Item = String>,
    {
        let cached = self.known.entry(kind).or_default();
        let pending: Vec<String> = keys
            .into_iter()
            .filter(|k| !cached.contains_key(k))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let existing: HashSet<String> = self
            .repo
            .batch_check_exists(kind, pending.clone())
            .await?
            .into_iter()
            .collect();
        self.store_lookups += 1;
        debug!(kind = %kind, requested = pending.len(), found = existing.len(), "键存在性预取完成");

        let cached = self.known.entry(kind).or_default();
        for key in pending {
            let present = existing.contains(&key);
            cached.insert(key, present);
        }
        Ok(())
    }

    /// 成员判定（未缓存时回落到单键查询）
    pub async fn contains(&mut self, kind: EntityKind, key: &str) -> RepositoryResult<bool> {
        if let Some(present) = self.known.get(&kind).and_then(|m| m.get(key)) {
            return Ok(*present);
        }

        let present = self.repo.exists_by_key(kind, key).await?;
        self.store_lookups += 1;
        self.known
            .entry(kind)
            .or_default()
            .insert(key.to_string(), present);
        Ok(present)
    }

    /// 实际访问存储的次数
    pub fn store_lookups(&self) -> usize {
        self.store_lookups
    }
}
