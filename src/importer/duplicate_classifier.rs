// ==========================================
// 批量导入系统 - 重复判定器
// ==========================================
// 职责: 候选行三级分类（新增 / 批内重复 / 库内重复）
// 规则（顺序不可调换）:
// 1. 键已在批内集合 → DuplicateInBatch
// 2. 键已在存储 → DuplicateInStore，同时加入批内集合
//    （同键后续出现报告为 DuplicateInBatch，而不是重复报告库内重复）
// 3. 否则加入批内集合，作为暂定接受传给下游
// 说明: 批内集合不落库；存储唯一约束才是最终校验
// ==========================================

use crate::domain::{EntityCandidate, ValidationOutcome};
use crate::importer::existing_key_set::ExistingKeySet;
use crate::repository::{EntityImportRepository, RepositoryResult};
use std::collections::HashSet;
use tracing::trace;

#[derive(Debug, Default)]
pub struct DuplicateClassifier {
    seen: HashSet<String>,
}

impl DuplicateClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn classify<R>(
        &mut self,
        candidate: EntityCandidate,
        existing: &mut ExistingKeySet<'_, R>,
    ) -> RepositoryResult<ValidationOutcome>
    where
        R: EntityImportRepository + ?Sized,
    {
        let key = candidate.natural_key.clone();
        let line = candidate.line;

        if self.seen.contains(&key) {
            trace!(key = %key, line, "批内重复");
            return Ok(ValidationOutcome::DuplicateInBatch { key, line });
        }

        if existing.contains(candidate.kind, &key).await? {
            trace!(key = %key, line, "库内重复");
            self.seen.insert(key.clone());
            return Ok(ValidationOutcome::DuplicateInStore { key, line });
        }

        self.seen.insert(key);
        Ok(ValidationOutcome::Accepted(candidate))
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
