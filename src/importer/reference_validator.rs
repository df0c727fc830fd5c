// ==========================================
// 批量导入系统 - 引用完整性校验器
// ==========================================
// 职责: 确认候选行的每个父实体引用都指向已落库实体
// 范围: 仅处理通过重复判定的候选行（重复行既不校验也不落库）
// ==========================================

use crate::domain::{EntityCandidate, ValidationOutcome};
use crate::importer::existing_key_set::ExistingKeySet;
use crate::repository::{EntityImportRepository, RepositoryResult};
use tracing::trace;

pub const PARENT_NOT_FOUND: &str = "parent not found";

#[derive(Debug, Default)]
pub struct ReferenceValidator;

impl ReferenceValidator {
    pub async fn validate<R>(
        &self,
        candidate: EntityCandidate,
        existing: &mut ExistingKeySet<'_, R>,
    ) -> RepositoryResult<ValidationOutcome>
    where
        R: EntityImportRepository + ?Sized,
    {
        let mut missing = Vec::new();
        for parent in &candidate.parent_refs {
            if !existing.contains(parent.parent_kind, &parent.key).await? {
                missing.push(format!("{}={} ({})", parent.field, parent.key, parent.parent_kind));
            }
        }

        if missing.is_empty() {
            return Ok(ValidationOutcome::Accepted(candidate));
        }

        trace!(key = %candidate.natural_key, line = candidate.line, "父实体缺失");
        Ok(ValidationOutcome::invalid(
            candidate.line,
            format!("{}: {}", PARENT_NOT_FOUND, missing.join(", ")),
        ))
    }
}
