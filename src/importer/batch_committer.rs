// ==========================================
// 批量导入系统 - 批量提交器
// ==========================================
// 职责: 将全部接受行作为一次逻辑写入落库
// 冲突降级（由 CommitMode 决定）:
// - Partial: 未冲突行记为写入成功，冲突行记为库内重复
// - AllOrNothing: 整批失败，每一行都记为错误
// 任何情况下行都不会被静默丢弃
// 副作用: 有行写入时驱逐该类型的实体列表缓存
// ==========================================

use crate::cache::EntityCache;
use crate::domain::{CommitMode, EntityCandidate, EntityKind};
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::result_aggregator::ResultAggregator;
use crate::repository::EntityImportRepository;
use std::collections::HashMap;
use tracing::{error, info, warn};

pub const COMMIT_REJECTED: &str = "commit rejected";

pub struct BatchCommitter<'a, R: EntityImportRepository + ?Sized> {
    repo: &'a R,
    cache: Option<&'a dyn EntityCache>,
}

impl<'a, R: EntityImportRepository + ?Sized> BatchCommitter<'a, R> {
    pub fn new(repo: &'a R, cache: Option<&'a dyn EntityCache>) -> Self {
        Self { repo, cache }
    }

    /// 提交接受行并把结果写入汇总器
    ///
    /// # 返回
    /// - Ok(usize): 实际写入行数
    /// - Err: 存储不可用（非唯一约束错误），整次调用失败
    pub async fn commit(
        &self,
        kind: EntityKind,
        batch_id: &str,
        accepted: Vec<EntityCandidate>,
        mode: CommitMode,
        aggregator: &mut ResultAggregator,
    ) -> ImporterResult<usize> {
        if accepted.is_empty() {
            return Ok(0);
        }

        let lines: HashMap<String, usize> = accepted
            .iter()
            .map(|c| (c.natural_key.clone(), c.line))
            .collect();
        let entities = accepted
            .into_iter()
            .map(|c| c.into_entity(batch_id))
            .collect::<Vec<_>>();
        let requested = entities.len();

        match self.repo.save_all(kind, entities, mode).await {
            Ok(outcome) => {
                let committed = outcome.committed.len();
                for entity in outcome.committed {
                    let line = Self::line_of(&lines, &entity.natural_key)?;
                    aggregator.record_inserted(entity.natural_key, line);
                }
                if !outcome.rejected.is_empty() {
                    warn!(
                        kind = %kind,
                        rejected = outcome.rejected.len(),
                        "提交时存储拒绝部分行（并发导入冲突）"
                    );
                }
                for key in outcome.rejected {
                    let line = Self::line_of(&lines, &key)?;
                    aggregator.record_duplicate_in_store(key, line);
                }

                info!(kind = %kind, requested, committed, mode = %mode, "批量提交完成");
                if committed > 0 {
                    if let Some(cache) = self.cache {
                        cache.evict_all(kind).await;
                    }
                }
                Ok(committed)
            }
            Err(e) if e.is_unique_violation() => {
                warn!(kind = %kind, requested, error = %e, "整批提交因唯一约束冲突被拒绝");
                let message = format!("{}: {}", COMMIT_REJECTED, e);
                let mut rows: Vec<_> = lines.into_values().collect();
                rows.sort_unstable();
                for line in rows {
                    aggregator.record_error(line, message.clone());
                }
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 存储返回的键必须是本次提交的键
    fn line_of(lines: &HashMap<String, usize>, key: &str) -> ImporterResult<usize> {
        lines.get(key).copied().ok_or_else(|| {
            error!(key, "存储返回了未提交的自然键");
            ImportError::InternalError(format!("存储返回了未提交的自然键: {}", key))
        })
    }
}
