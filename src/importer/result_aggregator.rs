// ==========================================
// 批量导入系统 - 结果汇总器
// ==========================================
// 职责: 逐阶段累积行级结果，生成最终 ImportResult
// 不变量: successful + duplicate_in_csv + duplicate_in_database + error == total_rows
// 说明: 行级问题只记录不抛出；暂定接受的行在提交后才计入成功
// ==========================================

use crate::domain::{EntityCandidate, EntityKind, ImportResult, RowError, ValidationOutcome};
use std::time::Instant;
use tracing::{error, warn};

#[derive(Debug)]
pub struct ResultAggregator {
    batch_id: String,
    kind: EntityKind,
    started_at: Instant,
    total_rows: usize,
    inserted: Vec<(usize, String)>,
    duplicate_in_csv: Vec<(usize, String)>,
    duplicate_in_database: Vec<(usize, String)>,
    errors: Vec<RowError>,
}

impl ResultAggregator {
    pub fn new(batch_id: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            batch_id: batch_id.into(),
            kind,
            started_at: Instant::now(),
            total_rows: 0,
            inserted: Vec::new(),
            duplicate_in_csv: Vec::new(),
            duplicate_in_database: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// 读取到一条数据行（不含表头）
    pub fn row_read(&mut self) {
        self.total_rows += 1;
    }

    /// 记录判定结果；暂定接受的候选原样交还调用方
    pub fn record(&mut self, outcome: ValidationOutcome) -> Option<EntityCandidate> {
        match outcome {
            ValidationOutcome::Accepted(candidate) => Some(candidate),
            ValidationOutcome::DuplicateInBatch { key, line } => {
                self.duplicate_in_csv.push((line, key));
                None
            }
            ValidationOutcome::DuplicateInStore { key, line } => {
                self.record_duplicate_in_store(key, line);
                None
            }
            ValidationOutcome::Invalid { line, reason } => {
                self.record_error(line, reason);
                None
            }
        }
    }

    pub fn record_inserted(&mut self, key: String, line: usize) {
        self.inserted.push((line, key));
    }

    pub fn record_duplicate_in_store(&mut self, key: String, line: usize) {
        self.duplicate_in_database.push((line, key));
    }

    pub fn record_error(&mut self, line: usize, message: impl Into<String>) {
        self.errors.push(RowError {
            line,
            message: message.into(),
        });
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// 已定论的行数（不含暂定接受）
    pub fn settled_rows(&self) -> usize {
        self.inserted.len() + self.duplicate_in_csv.len() + self.duplicate_in_database.len() + self.errors.len()
    }

    /// 生成最终结果（各列表按行号排序）
    pub fn finish(self) -> ImportResult {
        fn ordered_keys(mut entries: Vec<(usize, String)>) -> Vec<String> {
            entries.sort_by_key(|(line, _)| *line);
            entries.into_iter().map(|(_, key)| key).collect()
        }

        let settled = self.settled_rows();
        if settled != self.total_rows {
            error!(
                batch_id = %self.batch_id,
                total = self.total_rows,
                settled,
                "导入结果计数不平衡"
            );
        }

        let mut errors = self.errors;
        errors.sort_by_key(|e| e.line);

        let successful = self.inserted.len();
        let duplicate_in_csv_count = self.duplicate_in_csv.len();
        let duplicate_in_database_count = self.duplicate_in_database.len();
        let error_count = errors.len();

        if error_count > 0 {
            warn!(batch_id = %self.batch_id, errors = error_count, "存在行级错误");
        }

        ImportResult {
            batch_id: self.batch_id,
            entity_kind: self.kind,
            inserted_ids: ordered_keys(self.inserted),
            duplicate_ids_in_csv: ordered_keys(self.duplicate_in_csv),
            duplicate_ids_in_database: ordered_keys(self.duplicate_in_database),
            errors,
            total_rows: self.total_rows,
            successful_insert_count: successful,
            failed_insert_count: self.total_rows.saturating_sub(successful),
            duplicate_in_csv_count,
            duplicate_in_database_count,
            error_count,
            elapsed_ms: self.started_at.elapsed().as_millis() as u64,
        }
    }
}
