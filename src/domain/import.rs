// ==========================================
// 批量导入系统 - 导入结果领域模型
// ==========================================
// 职责: 行级判定结果、导入结果、导入批次审计记录
// ==========================================

use crate::domain::entity::EntityCandidate;
use crate::domain::types::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ValidationOutcome - 行级判定
// ==========================================
// 同一自然键在一个批次内只落入一个桶
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Accepted(EntityCandidate),
    DuplicateInBatch { key: String, line: usize },
    DuplicateInStore { key: String, line: usize },
    Invalid { line: usize, reason: String },
}

impl ValidationOutcome {
    pub fn line(&self) -> usize {
        match self {
            ValidationOutcome::Accepted(candidate) => candidate.line,
            ValidationOutcome::DuplicateInBatch { line, .. }
            | ValidationOutcome::DuplicateInStore { line, .. }
            | ValidationOutcome::Invalid { line, .. } => *line,
        }
    }

    pub fn invalid(line: usize, reason: impl Into<String>) -> Self {
        ValidationOutcome::Invalid {
            line,
            reason: reason.into(),
        }
    }
}

// ==========================================
// RowError - 行级错误
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub line: usize,     // 数据行号（1 起，不含表头）
    pub message: String, // 错误原因
}

// ==========================================
// ImportResult - 导入结果
// ==========================================
// 用途: 导入接口返回值，唯一跨越调用边界的产物
// 不变量: successful + duplicate_in_csv + duplicate_in_database + error == total_rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub batch_id: String,
    pub entity_kind: EntityKind,
    pub inserted_ids: Vec<String>,
    pub duplicate_ids_in_csv: Vec<String>,
    pub duplicate_ids_in_database: Vec<String>,
    pub errors: Vec<RowError>,
    pub total_rows: usize,
    pub successful_insert_count: usize,
    pub failed_insert_count: usize,
    pub duplicate_in_csv_count: usize,
    pub duplicate_in_database_count: usize,
    pub error_count: usize,
    pub elapsed_ms: u64,
}

impl ImportResult {
    /// 四个计数之和是否等于数据行数
    pub fn is_balanced(&self) -> bool {
        self.successful_insert_count
            + self.duplicate_in_csv_count
            + self.duplicate_in_database_count
            + self.error_count
            == self.total_rows
    }
}

// ==========================================
// ImportBatch - 导入批次审计
// ==========================================
// 对齐: import_batch 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,                   // 批次 ID（UUID）
    pub entity_kind: EntityKind,            // 导入实体类型
    pub source_name: Option<String>,        // 来源名称（文件名）
    pub total_rows: i64,                    // 数据行数
    pub success_rows: i64,                  // 成功写入
    pub duplicate_in_csv_rows: i64,         // 批内重复
    pub duplicate_in_database_rows: i64,    // 库内重复
    pub error_rows: i64,                    // 错误行
    pub imported_at: DateTime<Utc>,         // 导入完成时间
    pub elapsed_ms: i64,                    // 导入耗时（毫秒）
    pub result_json: Option<String>,        // ImportResult JSON
}

impl ImportBatch {
    pub fn from_result(result: &ImportResult, source_name: Option<String>) -> Self {
        Self {
            batch_id: result.batch_id.clone(),
            entity_kind: result.entity_kind,
            source_name,
            total_rows: result.total_rows as i64,
            success_rows: result.successful_insert_count as i64,
            duplicate_in_csv_rows: result.duplicate_in_csv_count as i64,
            duplicate_in_database_rows: result.duplicate_in_database_count as i64,
            error_rows: result.error_count as i64,
            imported_at: Utc::now(),
            elapsed_ms: result.elapsed_ms as i64,
            result_json: serde_json::to_string(result).ok(),
        }
    }
}
