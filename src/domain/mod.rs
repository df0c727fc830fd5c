// ==========================================
// 批量导入系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、导入结果
// 红线: 不含数据访问逻辑,不含导入管道逻辑
// ==========================================

pub mod entity;
pub mod import;
pub mod types;

// 重导出核心类型
pub use entity::{Entity, EntityCandidate, ParentKeyRef};
pub use import::{ImportBatch, ImportResult, RowError, ValidationOutcome};
pub use types::{AttributeValue, CommitMode, EntityKind};
