// ==========================================
// 批量导入系统 - 实体导入 Repository Trait
// ==========================================
// 职责: 定义导入相关数据访问接口（不包含实现）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 约束: 自然键唯一性由存储负责，是提交时的最终校验
// ==========================================

use crate::domain::{CommitMode, Entity, EntityKind, ImportBatch};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// SaveOutcome - 批量写入结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct SaveOutcome {
    /// 已写入的实体（保持输入顺序）
    pub committed: Vec<Entity>,
    /// 被存储拒绝的自然键（仅 Partial 模式）
    pub rejected: Vec<String>,
}

// ==========================================
// EntityImportRepository Trait
// ==========================================
// 用途: 实体导入相关数据访问
// 实现者: EntityImportRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait EntityImportRepository: Send + Sync {
    // ===== 查询与校验 =====

    /// 检查自然键是否已存在
    async fn exists_by_key(&self, kind: EntityKind, key: &str) -> RepositoryResult<bool>;

    /// 批量检查自然键是否存在
    ///
    /// # 返回
    /// - Ok(Vec<String>): 已存在的自然键列表
    async fn batch_check_exists(
        &self,
        kind: EntityKind,
        keys: Vec<String>,
    ) -> RepositoryResult<Vec<String>>;

    /// 按自然键查询实体
    async fn find_by_key(&self, kind: EntityKind, key: &str) -> RepositoryResult<Option<Entity>>;

    /// 查询某类型全部实体（按自然键排序）
    async fn list_by_kind(&self, kind: EntityKind) -> RepositoryResult<Vec<Entity>>;

    /// 统计某类型实体数量
    async fn count_by_kind(&self, kind: EntityKind) -> RepositoryResult<usize>;

    // ===== 批量写入（事务化）=====

    /// 批量写入实体
    ///
    /// # 参数
    /// - kind: 实体类型
    /// - entities: 待写入实体
    /// - mode: 冲突降级模式
    ///
    /// # 返回
    /// - Ok(SaveOutcome): Partial 模式下冲突行进入 rejected
    /// - Err(UniqueConstraintViolation): AllOrNothing 模式下任一冲突，整个事务回滚
    /// - Err(其他): 存储不可用（整个事务回滚）
    async fn save_all(
        &self,
        kind: EntityKind,
        entities: Vec<Entity>,
        mode: CommitMode,
    ) -> RepositoryResult<SaveOutcome>;

    // ===== 批次管理 =====

    /// 插入导入批次记录
    async fn insert_batch(&self, batch: ImportBatch) -> RepositoryResult<()>;

    /// 查询最近的导入批次
    async fn get_recent_batches(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>>;
}
