// ==========================================
// 批量导入系统 - 实体导入 Trait
// ==========================================
// 职责: 定义实体导入接口（不包含实现）
// ==========================================

use crate::domain::{EntityCandidate, EntityKind, ImportResult, ValidationOutcome};
use crate::importer::error::ImporterResult;
use crate::importer::schema::EntitySchema;
use async_trait::async_trait;
use std::io::Read;
use std::path::Path;

// ==========================================
// EntityImporter Trait
// ==========================================
// 用途: 实体导入主接口
// 实现者: EntityImporterImpl
#[async_trait]
pub trait EntityImporter: Send + Sync {
    /// 从字符流导入一批实体
    ///
    /// # 参数
    /// - kind: 实体类型（决定 Schema）
    /// - source: 分隔文本流（首行为表头）
    /// - source_name: 来源名称（仅用于审计）
    ///
    /// # 返回
    /// - Ok(ImportResult): 部分成功结果（行级问题全部在结果内）
    /// - Err: 数据源读取失败、存储不可用（无部分结果）
    ///
    /// # 导入流程
    /// 1. 读取原始行（表头丢弃，列数不足 → malformed）
    /// 2. 字段解析与规范化
    /// 3. 重复判定（批内 / 库内）
    /// 4. 父实体引用校验
    /// 5. 批量提交（唯一约束冲突按 CommitMode 降级）
    /// 6. 结果汇总 + 批次审计
    async fn import_reader<Rd: Read + Send>(
        &self,
        kind: EntityKind,
        source: Rd,
        source_name: Option<String>,
    ) -> ImporterResult<ImportResult>;

    /// 从 CSV 文件导入
    async fn import_from_csv<P: AsRef<Path> + Send>(
        &self,
        kind: EntityKind,
        file_path: P,
    ) -> ImporterResult<ImportResult>;

    /// 导入多个文件
    ///
    /// # 说明
    /// - 每个文件是独立的 BatchJob，按顺序执行
    /// - 某个文件致命失败不影响其他文件
    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        kind: EntityKind,
        file_paths: Vec<P>,
    ) -> Vec<Result<ImportResult, String>>;
}

// ==========================================
// FieldParser Trait
// ==========================================
// 用途: 字段解析接口（阶段 2）
// 实现者: FieldParserImpl
pub trait FieldParser: Send + Sync {
    /// 将原始字段映射为 EntityCandidate
    ///
    /// # 参数
    /// - schema: 实体 Schema（固定列顺序）
    /// - line: 数据行号（1 起，不含表头）
    /// - fields: 原始字段（未 TRIM）
    ///
    /// # 返回
    /// - Ok(EntityCandidate): 解析成功
    /// - Err(ValidationOutcome::Invalid): 必填缺失或类型解析失败
    fn parse_row(
        &self,
        schema: &EntitySchema,
        line: usize,
        fields: &[String],
    ) -> Result<EntityCandidate, ValidationOutcome>;
}
