// ==========================================
// 批量导入系统 - 核心库
// ==========================================
// 职责: 分隔文本批量导入，逐行判定写入/重复/错误，部分成功
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 实体列表缓存
pub mod cache;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    AttributeValue, CommitMode, Entity, EntityCandidate, EntityKind, ImportBatch, ImportResult,
    RowError, ValidationOutcome,
};

// 导入器
pub use importer::{EntityImporter, EntityImporterImpl, FieldParserImpl, ImportError};

// 仓储
pub use repository::{EntityImportRepository, EntityImportRepositoryImpl, RepositoryError};

// 配置
pub use config::{ConfigManager, ImportConfig, ImportConfigReader};

// 缓存
pub use cache::{EntityCache, EntityListCache};

// API
pub use api::{ApiError, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "catalog-import";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, env!("CARGO_PKG_NAME"));
    }
}
