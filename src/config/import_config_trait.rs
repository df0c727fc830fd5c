// ==========================================
// 批量导入系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入管道所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::CommitMode;
use crate::importer::error::ImporterResult;
use crate::importer::record_reader::ReaderOptions;
use async_trait::async_trait;

/// 默认预取窗口（行数）
pub const DEFAULT_PREFETCH_CHUNK_SIZE: usize = 500;

// ==========================================
// ImportConfig - 单次导入的配置快照
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportConfig {
    pub reader: ReaderOptions,
    pub commit_mode: CommitMode,
    /// 0 表示关闭预取，逐键查询存储
    pub prefetch_chunk_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            reader: ReaderOptions::default(),
            commit_mode: CommitMode::default(),
            prefetch_chunk_size: DEFAULT_PREFETCH_CHUNK_SIZE,
        }
    }
}

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 列分隔符
    ///
    /// # 默认值
    /// - ','
    async fn get_delimiter(&self) -> ImporterResult<u8>;

    /// 引号字符
    ///
    /// # 默认值
    /// - '"'
    async fn get_quote(&self) -> ImporterResult<u8>;

    /// 提交冲突降级模式
    ///
    /// # 默认值
    /// - PARTIAL
    async fn get_commit_mode(&self) -> ImporterResult<CommitMode>;

    /// 存在性预取窗口大小
    ///
    /// # 默认值
    /// - 500
    async fn get_prefetch_chunk_size(&self) -> ImporterResult<usize>;

    /// 读取完整配置快照（每次导入开始时调用一次）
    async fn load_import_config(&self) -> ImporterResult<ImportConfig> {
        Ok(ImportConfig {
            reader: ReaderOptions {
                delimiter: self.get_delimiter().await?,
                quote: self.get_quote().await?,
            },
            commit_mode: self.get_commit_mode().await?,
            prefetch_chunk_size: self.get_prefetch_chunk_size().await?,
        })
    }
}

// ==========================================
// StaticImportConfig - 固定配置
// ==========================================
// 用途: 不依赖数据库的调用方（命令行覆盖、测试）
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticImportConfig(pub ImportConfig);

#[async_trait]
impl ImportConfigReader for StaticImportConfig {
    async fn get_delimiter(&self) -> ImporterResult<u8> {
        Ok(self.0.reader.delimiter)
    }

    async fn get_quote(&self) -> ImporterResult<u8> {
        Ok(self.0.reader.quote)
    }

    async fn get_commit_mode(&self) -> ImporterResult<CommitMode> {
        Ok(self.0.commit_mode)
    }

    async fn get_prefetch_chunk_size(&self) -> ImporterResult<usize> {
        Ok(self.0.prefetch_chunk_size)
    }
}
