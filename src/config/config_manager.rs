// ==========================================
// 批量导入系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::{ImportConfigReader, DEFAULT_PREFETCH_CHUNK_SIZE};
use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::domain::CommitMode;
use crate::importer::error::{ImportError, ImporterResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ImporterResult<Self> {
        let conn = open_sqlite_connection(db_path).map_err(Self::db_error)?;
        init_schema(&conn).map_err(Self::db_error)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ImporterResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;
            configure_sqlite_connection(&guard).map_err(Self::db_error)?;
            init_schema(&guard).map_err(Self::db_error)?;
        }

        Ok(Self { conn })
    }

    fn db_error(err: rusqlite::Error) -> ImportError {
        ImportError::Repository(err.into())
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> ImporterResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;

        conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| ImportError::ConfigReadError {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ImporterResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 配置（覆盖已有值）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ImporterResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![GLOBAL_SCOPE, key, value],
        )
        .map_err(Self::db_error)?;
        Ok(())
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> ImporterResult<BTreeMap<String, String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;

        let mut stmt = conn
            .prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")
            .map_err(Self::db_error)?;
        let rows = stmt
            .query_map(params![GLOBAL_SCOPE], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(Self::db_error)?
            .collect::<rusqlite::Result<BTreeMap<_, _>>>()
            .map_err(Self::db_error)?;

        Ok(rows)
    }

    /// 单字节字符配置（分隔符/引号），支持 "\t" 写法
    fn get_byte_config(&self, key: &str, default: u8) -> ImporterResult<u8> {
        let value = self.get_config_or_default(key, &(default as char).to_string())?;
        match value.as_str() {
            "\\t" | "\t" => Ok(b'\t'),
            v if v.len() == 1 && v.is_ascii() => Ok(v.as_bytes()[0]),
            v => {
                warn!(key, value = v, "配置值不是单个 ASCII 字符，使用默认值");
                Ok(default)
            }
        }
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_delimiter(&self) -> ImporterResult<u8> {
        self.get_byte_config(config_keys::IMPORT_DELIMITER, b',')
    }

    async fn get_quote(&self) -> ImporterResult<u8> {
        self.get_byte_config(config_keys::IMPORT_QUOTE, b'"')
    }

    async fn get_commit_mode(&self) -> ImporterResult<CommitMode> {
        let value = self.get_config_or_default(config_keys::IMPORT_COMMIT_MODE, "PARTIAL")?;
        match value.parse::<CommitMode>() {
            Ok(mode) => Ok(mode),
            Err(e) => {
                warn!(value = %value, error = %e, "提交模式配置无效，使用默认 PARTIAL");
                Ok(CommitMode::Partial)
            }
        }
    }

    async fn get_prefetch_chunk_size(&self) -> ImporterResult<usize> {
        let default = DEFAULT_PREFETCH_CHUNK_SIZE.to_string();
        let value = self.get_config_or_default(config_keys::IMPORT_PREFETCH_CHUNK_SIZE, &default)?;
        Ok(value.trim().parse::<usize>().unwrap_or(DEFAULT_PREFETCH_CHUNK_SIZE))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const IMPORT_DELIMITER: &str = "import.delimiter";
    pub const IMPORT_QUOTE: &str = "import.quote";
    pub const IMPORT_COMMIT_MODE: &str = "import.commit_mode";
    pub const IMPORT_PREFETCH_CHUNK_SIZE: &str = "import.prefetch_chunk_size";
}
