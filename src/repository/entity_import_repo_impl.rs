// ==========================================
// 批量导入系统 - 实体导入 Repository 实现
// ==========================================
// 职责: 实现导入相关数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::domain::{CommitMode, Entity, EntityKind, ImportBatch};
use crate::repository::entity_import_repo::{EntityImportRepository, SaveOutcome};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Transaction, TransactionBehavior,
};
use std::sync::{Arc, Mutex, MutexGuard};

/// IN (...) 查询单次最大参数数（低于 SQLite 默认上限 999）
const EXISTS_QUERY_CHUNK: usize = 500;

const ENTITY_COLUMNS: &str = "kind, natural_key, entity_id, attributes_json, parent_keys_json, import_batch_id, created_at";

// ==========================================
// EntityRow - entity_record 原始行
// ==========================================
struct EntityRow {
    kind: String,
    natural_key: String,
    entity_id: String,
    attributes_json: String,
    parent_keys_json: String,
    import_batch_id: Option<String>,
    created_at: String,
}

impl EntityRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            kind: row.get(0)?,
            natural_key: row.get(1)?,
            entity_id: row.get(2)?,
            attributes_json: row.get(3)?,
            parent_keys_json: row.get(4)?,
            import_batch_id: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_entity(self) -> RepositoryResult<Entity> {
        let kind: EntityKind = self.kind.parse().map_err(|e: String| {
            RepositoryError::FieldValueError {
                field: "kind".to_string(),
                message: e,
            }
        })?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| RepositoryError::FieldValueError {
                field: "created_at".to_string(),
                message: e.to_string(),
            })?;

        Ok(Entity {
            entity_id: self.entity_id,
            kind,
            natural_key: self.natural_key,
            attributes: serde_json::from_str(&self.attributes_json)?,
            parent_keys: serde_json::from_str(&self.parent_keys_json)?,
            import_batch_id: self.import_batch_id,
            created_at,
        })
    }
}

// ==========================================
// EntityImportRepositoryImpl
// ==========================================
pub struct EntityImportRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl EntityImportRepositoryImpl {
    /// 创建新的 Repository 实例（并确保表结构存在）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 Repository
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA 与建表（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            init_schema(&guard)?;
        }

        Ok(Self { conn })
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在事务中逐行写入
    ///
    /// - AllOrNothing: 普通 INSERT，首个冲突即返回错误（调用方回滚）
    /// - Partial: INSERT OR IGNORE，未生效的行记为 rejected
    fn save_all_tx(
        tx: &Transaction,
        entities: Vec<Entity>,
        mode: CommitMode,
    ) -> RepositoryResult<SaveOutcome> {
        let verb = match mode {
            CommitMode::AllOrNothing => "INSERT",
            CommitMode::Partial => "INSERT OR IGNORE",
        };
        let sql = format!(
            "{} INTO entity_record ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            verb, ENTITY_COLUMNS
        );
        let mut stmt = tx.prepare(&sql)?;

        let mut outcome = SaveOutcome::default();
        for entity in entities {
            let changed = stmt.execute(params![
                entity.kind.as_str(),
                entity.natural_key,
                entity.entity_id,
                serde_json::to_string(&entity.attributes)?,
                serde_json::to_string(&entity.parent_keys)?,
                entity.import_batch_id,
                entity.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ])?;

            if changed == 0 {
                outcome.rejected.push(entity.natural_key);
            } else {
                outcome.committed.push(entity);
            }
        }

        Ok(outcome)
    }
}

#[async_trait]
impl EntityImportRepository for EntityImportRepositoryImpl {
    async fn exists_by_key(&self, kind: EntityKind, key: &str) -> RepositoryResult<bool> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM entity_record WHERE kind = ?1 AND natural_key = ?2 LIMIT 1",
                params![kind.as_str(), key],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }

    async fn batch_check_exists(
        &self,
        kind: EntityKind,
        keys: Vec<String>,
    ) -> RepositoryResult<Vec<String>> {
        let conn = self.lock()?;
        let mut existing = Vec::new();

        for chunk in keys.chunks(EXISTS_QUERY_CHUNK) {
            let placeholders = (0..chunk.len())
                .map(|i| format!("?{}", i + 2))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT natural_key FROM entity_record WHERE kind = ?1 AND natural_key IN ({})",
                placeholders
            );
            let mut stmt = conn.prepare(&sql)?;

            let kind_param = kind.as_str().to_string();
            let params = std::iter::once(&kind_param).chain(chunk.iter());
            let rows = stmt.query_map(params_from_iter(params), |row| row.get::<_, String>(0))?;
            for row in rows {
                existing.push(row?);
            }
        }

        Ok(existing)
    }

    async fn find_by_key(&self, kind: EntityKind, key: &str) -> RepositoryResult<Option<Entity>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM entity_record WHERE kind = ?1 AND natural_key = ?2",
            ENTITY_COLUMNS
        );
        let row = conn
            .query_row(&sql, params![kind.as_str(), key], EntityRow::from_row)
            .optional()?;

        row.map(EntityRow::into_entity).transpose()
    }

    async fn list_by_kind(&self, kind: EntityKind) -> RepositoryResult<Vec<Entity>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM entity_record WHERE kind = ?1 ORDER BY natural_key",
            ENTITY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![kind.as_str()], EntityRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(EntityRow::into_entity).collect()
    }

    async fn count_by_kind(&self, kind: EntityKind) -> RepositoryResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entity_record WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    async fn save_all(
        &self,
        kind: EntityKind,
        entities: Vec<Entity>,
        mode: CommitMode,
    ) -> RepositoryResult<SaveOutcome> {
        if let Some(foreign) = entities.iter().find(|e| e.kind != kind) {
            return Err(RepositoryError::FieldValueError {
                field: "kind".to_string(),
                message: format!("实体 {} 的类型 {} 与批次类型 {} 不一致", foreign.natural_key, foreign.kind, kind),
            });
        }

        let mut conn = self.lock()?;
        // IMMEDIATE: 开始即取写锁，多连接并发提交时按 busy_timeout 排队
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // 出错时 tx 被 drop，自动回滚
        let outcome = Self::save_all_tx(&tx, entities, mode)?;

        tx.commit()?;
        Ok(outcome)
    }

    async fn insert_batch(&self, batch: ImportBatch) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO import_batch (
                batch_id, entity_kind, source_name, total_rows, success_rows,
                duplicate_in_csv_rows, duplicate_in_database_rows, error_rows,
                imported_at, elapsed_ms, result_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                batch.batch_id,
                batch.entity_kind.as_str(),
                batch.source_name,
                batch.total_rows,
                batch.success_rows,
                batch.duplicate_in_csv_rows,
                batch.duplicate_in_database_rows,
                batch.error_rows,
                batch.imported_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                batch.elapsed_ms,
                batch.result_json,
            ],
        )?;
        Ok(())
    }

    async fn get_recent_batches(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT batch_id, entity_kind, source_name, total_rows, success_rows,
                   duplicate_in_csv_rows, duplicate_in_database_rows, error_rows,
                   imported_at, elapsed_ms, result_json
            FROM import_batch
            ORDER BY imported_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    [
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, i64>(6)?,
                        row.get::<_, i64>(7)?,
                    ],
                    row.get::<_, String>(8)?,
                    row.get::<_, i64>(9)?,
                    row.get::<_, Option<String>>(10)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut batches = Vec::with_capacity(rows.len());
        for (batch_id, kind, source_name, counts, imported_at, elapsed_ms, result_json) in rows {
            let entity_kind = kind.parse().map_err(|e: String| RepositoryError::FieldValueError {
                field: "entity_kind".to_string(),
                message: e,
            })?;
            let imported_at = DateTime::parse_from_rfc3339(&imported_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| RepositoryError::FieldValueError {
                    field: "imported_at".to_string(),
                    message: e.to_string(),
                })?;

            batches.push(ImportBatch {
                batch_id,
                entity_kind,
                source_name,
                total_rows: counts[0],
                success_rows: counts[1],
                duplicate_in_csv_rows: counts[2],
                duplicate_in_database_rows: counts[3],
                error_rows: counts[4],
                imported_at,
                elapsed_ms,
                result_json,
            });
        }

        Ok(batches)
    }
}
