// ==========================================
// 批量导入系统 - 导入API
// ==========================================
// 职责: 封装导入、查询与批次审计相关功能
// 装配: 仓储与配置共享同一 SQLite 连接；导入器挂接实体列表缓存
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::cache::EntityListCache;
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::{Entity, EntityKind, ImportBatch, ImportResult};
use crate::importer::{EntityImporter, EntityImporterImpl, FieldParserImpl};
use crate::repository::{EntityImportRepository, EntityImportRepositoryImpl};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// 导入API
pub struct ImportApi {
    importer: EntityImporterImpl<EntityImportRepositoryImpl, ConfigManager>,
    config: ConfigManager,
    cache: Arc<EntityListCache>,
}

impl ImportApi {
    /// 打开（必要时创建）数据库并装配导入管道
    pub fn open(db_path: &str) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn).map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        info!(db_path, "导入API已初始化");
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接装配
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        let repo = EntityImportRepositoryImpl::from_connection(Arc::clone(&conn))?;
        let importer_config = ConfigManager::from_connection(Arc::clone(&conn))?;
        let config = ConfigManager::from_connection(conn)?;
        let cache = Arc::new(EntityListCache::new());

        let importer = EntityImporterImpl::new(repo, importer_config, Box::new(FieldParserImpl))
            .with_cache(cache.clone());

        Ok(Self {
            importer,
            config,
            cache,
        })
    }

    /// 导入 CSV 文件
    ///
    /// # 返回
    /// - Ok(ImportResult): 行级问题全部在结果内
    /// - Err(ApiError): 文件不存在、数据源读取失败或存储不可用
    pub async fn import_csv_file(&self, kind: EntityKind, file_path: &str) -> ApiResult<ImportResult> {
        if !file_path.to_ascii_lowercase().ends_with(".csv") {
            return Err(ApiError::InvalidInput(format!(
                "当前仅支持 .csv 格式文件导入: {}",
                file_path
            )));
        }

        Ok(self.importer.import_from_csv(kind, Path::new(file_path)).await?)
    }

    /// 从任意字符流导入（嵌入方直接传入内存数据时使用）
    pub async fn import_csv_reader<Rd: Read + Send>(
        &self,
        kind: EntityKind,
        source: Rd,
        source_name: Option<String>,
    ) -> ApiResult<ImportResult> {
        Ok(self.importer.import_reader(kind, source, source_name).await?)
    }

    /// 按顺序导入多个文件，每个文件独立成批
    pub async fn import_csv_files(
        &self,
        kind: EntityKind,
        file_paths: Vec<String>,
    ) -> Vec<Result<ImportResult, String>> {
        self.importer.batch_import(kind, file_paths).await
    }

    /// 某类型全部实体（读穿缓存）
    pub async fn list_entities(&self, kind: EntityKind) -> ApiResult<Arc<Vec<Entity>>> {
        Ok(self
            .cache
            .get_or_load(kind, self.importer.repository())
            .await?)
    }

    /// 按自然键查询单个实体（键按导入时的规则规范化，如 "s1" → "S1"、"007" → "7"）
    pub async fn get_entity(&self, kind: EntityKind, key: &str) -> ApiResult<Entity> {
        let key = self
            .importer
            .schema_for(kind)
            .normalize_key(key)
            .map_err(|e| ApiError::InvalidInput(format!("自然键无效: {}", e)))?;

        self.importer
            .repository()
            .find_by_key(kind, &key)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("{}({})", kind, key)))
    }

    /// 最近的导入批次（审计）
    pub async fn recent_batches(&self, limit: usize) -> ApiResult<Vec<ImportBatch>> {
        if limit == 0 {
            return Err(ApiError::InvalidInput("limit 必须大于 0".to_string()));
        }
        Ok(self.importer.repository().get_recent_batches(limit).await?)
    }

    /// 写入 global 配置（下一次导入生效）
    pub fn set_config(&self, key: &str, value: &str) -> ApiResult<()> {
        Ok(self.config.set_global_config_value(key, value)?)
    }

    pub fn config_snapshot(&self) -> ApiResult<BTreeMap<String, String>> {
        Ok(self.config.get_config_snapshot()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config_keys;
    use crate::domain::AttributeValue;

    fn api() -> ImportApi {
        let conn = Connection::open_in_memory().unwrap();
        ImportApi::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    const STAGES: &str = "stage_code,name,sequence_no,parent_stage_code\nS1,Basics,1,\nS2,Advanced,2,s1\n";

    #[tokio::test]
    async fn test_import_then_query() {
        let api = api();
        let result = api
            .import_csv_reader(EntityKind::CurriculumStage, STAGES.as_bytes(), None)
            .await
            .unwrap();
        // S2 的父阶段 S1 在同一批次内，导入前尚未落库
        assert_eq!(result.inserted_ids, vec!["S1".to_string()]);
        assert_eq!(result.error_count, 1);
        assert!(result.errors[0].message.starts_with("parent not found"));

        let stage = api.get_entity(EntityKind::CurriculumStage, "S1").await.unwrap();
        assert_eq!(stage.attribute("name"), Some(&AttributeValue::Text("Basics".to_string())));

        let err = api.get_entity(EntityKind::CurriculumStage, "S2").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        // 查询键与导入键同样规范化
        let stage = api.get_entity(EntityKind::CurriculumStage, " s1 ").await.unwrap();
        assert_eq!(stage.natural_key, "S1");

        let batches = api.recent_batches(10).await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].batch_id, result.batch_id);
    }

    #[tokio::test]
    async fn test_list_entities_is_evicted_after_import() {
        let api = api();
        api.import_csv_reader(EntityKind::CurriculumStage, STAGES.as_bytes(), None)
            .await
            .unwrap();

        let before = api.list_entities(EntityKind::CurriculumStage).await.unwrap();
        assert_eq!(before.len(), 1);
        assert!(api.cache.is_cached(EntityKind::CurriculumStage).await);

        // 第二次导入：S1 已落库，S2 引用通过
        let result = api
            .import_csv_reader(EntityKind::CurriculumStage, STAGES.as_bytes(), None)
            .await
            .unwrap();
        assert_eq!(result.inserted_ids, vec!["S2".to_string()]);
        assert_eq!(result.duplicate_ids_in_database, vec!["S1".to_string()]);
        assert!(!api.cache.is_cached(EntityKind::CurriculumStage).await);

        let after = api.list_entities(EntityKind::CurriculumStage).await.unwrap();
        assert_eq!(after.len(), 2);
    }

    #[tokio::test]
    async fn test_config_is_applied_to_next_import() {
        let api = api();
        api.set_config(config_keys::IMPORT_DELIMITER, ";").unwrap();

        let csv = "item_code;title;category;unit_price\nA-1;\"Pens; blue\";office;2.50\n";
        let result = api
            .import_csv_reader(EntityKind::CatalogItem, csv.as_bytes(), None)
            .await
            .unwrap();
        assert_eq!(result.successful_insert_count, 1);

        let item = api.get_entity(EntityKind::CatalogItem, "A-1").await.unwrap();
        assert_eq!(item.attribute("title"), Some(&AttributeValue::Text("Pens; blue".to_string())));
        assert_eq!(api.config_snapshot().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_invalid_input() {
        let api = api();
        let err = api.import_csv_file(EntityKind::Learner, "learners.xlsx").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let err = api.import_csv_file(EntityKind::Learner, "/no/such/file.csv").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        assert!(matches!(api.recent_batches(0).await, Err(ApiError::InvalidInput(_))));
        assert!(matches!(
            api.get_entity(EntityKind::Learner, "not-a-number").await,
            Err(ApiError::InvalidInput(_))
        ));
    }
}
