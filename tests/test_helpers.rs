// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 内存仓储、配置与 CSV 构造，供集成测试共享
// ==========================================

#![allow(dead_code)]

use async_trait::async_trait;
use catalog_import::config::{ImportConfig, StaticImportConfig};
use catalog_import::domain::{CommitMode, Entity, EntityKind, ImportBatch};
use catalog_import::importer::{EntityImporterImpl, FieldParserImpl};
use catalog_import::repository::{
    EntityImportRepository, RepositoryError, RepositoryResult, SaveOutcome,
};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tokio::sync::Notify;

// ==========================================
// InMemoryEntityRepository - 内存仓储
// ==========================================
// 自然键唯一性在 save_all 中强制，与 SQLite 实现语义一致
#[derive(Default)]
pub struct InMemoryEntityRepository {
    records: Mutex<BTreeMap<(EntityKind, String), Entity>>,
    batches: Mutex<Vec<ImportBatch>>,
    // 在 save_all 开始时写入的键（模拟并发导入抢先提交）
    concurrent_inserts: Mutex<Vec<(EntityKind, String)>>,
    fail_on_save: AtomicBool,
    fail_on_batch_insert: AtomicBool,
    save_calls: AtomicUsize,
    single_lookups: AtomicUsize,
    batch_lookups: AtomicUsize,
    // save_all 额外回报的、并未提交的拒绝键
    phantom_rejections: Mutex<Vec<String>>,
    // list_by_kind 取完快照后暂停，等待 release_list
    pause_list: AtomicBool,
    list_entered: Notify,
    list_release: Notify,
}

impl InMemoryEntityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一条已存在的实体
    pub fn seed(&self, kind: EntityKind, key: &str) {
        self.records
            .lock()
            .unwrap()
            .insert((kind, key.to_string()), entity(kind, key));
    }

    pub fn insert_concurrently_on_save(&self, kind: EntityKind, key: &str) {
        self.concurrent_inserts
            .lock()
            .unwrap()
            .push((kind, key.to_string()));
    }

    pub fn fail_on_save(&self) {
        self.fail_on_save.store(true, Ordering::SeqCst);
    }

    pub fn fail_on_batch_insert(&self) {
        self.fail_on_batch_insert.store(true, Ordering::SeqCst);
    }

    pub fn report_unsubmitted_rejection(&self, key: &str) {
        self.phantom_rejections.lock().unwrap().push(key.to_string());
    }

    pub fn pause_next_list(&self) {
        self.pause_list.store(true, Ordering::SeqCst);
    }

    /// 等待 list_by_kind 取完快照并进入暂停
    pub async fn list_paused(&self) {
        self.list_entered.notified().await;
    }

    pub fn release_list(&self) {
        self.list_release.notify_one();
    }

    pub fn keys(&self, kind: EntityKind) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, key)| key.clone())
            .collect()
    }

    pub fn batches(&self) -> Vec<ImportBatch> {
        self.batches.lock().unwrap().clone()
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn single_lookups(&self) -> usize {
        self.single_lookups.load(Ordering::SeqCst)
    }

    pub fn batch_lookups(&self) -> usize {
        self.batch_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityImportRepository for InMemoryEntityRepository {
    async fn exists_by_key(&self, kind: EntityKind, key: &str) -> RepositoryResult<bool> {
        self.single_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .records
            .lock()
            .unwrap()
            .contains_key(&(kind, key.to_string())))
    }

    async fn batch_check_exists(
        &self,
        kind: EntityKind,
        keys: Vec<String>,
    ) -> RepositoryResult<Vec<String>> {
        self.batch_lookups.fetch_add(1, Ordering::SeqCst);
        let records = self.records.lock().unwrap();
        Ok(keys
            .into_iter()
            .filter(|k| records.contains_key(&(kind, k.clone())))
            .collect())
    }

    async fn find_by_key(&self, kind: EntityKind, key: &str) -> RepositoryResult<Option<Entity>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(kind, key.to_string()))
            .cloned())
    }

    async fn list_by_kind(&self, kind: EntityKind) -> RepositoryResult<Vec<Entity>> {
        let snapshot: Vec<Entity> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, e)| e.clone())
            .collect();

        if self.pause_list.swap(false, Ordering::SeqCst) {
            self.list_entered.notify_one();
            self.list_release.notified().await;
        }
        Ok(snapshot)
    }

    async fn count_by_kind(&self, kind: EntityKind) -> RepositoryResult<usize> {
        Ok(self.keys(kind).len())
    }

    async fn save_all(
        &self,
        kind: EntityKind,
        entities: Vec<Entity>,
        mode: CommitMode,
    ) -> RepositoryResult<SaveOutcome> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);

        for (k, key) in self.concurrent_inserts.lock().unwrap().drain(..) {
            self.seed(k, &key);
        }

        if self.fail_on_save.load(Ordering::SeqCst) {
            return Err(RepositoryError::DatabaseConnectionError(
                "store unavailable".to_string(),
            ));
        }

        let mut records = self.records.lock().unwrap();
        let mut outcome = SaveOutcome::default();
        let mut staged = Vec::new();
        let mut staged_keys = HashSet::new();

        for entity in entities {
            let key = (kind, entity.natural_key.clone());
            if records.contains_key(&key) || !staged_keys.insert(key.clone()) {
                match mode {
                    CommitMode::AllOrNothing => {
                        return Err(RepositoryError::UniqueConstraintViolation(format!(
                            "{}.{}",
                            kind, entity.natural_key
                        )));
                    }
                    CommitMode::Partial => {
                        outcome.rejected.push(entity.natural_key);
                        continue;
                    }
                }
            }
            staged.push((key, entity));
        }

        for (key, entity) in staged {
            outcome.committed.push(entity.clone());
            records.insert(key, entity);
        }
        outcome
            .rejected
            .extend(self.phantom_rejections.lock().unwrap().drain(..));
        Ok(outcome)
    }

    async fn insert_batch(&self, batch: ImportBatch) -> RepositoryResult<()> {
        if self.fail_on_batch_insert.load(Ordering::SeqCst) {
            return Err(RepositoryError::DatabaseQueryError("audit table locked".to_string()));
        }
        self.batches.lock().unwrap().push(batch);
        Ok(())
    }

    async fn get_recent_batches(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>> {
        Ok(self
            .batches
            .lock()
            .unwrap()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

/// 构造一条最小实体
pub fn entity(kind: EntityKind, key: &str) -> Entity {
    Entity {
        entity_id: format!("seed-{}-{}", kind, key),
        kind,
        natural_key: key.to_string(),
        attributes: BTreeMap::new(),
        parent_keys: BTreeMap::new(),
        import_batch_id: None,
        created_at: Utc::now(),
    }
}

// ==========================================
// 导入器装配
// ==========================================

pub type TestImporter = EntityImporterImpl<InMemoryEntityRepository, StaticImportConfig>;

pub fn importer_with(repo: InMemoryEntityRepository, config: ImportConfig) -> TestImporter {
    EntityImporterImpl::new(repo, StaticImportConfig(config), Box::new(FieldParserImpl))
}

pub fn importer(repo: InMemoryEntityRepository) -> TestImporter {
    importer_with(repo, ImportConfig::default())
}

// ==========================================
// CSV 构造
// ==========================================

pub const LEARNER_HEADER: &str = "learner_id,full_name,email,stage_code,enrolled_on";

/// 表头 + 数据行拼接为 CSV 文本
pub fn csv(header: &str, rows: &[&str]) -> String {
    let mut text = String::from(header);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text
}

/// 写入临时 CSV 文件（文件名以 .csv 结尾）
pub fn write_csv_file(content: &str) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// 临时数据库文件
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_string_lossy().to_string();
    Ok((temp_file, db_path))
}
