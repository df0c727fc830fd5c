// ==========================================
// 批量导入系统 - 实体导入器实现
// ==========================================
// 职责: 整合导入流程，从字符流到数据库
// 流程: 读取 → 解析 → 重复判定 → 引用校验 → 提交 → 汇总
// 并发: 单次导入单线程逐行执行（批内先到先得依赖严格顺序）；
//       并发导入之间的一致性由存储唯一约束在提交时保证
// ==========================================

use crate::cache::EntityCache;
use crate::config::ImportConfigReader;
use crate::domain::{EntityCandidate, EntityKind, ImportBatch, ImportResult, ValidationOutcome};
use crate::importer::batch_committer::BatchCommitter;
use crate::importer::duplicate_classifier::DuplicateClassifier;
use crate::importer::entity_importer_trait::{EntityImporter, FieldParser};
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::existing_key_set::ExistingKeySet;
use crate::importer::record_reader::{RawRow, RecordReader};
use crate::importer::reference_validator::ReferenceValidator;
use crate::importer::result_aggregator::ResultAggregator;
use crate::importer::schema::EntitySchema;
use crate::repository::EntityImportRepository;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// EntityImporterImpl - 实体导入器实现
// ==========================================
pub struct EntityImporterImpl<R, C>
where
    R: EntityImportRepository,
    C: ImportConfigReader,
{
    // 数据访问层
    import_repo: R,

    // 配置读取器
    config: C,

    // 导入组件
    field_parser: Box<dyn FieldParser>,

    // 实体列表缓存（提交后整类驱逐）
    cache: Option<Arc<dyn EntityCache>>,

    // Schema 覆盖（未覆盖的类型使用内置 Schema）
    schemas: HashMap<EntityKind, EntitySchema>,
}

impl<R, C> EntityImporterImpl<R, C>
where
    R: EntityImportRepository,
    C: ImportConfigReader,
{
    /// 创建新的 EntityImporter 实例
    ///
    /// # 参数
    /// - import_repo: 导入数据仓储
    /// - config: 配置读取器
    /// - field_parser: 字段解析器
    pub fn new(import_repo: R, config: C, field_parser: Box<dyn FieldParser>) -> Self {
        Self {
            import_repo,
            config,
            field_parser,
            cache: None,
            schemas: HashMap::new(),
        }
    }

    /// 挂接实体列表缓存
    pub fn with_cache(mut self, cache: Arc<dyn EntityCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 覆盖某类型的 Schema（先做自洽性校验）
    pub fn with_schema(mut self, schema: EntitySchema) -> ImporterResult<Self> {
        schema.validate()?;
        self.schemas.insert(schema.kind, schema);
        Ok(self)
    }

    pub fn repository(&self) -> &R {
        &self.import_repo
    }

    /// 生效的 Schema（覆盖优先，否则内置）
    pub fn schema_for(&self, kind: EntityKind) -> EntitySchema {
        self.schemas
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| EntitySchema::for_kind(kind))
    }
}

#[async_trait::async_trait]
impl<R, C> EntityImporter for EntityImporterImpl<R, C>
where
    R: EntityImportRepository + Send + Sync,
    C: ImportConfigReader + Send + Sync,
{
    #[instrument(skip(self, kind, source), fields(kind = %kind, batch_id = tracing::field::Empty))]
    async fn import_reader<Rd: Read + Send>(
        &self,
        kind: EntityKind,
        source: Rd,
        source_name: Option<String>,
    ) -> ImporterResult<ImportResult> {
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());
        info!(batch_id = %batch_id, source = ?source_name, "开始导入");

        let config = self.config.load_import_config().await?;
        let schema = self.schema_for(kind);
        let window = config.prefetch_chunk_size.max(1);
        debug!(?config, min_columns = schema.min_columns(), "导入配置已加载");

        let mut aggregator = ResultAggregator::new(batch_id.clone(), kind);
        let mut existing = ExistingKeySet::new(&self.import_repo);
        let mut classifier = DuplicateClassifier::new();
        let validator = ReferenceValidator;
        let mut accepted: Vec<EntityCandidate> = Vec::new();
        let mut rows = RecordReader::new(source, schema.min_columns(), config.reader);

        loop {
            // === 步骤 1-2: 读取并解析一个窗口 ===
            let mut taken = 0;
            let mut parsed = Vec::with_capacity(window);
            for row in rows.by_ref().take(window) {
                taken += 1;
                let row = row.map_err(|e| {
                    error!(error = %e, "数据源读取失败，导入中止");
                    e
                })?;
                aggregator.row_read();

                match row {
                    RawRow::Malformed { line, reason } => {
                        warn!(line, reason = %reason, "行格式错误");
                        aggregator.record(ValidationOutcome::invalid(line, reason));
                    }
                    RawRow::Fields { line, fields } => {
                        match self.field_parser.parse_row(&schema, line, &fields) {
                            Ok(candidate) => parsed.push(candidate),
                            Err(outcome) => {
                                aggregator.record(outcome);
                            }
                        }
                    }
                }
            }

            // === 预取: 本窗口的自然键与父引用键 ===
            if config.prefetch_chunk_size > 0 && !parsed.is_empty() {
                existing
                    .prefetch(kind, parsed.iter().map(|c| c.natural_key.clone()))
                    .await?;

                let mut parent_keys: BTreeMap<EntityKind, Vec<String>> = BTreeMap::new();
                for parent in parsed.iter().flat_map(|c| c.parent_refs.iter()) {
                    parent_keys
                        .entry(parent.parent_kind)
                        .or_default()
                        .push(parent.key.clone());
                }
                for (parent_kind, keys) in parent_keys {
                    existing.prefetch(parent_kind, keys).await?;
                }
            }

            // === 步骤 3-4: 重复判定 → 引用校验（严格按行序）===
            for candidate in parsed {
                let outcome = classifier.classify(candidate, &mut existing).await?;
                let Some(candidate) = aggregator.record(outcome) else {
                    continue;
                };

                let outcome = validator.validate(candidate, &mut existing).await?;
                if let Some(candidate) = aggregator.record(outcome) {
                    accepted.push(candidate);
                }
            }

            if taken < window {
                break;
            }
        }

        info!(
            total = aggregator.total_rows(),
            accepted = accepted.len(),
            distinct_keys = classifier.seen_count(),
            store_lookups = existing.store_lookups(),
            "校验完成"
        );

        // === 步骤 5: 批量提交 ===
        let committer = BatchCommitter::new(&self.import_repo, self.cache.as_deref());
        committer
            .commit(kind, &batch_id, accepted, config.commit_mode, &mut aggregator)
            .await
            .map_err(|e| {
                error!(error = %e, "提交失败，导入中止");
                e
            })?;

        // === 步骤 6: 汇总 + 审计 ===
        let result = aggregator.finish();
        let batch = ImportBatch::from_result(&result, source_name);
        if let Err(e) = self.import_repo.insert_batch(batch).await {
            warn!(batch_id = %batch_id, error = %e, "导入批次审计记录写入失败");
        }

        info!(
            batch_id = %batch_id,
            total = result.total_rows,
            success = result.successful_insert_count,
            duplicate_in_csv = result.duplicate_in_csv_count,
            duplicate_in_database = result.duplicate_in_database_count,
            errors = result.error_count,
            elapsed_ms = result.elapsed_ms,
            "导入完成"
        );

        Ok(result)
    }

    async fn import_from_csv<P: AsRef<Path> + Send>(
        &self,
        kind: EntityKind,
        file_path: P,
    ) -> ImporterResult<ImportResult> {
        let path = file_path.as_ref();
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let file = File::open(path)?;
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string());

        self.import_reader(kind, BufReader::new(file), source_name).await
    }

    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        kind: EntityKind,
        file_paths: Vec<P>,
    ) -> Vec<Result<ImportResult, String>> {
        info!(kind = %kind, count = file_paths.len(), "开始批量导入文件");

        let results: Vec<Result<ImportResult, String>> = stream::iter(file_paths)
            .then(|path| async move {
                let path_str = path.as_ref().display().to_string();
                match self.import_from_csv(kind, path).await {
                    Ok(result) => {
                        info!(file = %path_str, success = result.successful_insert_count, "文件导入成功");
                        Ok(result)
                    }
                    Err(e) => {
                        error!(file = %path_str, error = %e, "文件导入失败");
                        Err(format!("文件 {} 导入失败: {}", path_str, e))
                    }
                }
            })
            .collect()
            .await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "批量导入完成"
        );

        results
    }
}
