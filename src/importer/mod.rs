// ==========================================
// 批量导入系统 - 导入层
// ==========================================
// 职责: 分隔文本批量导入，按唯一性与引用完整性对账已有存储
// 产出: 部分成功的 ImportResult
// ==========================================

// 模块声明
pub mod batch_committer;
pub mod duplicate_classifier;
pub mod entity_importer_impl;
pub mod entity_importer_trait;
pub mod error;
pub mod existing_key_set;
pub mod field_parser;
pub mod record_reader;
pub mod reference_validator;
pub mod result_aggregator;
pub mod schema;

// 重导出核心类型
pub use batch_committer::BatchCommitter;
pub use duplicate_classifier::DuplicateClassifier;
pub use entity_importer_impl::EntityImporterImpl;
pub use error::{ImportError, ImporterResult};
pub use existing_key_set::ExistingKeySet;
pub use field_parser::FieldParser as FieldParserImpl;
pub use record_reader::{RawRow, ReaderOptions, RecordReader};
pub use reference_validator::ReferenceValidator;
pub use result_aggregator::ResultAggregator;
pub use schema::{EntitySchema, FieldSpec, ParentRefSpec};

// 重导出 Trait 接口
pub use entity_importer_trait::{EntityImporter, FieldParser};
