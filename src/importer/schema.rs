// ==========================================
// 批量导入系统 - 实体 Schema 定义
// ==========================================
// 职责: 每种实体的固定列顺序、必填性、类型解析函数、父实体引用
// 约束: 列顺序即字段顺序；表头内容不参与映射
// ==========================================

use crate::domain::{AttributeValue, EntityKind};
use crate::importer::error::{ImportError, ImporterResult};
use chrono::NaiveDate;

/// 字段解析函数：输入已 TRIM 的非空文本
pub type ParseFn = fn(&str) -> Result<AttributeValue, String>;

// ==========================================
// FieldSpec - 字段定义 (fieldName, required, parseFn)
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub parse: ParseFn,
}

impl FieldSpec {
    pub const fn required(name: &'static str, parse: ParseFn) -> Self {
        Self {
            name,
            required: true,
            parse,
        }
    }

    pub const fn optional(name: &'static str, parse: ParseFn) -> Self {
        Self {
            name,
            required: false,
            parse,
        }
    }
}

// ==========================================
// ParentRefSpec - 父实体引用定义
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentRefSpec {
    pub field: &'static str,
    pub parent_kind: EntityKind,
}

// ==========================================
// EntitySchema
// ==========================================
#[derive(Debug, Clone)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub key_field: &'static str,
    pub fields: Vec<FieldSpec>,
    pub parent_refs: Vec<ParentRefSpec>,
}

impl EntitySchema {
    /// 内置实体 Schema
    pub fn for_kind(kind: EntityKind) -> Self {
        match kind {
            EntityKind::CatalogItem => Self {
                kind,
                key_field: "item_code",
                fields: vec![
                    FieldSpec::required("item_code", parse_upper_text),
                    FieldSpec::required("title", parse_text),
                    FieldSpec::optional("category", parse_text),
                    FieldSpec::optional("unit_price", parse_decimal),
                ],
                parent_refs: vec![],
            },
            EntityKind::CurriculumStage => Self {
                kind,
                key_field: "stage_code",
                fields: vec![
                    FieldSpec::required("stage_code", parse_upper_text),
                    FieldSpec::required("name", parse_text),
                    FieldSpec::required("sequence_no", parse_integer),
                    FieldSpec::optional("parent_stage_code", parse_upper_text),
                ],
                parent_refs: vec![ParentRefSpec {
                    field: "parent_stage_code",
                    parent_kind: EntityKind::CurriculumStage,
                }],
            },
            EntityKind::Learner => Self {
                kind,
                key_field: "learner_id",
                fields: vec![
                    FieldSpec::required("learner_id", parse_integer),
                    FieldSpec::required("full_name", parse_text),
                    FieldSpec::required("email", parse_email),
                    FieldSpec::required("stage_code", parse_upper_text),
                    FieldSpec::optional("enrolled_on", parse_date),
                ],
                parent_refs: vec![ParentRefSpec {
                    field: "stage_code",
                    parent_kind: EntityKind::CurriculumStage,
                }],
            },
            EntityKind::ConceptMapping => Self {
                kind,
                key_field: "mapping_code",
                fields: vec![
                    FieldSpec::required("mapping_code", parse_upper_text),
                    FieldSpec::required("concept_name", parse_text),
                    FieldSpec::required("stage_code", parse_upper_text),
                    FieldSpec::optional("item_code", parse_upper_text),
                ],
                parent_refs: vec![
                    ParentRefSpec {
                        field: "stage_code",
                        parent_kind: EntityKind::CurriculumStage,
                    },
                    ParentRefSpec {
                        field: "item_code",
                        parent_kind: EntityKind::CatalogItem,
                    },
                ],
            },
        }
    }

    /// 最少列数：截止到最后一个必填列
    pub fn min_columns(&self) -> usize {
        self.fields
            .iter()
            .rposition(|f| f.required)
            .map(|idx| idx + 1)
            .unwrap_or(1)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// 按自然键字段的解析规则规范化外部传入的键（与导入时一致）
    pub fn normalize_key(&self, raw: &str) -> Result<String, String> {
        let spec = self
            .field(self.key_field)
            .ok_or_else(|| format!("自然键 {} 不在字段列表中", self.key_field))?;
        let value = raw.trim();
        if value.is_empty() {
            return Err(format!("missing required field(s): {}", self.key_field));
        }
        (spec.parse)(value).map(|parsed| parsed.to_string())
    }

    /// 校验 Schema 自洽性（自定义 Schema 时使用）
    pub fn validate(&self) -> ImporterResult<()> {
        let schema_error = |message: String| ImportError::SchemaError {
            kind: self.kind.to_string(),
            message,
        };

        match self.field(self.key_field) {
            Some(f) if f.required => {}
            Some(_) => return Err(schema_error(format!("自然键 {} 必须为必填", self.key_field))),
            None => return Err(schema_error(format!("自然键 {} 不在字段列表中", self.key_field))),
        }

        for parent in &self.parent_refs {
            if self.field(parent.field).is_none() {
                return Err(schema_error(format!("引用字段 {} 不在字段列表中", parent.field)));
            }
        }

        Ok(())
    }
}

// ==========================================
// 解析函数
// ==========================================

pub fn parse_text(value: &str) -> Result<AttributeValue, String> {
    Ok(AttributeValue::Text(value.to_string()))
}

pub fn parse_upper_text(value: &str) -> Result<AttributeValue, String> {
    Ok(AttributeValue::Text(value.to_uppercase()))
}

pub fn parse_integer(value: &str) -> Result<AttributeValue, String> {
    value
        .parse::<i64>()
        .map(AttributeValue::Integer)
        .map_err(|_| format!("invalid integer '{}'", value))
}

pub fn parse_decimal(value: &str) -> Result<AttributeValue, String> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(AttributeValue::Decimal(v)),
        _ => Err(format!("invalid decimal '{}'", value)),
    }
}

pub fn parse_date(value: &str) -> Result<AttributeValue, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y%m%d"))
        .map(AttributeValue::Date)
        .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD or YYYYMMDD)", value))
}

pub fn parse_email(value: &str) -> Result<AttributeValue, String> {
    let mut parts = value.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty() => {
            Ok(AttributeValue::Text(value.to_lowercase()))
        }
        _ => Err(format!("invalid email '{}'", value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_schemas_are_valid() {
        for kind in EntityKind::ALL {
            EntitySchema::for_kind(kind).validate().unwrap();
        }
    }

    #[test]
    fn test_normalize_key_matches_import_rules() {
        let stage = EntitySchema::for_kind(EntityKind::CurriculumStage);
        assert_eq!(stage.normalize_key(" s1 ").unwrap(), "S1");

        let learner = EntitySchema::for_kind(EntityKind::Learner);
        assert_eq!(learner.normalize_key("007").unwrap(), "7");
        assert!(learner.normalize_key("seven").is_err());
        assert!(learner.normalize_key("   ").is_err());
    }

    #[test]
    fn test_min_columns() {
        assert_eq!(EntitySchema::for_kind(EntityKind::CatalogItem).min_columns(), 2);
        assert_eq!(EntitySchema::for_kind(EntityKind::Learner).min_columns(), 4);
        assert_eq!(EntitySchema::for_kind(EntityKind::ConceptMapping).min_columns(), 3);
    }

    #[test]
    fn test_schema_rejects_optional_key() {
        let mut schema = EntitySchema::for_kind(EntityKind::CatalogItem);
        schema.key_field = "category";
        assert!(matches!(schema.validate(), Err(ImportError::SchemaError { .. })));
    }

    #[test]
    fn test_parse_functions() {
        assert_eq!(parse_integer("007").unwrap(), AttributeValue::Integer(7));
        assert!(parse_integer("abc").unwrap_err().contains("invalid integer"));
        assert!(parse_decimal("NaN").is_err());
        assert_eq!(
            parse_date("20260301").unwrap(),
            AttributeValue::Date(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())
        );
        assert!(parse_email("a@b@c").is_err());
        assert_eq!(
            parse_email("Ada@Example.org").unwrap(),
            AttributeValue::Text("ada@example.org".to_string())
        );
    }
}
