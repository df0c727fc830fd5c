// ==========================================
// 批量导入系统 - 字段解析与规范化
// ==========================================
// 职责: 原始字段 → EntityCandidate（按 Schema 固定列顺序）
// 规则: TRIM 全部字段；必填为空 → Invalid；类型解析失败 → Invalid
// ==========================================

use crate::domain::{EntityCandidate, ParentKeyRef, ValidationOutcome};
use crate::importer::entity_importer_trait::FieldParser as FieldParserTrait;
use crate::importer::schema::EntitySchema;
use std::collections::BTreeMap;

pub struct FieldParser;

impl FieldParserTrait for FieldParser {
    fn parse_row(
        &self,
        schema: &EntitySchema,
        line: usize,
        fields: &[String],
    ) -> Result<EntityCandidate, ValidationOutcome> {
        let values: Vec<&str> = schema
            .fields
            .iter()
            .enumerate()
            .map(|(idx, _)| fields.get(idx).map(|v| v.trim()).unwrap_or(""))
            .collect();

        // 必填校验（一次性列出全部缺失字段）
        let missing: Vec<&str> = schema
            .fields
            .iter()
            .zip(&values)
            .filter(|(spec, value)| spec.required && value.is_empty())
            .map(|(spec, _)| spec.name)
            .collect();
        if !missing.is_empty() {
            return Err(ValidationOutcome::invalid(
                line,
                format!("missing required field(s): {}", missing.join(", ")),
            ));
        }

        // 类型解析
        let mut attributes = BTreeMap::new();
        let mut parse_errors = Vec::new();
        for (spec, value) in schema.fields.iter().zip(&values) {
            if value.is_empty() {
                continue;
            }
            match (spec.parse)(value) {
                Ok(parsed) => {
                    attributes.insert(spec.name.to_string(), parsed);
                }
                Err(message) => parse_errors.push(format!("field '{}': {}", spec.name, message)),
            }
        }
        if !parse_errors.is_empty() {
            return Err(ValidationOutcome::invalid(line, parse_errors.join("; ")));
        }

        let natural_key = match attributes.get(schema.key_field) {
            Some(value) => value.to_string(),
            None => {
                return Err(ValidationOutcome::invalid(
                    line,
                    format!("missing required field(s): {}", schema.key_field),
                ))
            }
        };

        let parent_refs = schema
            .parent_refs
            .iter()
            .filter_map(|parent| {
                attributes.get(parent.field).map(|value| ParentKeyRef {
                    field: parent.field.to_string(),
                    parent_kind: parent.parent_kind,
                    key: value.to_string(),
                })
            })
            .collect();

        Ok(EntityCandidate {
            kind: schema.kind,
            natural_key,
            attributes,
            parent_refs,
            line,
        })
    }
}
