// ==========================================
// 批量导入系统 - 领域类型定义
// ==========================================
// 职责: 实体类型、提交模式、字段值等基础枚举
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 实体类型 (Entity Kind)
// ==========================================
// 序列化格式: snake_case (与数据库 kind 列一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    CatalogItem,     // 目录条目
    CurriculumStage, // 课程阶段
    Learner,         // 学员
    ConceptMapping,  // 知识点映射
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::CatalogItem,
        EntityKind::CurriculumStage,
        EntityKind::Learner,
        EntityKind::ConceptMapping,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::CatalogItem => "catalog_item",
            EntityKind::CurriculumStage => "curriculum_stage",
            EntityKind::Learner => "learner",
            EntityKind::ConceptMapping => "concept_mapping",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        EntityKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| format!("未知实体类型: {}", s))
    }
}

// ==========================================
// 提交模式 (Commit Mode)
// ==========================================
// 唯一约束冲突时的降级粒度，由存储能力决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitMode {
    /// 冲突行被拒绝，其余行照常写入
    #[default]
    Partial,
    /// 任一冲突导致整批回滚
    AllOrNothing,
}

impl fmt::Display for CommitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitMode::Partial => write!(f, "PARTIAL"),
            CommitMode::AllOrNothing => write!(f, "ALL_OR_NOTHING"),
        }
    }
}

impl FromStr for CommitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PARTIAL" => Ok(CommitMode::Partial),
            "ALL_OR_NOTHING" => Ok(CommitMode::AllOrNothing),
            other => Err(format!("未知提交模式: {}", other)),
        }
    }
}

// ==========================================
// 字段值 (Attribute Value)
// ==========================================
// 解析后的强类型字段值，以 JSON 形式落库
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Date(NaiveDate),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(v) => write!(f, "{}", v),
            AttributeValue::Integer(v) => write!(f, "{}", v),
            AttributeValue::Decimal(v) => write!(f, "{}", v),
            AttributeValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_from_str() {
        assert_eq!("learner".parse::<EntityKind>().unwrap(), EntityKind::Learner);
        assert_eq!(
            "Curriculum-Stage".parse::<EntityKind>().unwrap(),
            EntityKind::CurriculumStage
        );
        assert!("invoice".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_commit_mode_round_trip() {
        for mode in [CommitMode::Partial, CommitMode::AllOrNothing] {
            assert_eq!(mode.to_string().parse::<CommitMode>().unwrap(), mode);
        }
        assert_eq!(CommitMode::default(), CommitMode::Partial);
    }

    #[test]
    fn test_attribute_value_display() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(AttributeValue::Date(date).to_string(), "2026-03-01");
        assert_eq!(AttributeValue::Integer(42).to_string(), "42");
    }
}
