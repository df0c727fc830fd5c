// ==========================================
// 批量导入系统 - 实体领域模型
// ==========================================
// 职责: 导入候选行 (EntityCandidate) 与已落库实体 (Entity)
// 红线: 不含数据访问逻辑
// ==========================================

use crate::domain::types::{AttributeValue, EntityKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ==========================================
// ParentKeyRef - 父实体引用
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentKeyRef {
    pub field: String,            // 引用字段名
    pub parent_kind: EntityKind,  // 父实体类型
    pub key: String,              // 父实体自然键
}

// ==========================================
// EntityCandidate - 导入候选行
// ==========================================
// 用途: 字段解析后的中间产物
// 生命周期: 仅在单次 BatchJob 内，被接受后由提交器转为 Entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCandidate {
    pub kind: EntityKind,
    pub natural_key: String,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub parent_refs: Vec<ParentKeyRef>,

    // 元信息
    pub line: usize, // 数据行号（1 起，不含表头）
}

impl EntityCandidate {
    /// 转换为待落库实体（分配代理键）
    pub fn into_entity(self, import_batch_id: &str) -> Entity {
        let parent_keys = self
            .parent_refs
            .into_iter()
            .map(|r| (r.field, r.key))
            .collect();

        Entity {
            entity_id: Uuid::new_v4().to_string(),
            kind: self.kind,
            natural_key: self.natural_key,
            attributes: self.attributes,
            parent_keys,
            import_batch_id: Some(import_batch_id.to_string()),
            created_at: Utc::now(),
        }
    }
}

// ==========================================
// Entity - 已落库实体
// ==========================================
// 对齐: entity_record 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_id: String,                          // 代理键（UUID），区别于自然键
    pub kind: EntityKind,                           // 实体类型
    pub natural_key: String,                        // 自然键（同类型内唯一）
    pub attributes: BTreeMap<String, AttributeValue>, // 属性集
    pub parent_keys: BTreeMap<String, String>,      // 引用字段 → 父实体自然键
    pub import_batch_id: Option<String>,            // 来源导入批次
    pub created_at: DateTime<Utc>,                  // 创建时间
}

impl Entity {
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}
