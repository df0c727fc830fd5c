// ==========================================
// 批量导入系统 - 实体列表缓存
// ==========================================
// 职责: “某类型全部实体”的读穿缓存
// 失效: 提交器写入该类型后整类驱逐（evict-all-on-write）
// 一致性: 尽力而为，提交与驱逐之间读者可能读到旧数据
// ==========================================

use crate::domain::{Entity, EntityKind};
use crate::repository::{EntityImportRepository, RepositoryResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

// ==========================================
// EntityCache Trait
// ==========================================
// 用途: 提交器写入后发出的整类驱逐信号
#[async_trait]
pub trait EntityCache: Send + Sync {
    async fn evict_all(&self, kind: EntityKind);
}

// ==========================================
// EntityListCache
// ==========================================
// 每类型一个代数：驱逐时递增；加载期间代数变化则不写回，
// 避免驱逐前读出的旧快照在驱逐后被放回缓存
#[derive(Default)]
struct CacheEntries {
    lists: HashMap<EntityKind, Arc<Vec<Entity>>>,
    generations: HashMap<EntityKind, u64>,
}

#[derive(Default)]
pub struct EntityListCache {
    entries: RwLock<CacheEntries>,
}

impl EntityListCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读穿：命中直接返回，未命中从仓储加载并缓存
    pub async fn get_or_load<R>(&self, kind: EntityKind, repo: &R) -> RepositoryResult<Arc<Vec<Entity>>>
    where
        R: EntityImportRepository + ?Sized,
    {
        let generation = {
            let entries = self.entries.read().await;
            if let Some(hit) = entries.lists.get(&kind) {
                return Ok(Arc::clone(hit));
            }
            entries.generations.get(&kind).copied().unwrap_or(0)
        };

        let loaded = Arc::new(repo.list_by_kind(kind).await?);

        let mut entries = self.entries.write().await;
        if entries.generations.get(&kind).copied().unwrap_or(0) == generation {
            debug!(kind = %kind, count = loaded.len(), "实体列表已加载入缓存");
            entries.lists.insert(kind, Arc::clone(&loaded));
        } else {
            debug!(kind = %kind, "加载期间发生驱逐，快照不写回缓存");
        }
        Ok(loaded)
    }

    pub async fn is_cached(&self, kind: EntityKind) -> bool {
        self.entries.read().await.lists.contains_key(&kind)
    }
}

#[async_trait]
impl EntityCache for EntityListCache {
    async fn evict_all(&self, kind: EntityKind) {
        let mut entries = self.entries.write().await;
        *entries.generations.entry(kind).or_insert(0) += 1;
        if entries.lists.remove(&kind).is_some() {
            debug!(kind = %kind, "实体列表缓存已驱逐");
        }
    }
}
