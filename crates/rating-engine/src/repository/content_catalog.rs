//! 内容目录实现
//!
//! 内容存在性属于外部系统，这里提供两种进程内实现：
//! - `InMemoryContentCatalog`: 只认可显式登记过的内容 ID
//! - `OpenContentCatalog`: 认可任意内容 ID，用于边界层已完成存在性检查的场景

use async_trait::async_trait;
use dashmap::DashSet;
use std::sync::Arc;

use super::traits::ContentCatalogTrait;
use crate::error::Result;

/// 基于 DashSet 的内容目录
#[derive(Debug, Clone, Default)]
pub struct InMemoryContentCatalog {
    contents: Arc<DashSet<String>>,
}

impl InMemoryContentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一批内容 ID
    pub fn with_contents<I, S>(contents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let catalog = Self::new();
        for id in contents {
            catalog.register(id);
        }
        catalog
    }

    pub fn register(&self, content_id: impl Into<String>) {
        self.contents.insert(content_id.into());
    }

    /// 注销内容，返回是否存在过
    pub fn unregister(&self, content_id: &str) -> bool {
        self.contents.remove(content_id).is_some()
    }
}

#[async_trait]
impl ContentCatalogTrait for InMemoryContentCatalog {
    async fn content_exists(&self, content_id: &str) -> Result<bool> {
        Ok(self.contents.contains(content_id))
    }
}

/// 认可任意内容 ID 的目录
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenContentCatalog;

#[async_trait]
impl ContentCatalogTrait for OpenContentCatalog {
    async fn content_exists(&self, _content_id: &str) -> Result<bool> {
        Ok(true)
    }
}
