//! 存储模式定义
//!
//! 模式（版本号+集合规格）既是打开存储时的声明，也是落盘清单文件的内容。

use serde::{Deserialize, Serialize};

/// 二级索引规格
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub field: String,
    pub unique: bool,
}

impl IndexSpec {
    /// 创建非唯一索引
    pub fn new(name: &str, field: &str) -> Self {
        Self {
            name: name.to_string(),
            field: field.to_string(),
            unique: false,
        }
    }

    /// 创建唯一索引
    pub fn unique(name: &str, field: &str) -> Self {
        Self {
            name: name.to_string(),
            field: field.to_string(),
            unique: true,
        }
    }
}

/// 集合规格：主键字段 + 二级索引列表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    pub key_field: String,
    pub indexes: Vec<IndexSpec>,
}

impl CollectionSpec {
    pub fn new(name: &str, key_field: &str, indexes: Vec<IndexSpec>) -> Self {
        Self {
            name: name.to_string(),
            key_field: key_field.to_string(),
            indexes,
        }
    }
}

/// 存储模式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub version: u32,
    pub collections: Vec<CollectionSpec>,
}

impl Schema {
    pub fn new(version: u32, collections: Vec<CollectionSpec>) -> Self {
        Self {
            version,
            collections,
        }
    }

    /// 按名称查找集合规格
    pub fn collection(&self, name: &str) -> Option<&CollectionSpec> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// 合并迁移：以落盘模式为基础，补充声明模式中新增的集合与索引。
    /// 只做增量，绝不删除或改名既有集合。
    pub fn merge_additive(persisted: Schema, declared: &Schema) -> Schema {
        let mut merged = persisted;
        merged.version = declared.version;
        for dc in &declared.collections {
            match merged.collections.iter_mut().find(|c| c.name == dc.name) {
                Some(existing) => {
                    for ix in &dc.indexes {
                        if !existing.indexes.iter().any(|e| e.name == ix.name) {
                            existing.indexes.push(ix.clone());
                        }
                    }
                }
                None => merged.collections.push(dc.clone()),
            }
        }
        merged
    }
}
