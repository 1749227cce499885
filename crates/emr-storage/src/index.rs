//! 二级索引结构
//!
//! 索引键到主键列表的映射，随记录写入/删除同步维护。

use std::collections::HashMap;

/// 二级索引：字段值（字符串形式）-> 主键列表
#[derive(Debug, Default)]
pub struct SecondaryIndex {
    entries: HashMap<String, Vec<String>>,
}

impl SecondaryIndex {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// 登记主键到索引键下（已存在则不重复登记）
    pub fn insert(&mut self, key: &str, primary_key: &str) {
        let bucket = self.entries.entry(key.to_string()).or_insert_with(Vec::new);
        if !bucket.iter().any(|pk| pk == primary_key) {
            bucket.push(primary_key.to_string());
        }
    }

    /// 从索引键下移除主键，空桶一并移除
    pub fn remove(&mut self, key: &str, primary_key: &str) {
        if let Some(bucket) = self.entries.get_mut(key) {
            bucket.retain(|pk| pk != primary_key);
            if bucket.is_empty() {
                self.entries.remove(key);
            }
        }
    }

    /// 索引键下的全部主键
    pub fn primary_keys(&self, key: &str) -> &[String] {
        self.entries.get(key).map(|b| b.as_slice()).unwrap_or(&[])
    }

    /// 是否存在其他主键占用此索引键（唯一索引冲突检查）
    pub fn held_by_other(&self, key: &str, primary_key: &str) -> bool {
        self.primary_keys(key).iter().any(|pk| pk != primary_key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
