//! 对象存储引擎
//!
//! 基于目录的持久化对象存储：每个集合对应一个JSON文件，记录全量驻留内存，
//! 二级索引随写入同步维护。单个变更操作整体落盘（临时文件+重命名），
//! 落盘成功后才提交内存状态，因此任何单一操作都不会被观察到部分生效，
//! 返回错误的操作在内存与磁盘上均无痕迹。

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use emr_core::{EmrError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::index::SecondaryIndex;
use crate::schema::{CollectionSpec, Schema};

const MANIFEST_FILE: &str = "manifest.json";
const LOCK_FILE: &str = ".lock";

/// 单个集合的内存状态
#[derive(Debug)]
struct Collection {
    spec: CollectionSpec,
    records: HashMap<String, Value>,
    indexes: HashMap<String, SecondaryIndex>, // 索引名 -> 索引
}

impl Collection {
    fn new(spec: CollectionSpec) -> Self {
        let indexes = spec
            .indexes
            .iter()
            .map(|ix| (ix.name.clone(), SecondaryIndex::new()))
            .collect();
        Self {
            spec,
            records: HashMap::new(),
            indexes,
        }
    }

    /// 从记录中提取主键，主键字段必须为非空字符串
    fn extract_key(&self, record: &Value) -> Result<String> {
        match record.get(&self.spec.key_field) {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(_) => Err(EmrError::Validation(format!(
                "集合 {} 的主键字段 {} 必须是非空字符串",
                self.spec.name, self.spec.key_field
            ))),
            None => Err(EmrError::Validation(format!(
                "集合 {} 的记录缺少主键字段 {}",
                self.spec.name, self.spec.key_field
            ))),
        }
    }

    /// 索引键取字段值的字符串形式；null或缺失的字段不入索引
    fn index_key(record: &Value, field: &str) -> Option<String> {
        match record.get(field) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        }
    }

    fn add_to_indexes(&mut self, key: &str, record: &Value) {
        let Self { spec, indexes, .. } = self;
        for ix in &spec.indexes {
            if let Some(index_key) = Self::index_key(record, &ix.field) {
                if let Some(index) = indexes.get_mut(&ix.name) {
                    index.insert(&index_key, key);
                }
            }
        }
    }

    fn remove_from_indexes(&mut self, key: &str, record: &Value) {
        let Self { spec, indexes, .. } = self;
        for ix in &spec.indexes {
            if let Some(index_key) = Self::index_key(record, &ix.field) {
                if let Some(index) = indexes.get_mut(&ix.name) {
                    index.remove(&index_key, key);
                }
            }
        }
    }

    /// 唯一索引冲突检查（排除记录自身的主键）
    fn check_unique(&self, key: &str, record: &Value) -> Result<()> {
        for ix in self.spec.indexes.iter().filter(|ix| ix.unique) {
            if let Some(index_key) = Self::index_key(record, &ix.field) {
                if let Some(index) = self.indexes.get(&ix.name) {
                    if index.held_by_other(&index_key, key) {
                        return Err(EmrError::DuplicateKey(format!(
                            "集合 {} 的唯一索引 {} 已存在键 {}",
                            self.spec.name, ix.name, index_key
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// 序列化应用变更后的记录全集；内存状态留待落盘成功后由调用方提交
    fn encode_with(&self, upserts: &[(String, Value)], removed: Option<&str>) -> Result<Vec<u8>> {
        let mut view: HashMap<&str, &Value> = self
            .records
            .iter()
            .map(|(key, value)| (key.as_str(), value))
            .collect();
        for (key, value) in upserts {
            view.insert(key.as_str(), value);
        }
        if let Some(key) = removed {
            view.remove(key);
        }
        Ok(serde_json::to_vec(&view)?)
    }

    /// 从记录全量重建全部索引（加载时调用）
    fn rebuild_indexes(&mut self) {
        for index in self.indexes.values_mut() {
            index.clear();
        }
        let Self {
            spec,
            records,
            indexes,
        } = self;
        for (key, record) in records.iter() {
            for ix in &spec.indexes {
                if let Some(index_key) = Collection::index_key(record, &ix.field) {
                    if let Some(index) = indexes.get_mut(&ix.name) {
                        index.insert(&index_key, key);
                    }
                }
            }
        }
    }
}

/// 对象存储引擎句柄
///
/// 同一目录同一时刻只允许一个活动句柄（目录锁文件），打开即串行化。
#[derive(Debug)]
pub struct ObjectStore {
    root: PathBuf,
    schema: Schema,
    collections: HashMap<String, Collection>,
    lock_held: bool,
}

impl ObjectStore {
    /// 打开（或创建）存储目录
    ///
    /// 首次打开按声明模式创建全部集合并落盘清单；
    /// 声明版本高于落盘版本时执行增量迁移（只增不删）；
    /// 声明版本等于或低于落盘版本时以落盘清单为准，仅打开。
    /// 同一目录已有活动句柄时返回 `SchemaConflict`。
    pub async fn open(root: impl AsRef<Path>, schema: Schema) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            EmrError::StorageUnavailable(format!("无法创建存储目录 {}: {}", root.display(), e))
        })?;

        Self::acquire_lock(&root).await?;

        match Self::open_locked(root.clone(), schema).await {
            Ok(store) => Ok(store),
            Err(e) => {
                // 打开失败时释放锁，否则目录将一直不可用
                let _ = tokio::fs::remove_file(root.join(LOCK_FILE)).await;
                Err(e)
            }
        }
    }

    /// 获取目录锁；锁文件记录持有进程号，持有进程已消亡时回收陈旧锁
    async fn acquire_lock(root: &Path) -> Result<()> {
        let lock_path = root.join(LOCK_FILE);
        for attempt in 0..2 {
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
                .await
            {
                Ok(_) => {
                    if let Err(e) =
                        tokio::fs::write(&lock_path, std::process::id().to_string()).await
                    {
                        let _ = tokio::fs::remove_file(&lock_path).await;
                        return Err(EmrError::StorageUnavailable(format!(
                            "无法写入存储锁: {}",
                            e
                        )));
                    }
                    return Ok(());
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if attempt == 0 && Self::lock_is_stale(&lock_path).await {
                        info!("Reclaiming stale lock at {}", lock_path.display());
                        let _ = tokio::fs::remove_file(&lock_path).await;
                        continue;
                    }
                    return Err(EmrError::SchemaConflict(format!(
                        "存储目录 {} 已被其他句柄打开；若持有进程已退出，删除锁文件 {} 后重试",
                        root.display(),
                        lock_path.display()
                    )));
                }
                Err(e) => {
                    return Err(EmrError::StorageUnavailable(format!(
                        "无法获取存储锁: {}",
                        e
                    )))
                }
            }
        }
        Err(EmrError::SchemaConflict(format!(
            "存储目录 {} 的锁回收后再次被占用",
            root.display()
        )))
    }

    /// 锁文件记录的进程已不存在时视为陈旧锁
    ///
    /// 内容无法解析或无法核实进程存活（无/proc）时一律视为仍被持有。
    async fn lock_is_stale(lock_path: &Path) -> bool {
        let contents = match tokio::fs::read_to_string(lock_path).await {
            Ok(contents) => contents,
            Err(_) => return false,
        };
        let pid: u32 = match contents.trim().parse() {
            Ok(pid) => pid,
            Err(_) => return false,
        };
        if pid == std::process::id() {
            return false;
        }
        let proc_root = Path::new("/proc");
        proc_root.is_dir() && !proc_root.join(pid.to_string()).exists()
    }

    async fn open_locked(root: PathBuf, declared: Schema) -> Result<Self> {
        let manifest_path = root.join(MANIFEST_FILE);

        let persisted: Option<Schema> = match tokio::fs::read(&manifest_path).await {
            Ok(bytes) => Some(serde_json::from_slice(&bytes).map_err(|e| {
                EmrError::StorageUnavailable(format!("清单文件无法解析: {}", e))
            })?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(EmrError::StorageUnavailable(format!(
                    "清单文件无法读取: {}",
                    e
                )))
            }
        };

        let (schema, manifest_dirty) = match persisted {
            None => (declared, true),
            Some(p) if declared.version > p.version => {
                info!(
                    "Migrating store schema from version {} to {}",
                    p.version, declared.version
                );
                (Schema::merge_additive(p, &declared), true)
            }
            Some(p) => (p, false),
        };

        let mut store = Self {
            root,
            schema,
            collections: HashMap::new(),
            lock_held: true,
        };

        let mut created = Vec::new();
        for spec in store.schema.collections.clone() {
            let path = store.collection_path(&spec.name);
            let mut collection = Collection::new(spec.clone());
            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    collection.records = serde_json::from_slice(&bytes)?;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    created.push(spec.name.clone());
                }
                Err(e) => return Err(EmrError::Io(e)),
            }
            collection.rebuild_indexes();
            store.collections.insert(spec.name.clone(), collection);
        }

        for name in &created {
            store.write_collection(name, b"{}").await?;
        }
        if manifest_dirty {
            let bytes = serde_json::to_vec_pretty(&store.schema)?;
            store.write_atomic(MANIFEST_FILE, &bytes).await?;
        }

        info!(
            "Opened object store at {} (schema version {}, {} collections)",
            store.root.display(),
            store.schema.version,
            store.collections.len()
        );
        Ok(store)
    }

    /// 插入新记录，主键已存在时返回 `DuplicateKey`
    pub async fn insert<T: Serialize>(&mut self, collection: &str, record: &T) -> Result<String> {
        let value = serde_json::to_value(record)?;
        let coll = self.collection_ref(collection)?;
        let key = coll.extract_key(&value)?;
        if coll.records.contains_key(&key) {
            return Err(EmrError::DuplicateKey(format!(
                "集合 {} 中已存在主键 {}",
                collection, key
            )));
        }
        coll.check_unique(&key, &value)?;
        let pending = [(key.clone(), value)];
        let bytes = coll.encode_with(&pending, None)?;
        self.write_collection(collection, &bytes).await?;

        let [(_, value)] = pending;
        let coll = self.collection_mut(collection)?;
        coll.add_to_indexes(&key, &value);
        coll.records.insert(key.clone(), value);
        debug!("Inserted record {} into {}", key, collection);
        Ok(key)
    }

    /// 写入记录（插入或整体替换），索引条目随之更新
    pub async fn put<T: Serialize>(&mut self, collection: &str, record: &T) -> Result<String> {
        let value = serde_json::to_value(record)?;
        let coll = self.collection_ref(collection)?;
        let key = coll.extract_key(&value)?;
        coll.check_unique(&key, &value)?;
        let pending = [(key.clone(), value)];
        let bytes = coll.encode_with(&pending, None)?;
        self.write_collection(collection, &bytes).await?;

        let [(_, value)] = pending;
        let coll = self.collection_mut(collection)?;
        if let Some(old) = coll.records.remove(&key) {
            coll.remove_from_indexes(&key, &old);
        }
        coll.add_to_indexes(&key, &value);
        coll.records.insert(key.clone(), value);
        debug!("Put record {} into {}", key, collection);
        Ok(key)
    }

    /// 批量写入：先整体校验、一次落盘、落盘成功后整体提交，
    /// 要么全部可见要么全部不可见
    pub async fn put_many<T: Serialize>(
        &mut self,
        collection: &str,
        records: &[T],
    ) -> Result<Vec<String>> {
        let mut values = Vec::with_capacity(records.len());
        for record in records {
            values.push(serde_json::to_value(record)?);
        }

        let coll = self.collection_ref(collection)?;

        // 校验阶段：任何一条不合法，整批拒绝
        let mut keys = Vec::with_capacity(values.len());
        let mut batch_unique: HashMap<String, HashSet<String>> = HashMap::new();
        for value in &values {
            let key = coll.extract_key(value)?;
            coll.check_unique(&key, value)?;
            for ix in coll.spec.indexes.iter().filter(|ix| ix.unique) {
                if let Some(index_key) = Collection::index_key(value, &ix.field) {
                    let seen = batch_unique.entry(ix.name.clone()).or_default();
                    if !seen.insert(index_key.clone()) {
                        return Err(EmrError::DuplicateKey(format!(
                            "批量写入中唯一索引 {} 重复键 {}",
                            ix.name, index_key
                        )));
                    }
                }
            }
            keys.push(key);
        }

        let pending: Vec<(String, Value)> = keys.iter().cloned().zip(values).collect();
        let bytes = coll.encode_with(&pending, None)?;
        self.write_collection(collection, &bytes).await?;

        // 提交阶段
        let coll = self.collection_mut(collection)?;
        for (key, value) in pending {
            if let Some(old) = coll.records.remove(&key) {
                coll.remove_from_indexes(&key, &old);
            }
            coll.add_to_indexes(&key, &value);
            coll.records.insert(key, value);
        }
        info!("Batch wrote {} records into {}", keys.len(), collection);
        Ok(keys)
    }

    /// 按主键读取
    pub fn get<T: DeserializeOwned>(&self, collection: &str, key: &str) -> Result<Option<T>> {
        let coll = self.collection_ref(collection)?;
        match coll.records.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// 读取集合全部记录（无顺序保证）
    pub fn get_all<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let coll = self.collection_ref(collection)?;
        coll.records
            .values()
            .map(|value| serde_json::from_value(value.clone()).map_err(EmrError::from))
            .collect()
    }

    /// 按二级索引读取索引键下的全部记录
    pub fn get_by_index<T: DeserializeOwned>(
        &self,
        collection: &str,
        index_name: &str,
        key: &str,
    ) -> Result<Vec<T>> {
        let coll = self.collection_ref(collection)?;
        let index = coll.indexes.get(index_name).ok_or_else(|| {
            EmrError::NotFound(format!("集合 {} 不存在索引 {}", collection, index_name))
        })?;
        index
            .primary_keys(key)
            .iter()
            .filter_map(|pk| coll.records.get(pk))
            .map(|value| serde_json::from_value(value.clone()).map_err(EmrError::from))
            .collect()
    }

    /// 删除记录及其全部索引条目；主键不存在时为no-op
    pub async fn delete(&mut self, collection: &str, key: &str) -> Result<()> {
        let coll = self.collection_ref(collection)?;
        if !coll.records.contains_key(key) {
            debug!("Delete of absent key {} in {} ignored", key, collection);
            return Ok(());
        }
        let bytes = coll.encode_with(&[], Some(key))?;
        self.write_collection(collection, &bytes).await?;

        let coll = self.collection_mut(collection)?;
        if let Some(old) = coll.records.remove(key) {
            coll.remove_from_indexes(key, &old);
        }
        debug!("Deleted record {} from {}", key, collection);
        Ok(())
    }

    /// 清空集合的全部记录与索引条目
    pub async fn clear(&mut self, collection: &str) -> Result<()> {
        let removed = self.collection_ref(collection)?.records.len();
        self.write_collection(collection, b"{}").await?;

        let coll = self.collection_mut(collection)?;
        coll.records.clear();
        for index in coll.indexes.values_mut() {
            index.clear();
        }
        info!("Cleared collection {} ({} records)", collection, removed);
        Ok(())
    }

    /// 集合记录数
    pub fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.collection_ref(collection)?.records.len())
    }

    /// 生效模式（落盘清单）
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn version(&self) -> u32 {
        self.schema.version
    }

    /// 关闭句柄并释放目录锁；释放失败时drop还会再尝试一次
    pub async fn close(mut self) -> Result<()> {
        tokio::fs::remove_file(self.root.join(LOCK_FILE)).await?;
        self.lock_held = false;
        info!("Closed object store at {}", self.root.display());
        Ok(())
    }

    fn collection_ref(&self, name: &str) -> Result<&Collection> {
        self.collections
            .get(name)
            .ok_or_else(|| EmrError::NotFound(format!("集合 {} 不存在", name)))
    }

    fn collection_mut(&mut self, name: &str) -> Result<&mut Collection> {
        self.collections
            .get_mut(name)
            .ok_or_else(|| EmrError::NotFound(format!("集合 {} 不存在", name)))
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", name))
    }

    /// 集合整体落盘：写临时文件后原子重命名
    async fn write_collection(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.write_atomic(&format!("{}.json", name), bytes).await
    }

    async fn write_atomic(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.root.join(file_name);
        let tmp = self.root.join(format!("{}.tmp", file_name));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

impl Drop for ObjectStore {
    fn drop(&mut self) {
        // close()未被调用时尽力释放锁
        if self.lock_held {
            let _ = std::fs::remove_file(self.root.join(LOCK_FILE));
        }
    }
}
