//! # EMR 存储模块
//!
//! 提供本地优先的持久化对象存储：
//! - 基于目录的JSON文件存储，每个集合一个文件
//! - 主键与二级索引（含唯一索引）查询
//! - 只增不删的模式迁移
//! - 目录锁保证单活动句柄

pub mod engine;
pub mod index;
pub mod schema;

pub use engine::ObjectStore;
pub use index::SecondaryIndex;
pub use schema::{CollectionSpec, IndexSpec, Schema};
