//! # EMR 数据仓库模块
//!
//! 诊所数据的访问层：在对象存储之上提供患者、诊疗记录、处方、
//! 检查结果、附件、AI对话与表示设置的读写，负责外键校验、
//! 级联删除和患者编号发放，并支持全量快照的导出与合并导入。

pub mod repository;
pub mod snapshot;
pub mod stores;

pub use repository::{default_display_settings, CountSummary, EmrRepository};
pub use snapshot::{export_snapshot, import_snapshot, ImportSummary, Snapshot};
pub use stores::{emr_schema, DISPLAY_SETTINGS_ID, SCHEMA_VERSION};
