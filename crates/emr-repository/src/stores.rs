//! 集合定义
//!
//! 电子病历的集合模式。版本1为临床实体，版本2新增附件集合，
//! 版本3新增应用设置集合。索引均为非唯一索引。

use emr_storage::{CollectionSpec, IndexSpec, Schema};

pub const PATIENTS: &str = "patients";
pub const RECORDS: &str = "records";
pub const PRESCRIPTIONS: &str = "prescriptions";
pub const LAB_RESULTS: &str = "lab_results";
pub const AI_CONVERSATIONS: &str = "ai_conversations";
pub const MEDIA: &str = "media";
pub const APP_SETTINGS: &str = "app_settings";

/// 当前模式版本
pub const SCHEMA_VERSION: u32 = 3;

/// 表示设置的单例行主键
pub const DISPLAY_SETTINGS_ID: &str = "display_settings";

pub fn emr_schema() -> Schema {
    Schema::new(
        SCHEMA_VERSION,
        vec![
            CollectionSpec::new(
                PATIENTS,
                "id",
                vec![
                    IndexSpec::new("name", "name"),
                    IndexSpec::new("nameKana", "nameKana"),
                    IndexSpec::new("patientCode", "patientCode"),
                ],
            ),
            CollectionSpec::new(
                RECORDS,
                "id",
                vec![
                    IndexSpec::new("patientId", "patientId"),
                    IndexSpec::new("visitedAt", "visitedAt"),
                ],
            ),
            CollectionSpec::new(
                PRESCRIPTIONS,
                "id",
                vec![
                    IndexSpec::new("patientId", "patientId"),
                    IndexSpec::new("recordId", "recordId"),
                    IndexSpec::new("prescribedAt", "prescribedAt"),
                ],
            ),
            CollectionSpec::new(
                LAB_RESULTS,
                "id",
                vec![
                    IndexSpec::new("patientId", "patientId"),
                    IndexSpec::new("examinedAt", "examinedAt"),
                    IndexSpec::new("category", "category"),
                ],
            ),
            CollectionSpec::new(
                AI_CONVERSATIONS,
                "id",
                vec![IndexSpec::new("patientId", "patientId")],
            ),
            CollectionSpec::new(
                MEDIA,
                "id",
                vec![
                    IndexSpec::new("parentId", "parentId"),
                    IndexSpec::new("parentType", "parentType"),
                ],
            ),
            CollectionSpec::new(APP_SETTINGS, "id", vec![]),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_covers_all_collections() {
        let schema = emr_schema();
        assert_eq!(schema.version, SCHEMA_VERSION);
        assert_eq!(schema.collections.len(), 7);
        for name in [
            PATIENTS,
            RECORDS,
            PRESCRIPTIONS,
            LAB_RESULTS,
            AI_CONVERSATIONS,
            MEDIA,
            APP_SETTINGS,
        ] {
            assert!(schema.collection(name).is_some(), "missing {}", name);
        }
        let patients = schema.collection(PATIENTS).unwrap();
        assert_eq!(patients.key_field, "id");
        assert_eq!(patients.indexes.len(), 3);
    }
}
