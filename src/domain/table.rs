// ==========================================
// 数据库管理工具 - 表数据导入 - 目标表元数据
// ==========================================
// 职责: 限定表名、列元数据（位置/类型/可空/默认值）
// 生命周期: 每次导入只查询一次，之后只读
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// QualifiedName - 已解析的 schema.table
// ==========================================
// schema/table 均为解析后的名字（已去引号、已按方言折叠大小写）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifiedName {
    pub schema: Option<String>,
    pub table: String,
}

impl QualifiedName {
    pub fn new(schema: Option<String>, table: impl Into<String>) -> Self {
        Self {
            schema,
            table: table.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.table),
            None => write!(f, "{}", self.table),
        }
    }
}

// ==========================================
// ColumnMetadata - 列元数据
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub position: i64,          // 目录中的列位置（1 起）
    pub data_type: String,      // 方言原生类型名
    pub nullable: bool,
    pub default_value: Option<String>,
}

impl ColumnMetadata {
    /// 必填列：不可空且无默认值
    pub fn is_required(&self) -> bool {
        !self.nullable && self.default_value.is_none()
    }
}

// ==========================================
// TableMetadata - 表元数据
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub schema: Option<String>,
    pub table: String,
    /// 按目录位置升序
    pub columns: Vec<ColumnMetadata>,
}

impl TableMetadata {
    pub fn new(schema: Option<String>, table: impl Into<String>, mut columns: Vec<ColumnMetadata>) -> Self {
        columns.sort_by_key(|c| c.position);
        Self {
            schema,
            table: table.into(),
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn required_columns(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.columns.iter().filter(|c| c.is_required())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, position: i64, nullable: bool, default: Option<&str>) -> ColumnMetadata {
        ColumnMetadata {
            name: name.to_string(),
            position,
            data_type: "INTEGER".to_string(),
            nullable,
            default_value: default.map(|d| d.to_string()),
        }
    }

    #[test]
    fn test_columns_sorted_by_position() {
        let meta = TableMetadata::new(
            None,
            "T",
            vec![column("B", 2, true, None), column("A", 1, true, None)],
        );
        assert_eq!(meta.column_names(), vec!["A", "B"]);
    }

    #[test]
    fn test_required_columns() {
        let meta = TableMetadata::new(
            Some("S".to_string()),
            "T",
            vec![
                column("ID", 1, false, None),
                column("CREATED", 2, false, Some("CURRENT_TIMESTAMP")),
                column("NOTE", 3, true, None),
            ],
        );
        let required: Vec<_> = meta.required_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(required, vec!["ID"]);
        assert_eq!(QualifiedName::new(meta.schema.clone(), "T").to_string(), "S.T");
    }
}
