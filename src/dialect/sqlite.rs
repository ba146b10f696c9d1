// ==========================================
// SQLite 方言
// ==========================================
// 目录: pragma_table_info(?)，notnull 为 0/1 标志，cid 从 0 开始
// 无 schema 概念，只按表名查询；无 TRUNCATE，用 DELETE FROM
// ==========================================

use super::{base_type_name, optional_text, required_field, required_i64, required_text};
use crate::client::SqlRow;
use crate::dialect::DialectStrategy;
use crate::domain::record::SqlValue;
use crate::domain::table::{ColumnMetadata, QualifiedName};
use crate::domain::types::{Dialect, TypeFamily};
use crate::importer::error::{ImportError, ImportResult};

pub struct SqliteDialect;

impl DialectStrategy for SqliteDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn fold_case(&self, name: &str) -> String {
        name.to_string()
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn columns_query(&self, table: &QualifiedName) -> (String, Vec<SqlValue>) {
        (
            r#"SELECT name, cid, type, "notnull", dflt_value FROM pragma_table_info(?) ORDER BY cid"#
                .to_string(),
            vec![SqlValue::Text(table.table.clone())],
        )
    }

    fn decode_column(&self, row: &SqlRow) -> ImportResult<ColumnMetadata> {
        let not_null = required_field(row, "notnull")?.as_i64().ok_or_else(|| {
            ImportError::DatabaseQueryError("notnull 字段不是整数".to_string())
        })?;

        Ok(ColumnMetadata {
            name: required_text(row, "name")?,
            position: required_i64(row, "cid")? + 1,
            data_type: optional_text(row, "type").unwrap_or_default(),
            nullable: not_null == 0,
            default_value: optional_text(row, "dflt_value"),
        })
    }

    fn type_family(&self, data_type: &str) -> TypeFamily {
        let base = base_type_name(data_type).to_uppercase();
        if base.contains("BOOL") {
            TypeFamily::Boolean
        } else if base.contains("DATETIME") || base.contains("TIMESTAMP") {
            TypeFamily::Timestamp
        } else if base == "DATE" {
            TypeFamily::Date
        } else if base.contains("INT") {
            TypeFamily::Integer
        } else if ["REAL", "FLOA", "DOUB", "NUMERIC", "DECIMAL"]
            .iter()
            .any(|t| base.contains(t))
        {
            TypeFamily::Decimal
        } else {
            TypeFamily::Text
        }
    }

    fn begin_sql(&self) -> &'static str {
        "BEGIN TRANSACTION"
    }

    fn truncate_sql(&self, qualified_table: &str) -> String {
        format!("DELETE FROM {}", qualified_table)
    }
}
