// ==========================================
// HANA 方言
// ==========================================
// 目录: SYS.TABLE_COLUMNS，IS_NULLABLE 为 'TRUE'/'FALSE'
// 未指定 schema 时使用 CURRENT_SCHEMA
// ==========================================

use super::{base_type_name, decode_flag, optional_text, required_field, required_i64, required_text};
use crate::client::SqlRow;
use crate::dialect::DialectStrategy;
use crate::domain::record::SqlValue;
use crate::domain::table::{ColumnMetadata, QualifiedName};
use crate::domain::types::{Dialect, TypeFamily};
use crate::importer::error::{ImportError, ImportResult};

pub struct HanaDialect;

impl DialectStrategy for HanaDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Hana
    }

    fn fold_case(&self, name: &str) -> String {
        name.to_uppercase()
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn columns_query(&self, table: &QualifiedName) -> (String, Vec<SqlValue>) {
        let base = r#"
            SELECT COLUMN_NAME, POSITION, DATA_TYPE_NAME, IS_NULLABLE, DEFAULT_VALUE
            FROM SYS.TABLE_COLUMNS
            WHERE"#;
        match &table.schema {
            Some(schema) => (
                format!("{} SCHEMA_NAME = ? AND TABLE_NAME = ? ORDER BY POSITION", base),
                vec![SqlValue::Text(schema.clone()), SqlValue::Text(table.table.clone())],
            ),
            None => (
                format!("{} SCHEMA_NAME = CURRENT_SCHEMA AND TABLE_NAME = ? ORDER BY POSITION", base),
                vec![SqlValue::Text(table.table.clone())],
            ),
        }
    }

    fn decode_column(&self, row: &SqlRow) -> ImportResult<ColumnMetadata> {
        let nullable_raw = required_field(row, "IS_NULLABLE")?;
        let nullable = decode_flag(nullable_raw).ok_or_else(|| {
            ImportError::DatabaseQueryError(format!("无法识别的 IS_NULLABLE 值: {}", nullable_raw))
        })?;

        Ok(ColumnMetadata {
            name: required_text(row, "COLUMN_NAME")?,
            position: required_i64(row, "POSITION")?,
            data_type: required_text(row, "DATA_TYPE_NAME")?,
            nullable,
            default_value: optional_text(row, "DEFAULT_VALUE"),
        })
    }

    fn type_family(&self, data_type: &str) -> TypeFamily {
        match base_type_name(data_type).to_uppercase().as_str() {
            "TINYINT" | "SMALLINT" | "INTEGER" | "INT" | "BIGINT" => TypeFamily::Integer,
            "DECIMAL" | "SMALLDECIMAL" | "REAL" | "DOUBLE" | "FLOAT" => TypeFamily::Decimal,
            "BOOLEAN" => TypeFamily::Boolean,
            "DATE" => TypeFamily::Date,
            "TIMESTAMP" | "SECONDDATE" | "LONGDATE" => TypeFamily::Timestamp,
            _ => TypeFamily::Text,
        }
    }

    fn begin_sql(&self) -> &'static str {
        "BEGIN TRANSACTION"
    }

    fn truncate_sql(&self, qualified_table: &str) -> String {
        format!("TRUNCATE TABLE {}", qualified_table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_query_uses_current_schema_without_schema() {
        let (sql, params) = HanaDialect.columns_query(&QualifiedName::new(None, "ORDERS"));
        assert!(sql.contains("CURRENT_SCHEMA"));
        assert_eq!(params, vec![SqlValue::Text("ORDERS".to_string())]);

        let (sql, params) =
            HanaDialect.columns_query(&QualifiedName::new(Some("SALES".to_string()), "ORDERS"));
        assert!(sql.contains("SCHEMA_NAME = ?"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_decode_column_true_false_encoding() {
        let row = SqlRow::new(
            vec!["COLUMN_NAME", "POSITION", "DATA_TYPE_NAME", "IS_NULLABLE", "DEFAULT_VALUE"],
            vec![
                SqlValue::Text("ID".to_string()),
                SqlValue::Integer(1),
                SqlValue::Text("INTEGER".to_string()),
                SqlValue::Text("FALSE".to_string()),
                SqlValue::Null,
            ],
        );
        let column = HanaDialect.decode_column(&row).unwrap();
        assert_eq!(column.name, "ID");
        assert!(!column.nullable);
        assert!(column.is_required());
    }

    #[test]
    fn test_type_family() {
        assert_eq!(HanaDialect.type_family("BIGINT"), TypeFamily::Integer);
        assert_eq!(HanaDialect.type_family("DECIMAL"), TypeFamily::Decimal);
        assert_eq!(HanaDialect.type_family("SECONDDATE"), TypeFamily::Timestamp);
        assert_eq!(HanaDialect.type_family("NVARCHAR"), TypeFamily::Text);
    }
}
