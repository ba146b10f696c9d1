// ==========================================
// PostgreSQL 方言
// ==========================================
// 目录: information_schema.columns，is_nullable 为 'YES'/'NO'
// 未指定 schema 时使用 current_schema()
// 失败语句会使事务进入 aborted 状态，插入尝试需要保存点隔离
// ==========================================

use super::{base_type_name, decode_flag, optional_text, required_field, required_i64, required_text};
use crate::client::SqlRow;
use crate::dialect::DialectStrategy;
use crate::domain::record::SqlValue;
use crate::domain::table::{ColumnMetadata, QualifiedName};
use crate::domain::types::{Dialect, TypeFamily};
use crate::importer::error::{ImportError, ImportResult};

pub struct PostgresDialect;

impl DialectStrategy for PostgresDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn fold_case(&self, name: &str) -> String {
        name.to_lowercase()
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn columns_query(&self, table: &QualifiedName) -> (String, Vec<SqlValue>) {
        let base = r#"
            SELECT column_name, ordinal_position, data_type, is_nullable, column_default
            FROM information_schema.columns
            WHERE"#;
        match &table.schema {
            Some(schema) => (
                format!("{} table_schema = $1 AND table_name = $2 ORDER BY ordinal_position", base),
                vec![SqlValue::Text(schema.clone()), SqlValue::Text(table.table.clone())],
            ),
            None => (
                format!(
                    "{} table_schema = current_schema() AND table_name = $1 ORDER BY ordinal_position",
                    base
                ),
                vec![SqlValue::Text(table.table.clone())],
            ),
        }
    }

    fn decode_column(&self, row: &SqlRow) -> ImportResult<ColumnMetadata> {
        let nullable_raw = required_field(row, "is_nullable")?;
        let nullable = decode_flag(nullable_raw).ok_or_else(|| {
            ImportError::DatabaseQueryError(format!("无法识别的 is_nullable 值: {}", nullable_raw))
        })?;

        Ok(ColumnMetadata {
            name: required_text(row, "column_name")?,
            position: required_i64(row, "ordinal_position")?,
            data_type: required_text(row, "data_type")?,
            nullable,
            default_value: optional_text(row, "column_default"),
        })
    }

    fn type_family(&self, data_type: &str) -> TypeFamily {
        let base = base_type_name(data_type).to_lowercase();
        match base.as_str() {
            "smallint" | "integer" | "bigint" | "int" | "int2" | "int4" | "int8" | "smallserial"
            | "serial" | "bigserial" => TypeFamily::Integer,
            "numeric" | "decimal" | "real" | "double precision" | "float4" | "float8" => {
                TypeFamily::Decimal
            }
            "boolean" | "bool" => TypeFamily::Boolean,
            "date" => TypeFamily::Date,
            t if t.starts_with("timestamp") => TypeFamily::Timestamp,
            _ => TypeFamily::Text,
        }
    }

    fn begin_sql(&self) -> &'static str {
        "BEGIN"
    }

    fn truncate_sql(&self, qualified_table: &str) -> String {
        format!("TRUNCATE TABLE {}", qualified_table)
    }

    fn needs_statement_savepoint(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_are_numbered() {
        assert_eq!(PostgresDialect.placeholder(1), "$1");
        assert_eq!(PostgresDialect.placeholder(12), "$12");
    }

    #[test]
    fn test_decode_column_yes_no_encoding() {
        let row = SqlRow::new(
            vec!["column_name", "ordinal_position", "data_type", "is_nullable", "column_default"],
            vec![
                SqlValue::Text("created_at".to_string()),
                SqlValue::Integer(3),
                SqlValue::Text("timestamp without time zone".to_string()),
                SqlValue::Text("NO".to_string()),
                SqlValue::Text("now()".to_string()),
            ],
        );
        let column = PostgresDialect.decode_column(&row).unwrap();
        assert_eq!(column.position, 3);
        assert!(!column.nullable);
        assert!(!column.is_required());
        assert_eq!(PostgresDialect.type_family(&column.data_type), TypeFamily::Timestamp);
    }

    #[test]
    fn test_type_family() {
        assert_eq!(PostgresDialect.type_family("double precision"), TypeFamily::Decimal);
        assert_eq!(PostgresDialect.type_family("numeric(10,2)"), TypeFamily::Decimal);
        assert_eq!(PostgresDialect.type_family("boolean"), TypeFamily::Boolean);
        assert_eq!(PostgresDialect.type_family("character varying"), TypeFamily::Text);
    }
}
