// ==========================================
// 数据库管理工具 - 表数据导入 - 方言策略层
// ==========================================
// 职责: 每种方言一个策略实现，集中所有方言差异:
//   - 未加引号标识符的大小写折叠
//   - 参数占位符
//   - 列元数据目录查询与可空性解码
//   - 目录类型名 → 类型族 翻译表
//   - 开启事务 / 清空表 语句
// 新增方言 = 新增一个实现，不改动其他组件
// ==========================================

pub mod hana;
pub mod postgres;
pub mod sqlite;

use crate::client::SqlRow;
use crate::domain::record::SqlValue;
use crate::domain::table::{ColumnMetadata, QualifiedName};
use crate::domain::types::{Dialect, TypeFamily};
use crate::importer::error::{ImportError, ImportResult};

pub use hana::HanaDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

// ==========================================
// DialectStrategy Trait
// ==========================================
pub trait DialectStrategy: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// 未加引号标识符的大小写折叠
    fn fold_case(&self, name: &str) -> String;

    /// 第 index 个参数占位符（1 起）
    fn placeholder(&self, index: usize) -> String;

    /// 列元数据查询（SQL + 参数）
    fn columns_query(&self, table: &QualifiedName) -> (String, Vec<SqlValue>);

    /// 解码一行目录查询结果
    fn decode_column(&self, row: &SqlRow) -> ImportResult<ColumnMetadata>;

    /// 目录类型名 → 类型族
    fn type_family(&self, data_type: &str) -> TypeFamily;

    fn begin_sql(&self) -> &'static str;

    fn commit_sql(&self) -> &'static str {
        "COMMIT"
    }

    fn rollback_sql(&self) -> &'static str {
        "ROLLBACK"
    }

    /// 清空表语句（表名已加引号）
    fn truncate_sql(&self, qualified_table: &str) -> String;

    /// 失败语句是否会使整个事务失效（需要用保存点隔离每次插入尝试）
    fn needs_statement_savepoint(&self) -> bool {
        false
    }
}

/// 按方言取策略实现
pub fn strategy_for(dialect: Dialect) -> Box<dyn DialectStrategy> {
    match dialect {
        Dialect::Hana => Box::new(HanaDialect),
        Dialect::Postgres => Box::new(PostgresDialect),
        Dialect::Sqlite => Box::new(SqliteDialect),
    }
}

// ==========================================
// 各方言共用的解码辅助函数
// ==========================================

/// 去掉类型参数: "DECIMAL(10,2)" → "DECIMAL"
pub(crate) fn base_type_name(data_type: &str) -> String {
    data_type
        .split('(')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// 解码布尔标志: 'TRUE'/'YES'/'Y'/1 → true, 'FALSE'/'NO'/'N'/0 → false
pub(crate) fn decode_flag(value: &SqlValue) -> Option<bool> {
    match value {
        SqlValue::Boolean(b) => Some(*b),
        SqlValue::Integer(i) => Some(*i != 0),
        SqlValue::Text(s) => match s.trim().to_uppercase().as_str() {
            "TRUE" | "YES" | "Y" | "1" => Some(true),
            "FALSE" | "NO" | "N" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// 读取必需的目录字段
pub(crate) fn required_field<'a>(row: &'a SqlRow, column: &str) -> ImportResult<&'a SqlValue> {
    row.get(column).ok_or_else(|| {
        ImportError::DatabaseQueryError(format!("目录查询结果缺少字段: {}", column))
    })
}

/// 读取必需的文本目录字段
pub(crate) fn required_text(row: &SqlRow, column: &str) -> ImportResult<String> {
    required_field(row, column)?.to_text().ok_or_else(|| {
        ImportError::DatabaseQueryError(format!("目录查询字段为空: {}", column))
    })
}

/// 读取必需的整数目录字段
pub(crate) fn required_i64(row: &SqlRow, column: &str) -> ImportResult<i64> {
    let value = required_field(row, column)?;
    value.as_i64().ok_or_else(|| {
        ImportError::DatabaseQueryError(format!("目录查询字段不是整数: {}={}", column, value))
    })
}

/// 读取可空的文本目录字段
pub(crate) fn optional_text(row: &SqlRow, column: &str) -> Option<String> {
    row.get(column).and_then(|v| v.to_text())
}
