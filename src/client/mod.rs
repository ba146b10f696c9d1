// ==========================================
// 数据库管理工具 - 表数据导入 - 数据库客户端接口
// ==========================================
// 职责: 导入流程所需的最小客户端契约
//   connect / disconnect / exec_sql(sql, params) / dialect()
// 事务语句 (BEGIN / COMMIT / ROLLBACK) 同样经由 exec_sql 执行
// 实现者: SqliteClient（rusqlite），其他方言由外部提供实现
// ==========================================

pub mod sqlite_client;

use crate::domain::record::SqlValue;
use crate::domain::types::Dialect;
use crate::importer::error::ImportResult;
use async_trait::async_trait;

pub use sqlite_client::SqliteClient;

// ==========================================
// SqlRow - 查询结果行
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct SqlRow {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl SqlRow {
    pub fn new<S: Into<String>>(columns: Vec<S>, values: Vec<SqlValue>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            values,
        }
    }

    /// 按列名取值（优先精确匹配，其次大小写不敏感）
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == column)
            .or_else(|| self.columns.iter().position(|c| c.eq_ignore_ascii_case(column)))?;
        self.values.get(idx)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ==========================================
// DatabaseClient Trait
// ==========================================
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// 目标方言（getKind）
    fn dialect(&self) -> Dialect;

    async fn connect(&mut self) -> ImportResult<()>;

    async fn disconnect(&mut self) -> ImportResult<()>;

    /// 执行 SQL；无结果集的语句返回空 Vec
    async fn exec_sql(&self, sql: &str, params: &[SqlValue]) -> ImportResult<Vec<SqlRow>>;
}
