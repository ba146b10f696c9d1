// ==========================================
// 数据库管理工具 - 表数据导入 - 批量插入
// ==========================================
// 一批 = 一条多行 INSERT（参数化，占位符由方言决定）
// 故障隔离（二分）:
//   - 显式工作栈保存待尝试的 [start, end) 区间，先处理前半段
//   - 成功: 区间内所有行计入插入数
//   - 单行失败: 记录 (原始行号, 数据库错误)
//   - 多行失败: 在 ceil(len/2) 处拆分后分别重试
// 失败语句会使事务失效的方言（PostgreSQL）用保存点包住每次尝试
// ==========================================

use crate::client::DatabaseClient;
use crate::dialect::DialectStrategy;
use crate::domain::import::{BatchItem, RowError};
use crate::domain::record::SqlValue;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::identifier::quote_identifier;
use tracing::{debug, warn};

const SAVEPOINT_NAME: &str = "table_import_batch";

/// 一批的插入结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub errors: Vec<RowError>,
    /// 实际执行的 INSERT 语句数
    pub statements: usize,
}

/// 生成多行 INSERT 语句
///
/// # 参数
/// - qualified_table: 已加引号的限定表名
/// - columns: 目标列（未加引号）
/// - rows: 行数
pub fn build_insert_sql(
    dialect: &dyn DialectStrategy,
    qualified_table: &str,
    columns: &[String],
    rows: usize,
) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut index = 0usize;
    let tuples = (0..rows)
        .map(|_| {
            let placeholders = columns
                .iter()
                .map(|_| {
                    index += 1;
                    dialect.placeholder(index)
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", placeholders)
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!("INSERT INTO {} ({}) VALUES {}", qualified_table, column_list, tuples)
}

// ==========================================
// BatchInserter
// ==========================================
pub struct BatchInserter<'a> {
    dialect: &'a dyn DialectStrategy,
    qualified_table: String,
    columns: Vec<String>,
}

impl<'a> BatchInserter<'a> {
    pub fn new(dialect: &'a dyn DialectStrategy, qualified_table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            dialect,
            qualified_table: qualified_table.into(),
            columns,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 插入一批，行级失败经二分隔离
    ///
    /// # 返回
    /// - Ok(BatchOutcome): 插入数 / 行级错误 / 语句数
    /// - Err(ImportError): 连接等非语句级错误，或保存点语句本身失败（致命）
    pub async fn insert_batch(&self, client: &dyn DatabaseClient, items: &[BatchItem]) -> ImportResult<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        if items.is_empty() {
            return Ok(outcome);
        }

        let mut pending: Vec<(usize, usize)> = vec![(0, items.len())];
        while let Some((start, end)) = pending.pop() {
            let slice = &items[start..end];
            outcome.statements += 1;

            match self.try_insert(client, slice).await? {
                Ok(()) => outcome.inserted += slice.len(),
                Err(message) if slice.len() == 1 => {
                    debug!(row = slice[0].original_index, error = %message, "行插入失败");
                    outcome.errors.push(RowError {
                        row: slice[0].original_index,
                        error: message,
                    });
                }
                Err(message) => {
                    let mid = start + slice.len().div_ceil(2);
                    debug!(start, end, mid, error = %message, "批插入失败，二分重试");
                    // 后压入的先处理
                    pending.push((mid, end));
                    pending.push((start, mid));
                }
            }
        }

        if !outcome.errors.is_empty() {
            warn!(
                batch = items.len(),
                inserted = outcome.inserted,
                failed = outcome.errors.len(),
                statements = outcome.statements,
                "批内存在插入失败的行"
            );
        }
        Ok(outcome)
    }

    /// 执行一次插入尝试
    ///
    /// 外层 Err 为致命错误；内层 Err 为该次插入被数据库拒绝的信息
    ///
    /// 只有语句级错误（DatabaseQueryError）进入二分路径
    async fn try_insert(
        &self,
        client: &dyn DatabaseClient,
        slice: &[BatchItem],
    ) -> ImportResult<Result<(), String>> {
        let sql = build_insert_sql(self.dialect, &self.qualified_table, &self.columns, slice.len());
        let params: Vec<SqlValue> = slice
            .iter()
            .flat_map(|item| {
                self.columns
                    .iter()
                    .map(|c| item.record.get(c).cloned().unwrap_or(SqlValue::Null))
            })
            .collect();

        let savepoint = self.dialect.needs_statement_savepoint();
        if savepoint {
            exec_control(client, &format!("SAVEPOINT {}", SAVEPOINT_NAME)).await?;
        }

        match client.exec_sql(&sql, &params).await {
            Ok(_) => {
                if savepoint {
                    exec_control(client, &format!("RELEASE SAVEPOINT {}", SAVEPOINT_NAME)).await?;
                }
                Ok(Ok(()))
            }
            Err(ImportError::DatabaseQueryError(message)) => {
                if savepoint {
                    exec_control(client, &format!("ROLLBACK TO SAVEPOINT {}", SAVEPOINT_NAME)).await?;
                    exec_control(client, &format!("RELEASE SAVEPOINT {}", SAVEPOINT_NAME)).await?;
                }
                Ok(Err(message))
            }
            Err(e) => {
                warn!(rows = slice.len(), error = %e, "插入遇到致命错误，终止本批");
                Err(e)
            }
        }
    }
}

async fn exec_control(client: &dyn DatabaseClient, sql: &str) -> ImportResult<()> {
    client
        .exec_sql(sql, &[])
        .await
        .map(|_| ())
        .map_err(|e| ImportError::DatabaseTransactionError(format!("{}: {}", sql, e)))
}
