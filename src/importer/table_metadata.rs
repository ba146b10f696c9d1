// ==========================================
// 数据库管理工具 - 表数据导入 - 目标表元数据查询
// ==========================================
// 一次目录查询（由方言提供 SQL 与解码），结果按列位置排序
// 0 行 = 表不存在（致命错误）
// ==========================================

use crate::client::DatabaseClient;
use crate::dialect::DialectStrategy;
use crate::domain::table::{QualifiedName, TableMetadata};
use crate::importer::error::{ImportError, ImportResult};
use tracing::debug;

/// 查询目标表列元数据
///
/// # 参数
/// - client: 已连接的数据库客户端
/// - dialect: 方言策略（目录查询 + 可空性解码）
/// - table: 已解析的限定表名
///
/// # 返回
/// - Ok(TableMetadata): 按目录位置排序的列
/// - Err(TableNotFound): 目录中没有该表的列
pub async fn fetch_table_metadata(
    client: &dyn DatabaseClient,
    dialect: &dyn DialectStrategy,
    table: &QualifiedName,
) -> ImportResult<TableMetadata> {
    let (sql, params) = dialect.columns_query(table);
    let rows = client.exec_sql(&sql, &params).await?;

    if rows.is_empty() {
        return Err(ImportError::TableNotFound(table.to_string()));
    }

    let columns = rows
        .iter()
        .map(|row| dialect.decode_column(row))
        .collect::<ImportResult<Vec<_>>>()?;

    debug!(table = %table, columns = columns.len(), "目标表元数据已加载");
    Ok(TableMetadata::new(table.schema.clone(), table.table.clone(), columns))
}
