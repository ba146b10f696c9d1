// ==========================================
// 数据库管理工具 - 表数据导入 - SQLite 客户端实现
// ==========================================
// 工具: rusqlite（bundled）
// 说明: 连接在 connect() 时打开，统一应用 db.rs 中的 PRAGMA
// ==========================================

use crate::client::{DatabaseClient, SqlRow};
use crate::db::open_sqlite_connection;
use crate::domain::record::SqlValue;
use crate::domain::types::Dialect;
use crate::importer::error::{ImportError, ImportResult};
use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use std::sync::{Arc, Mutex};
use tracing::debug;

// ==========================================
// SqlValue ↔ rusqlite 值转换
// ==========================================
impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            SqlValue::Boolean(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Date(d) => ToSqlOutput::Owned(Value::Text(d.format("%Y-%m-%d").to_string())),
            SqlValue::Timestamp(ts) => ToSqlOutput::Owned(Value::Text(
                ts.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            )),
        })
    }
}

fn from_value_ref(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(s) => SqlValue::Text(String::from_utf8_lossy(s).into_owned()),
        ValueRef::Blob(b) => SqlValue::Text(format!("<blob {} bytes>", b.len())),
    }
}

// ==========================================
// SqliteClient
// ==========================================
pub struct SqliteClient {
    db_path: String,
    conn: Option<Arc<Mutex<Connection>>>,
}

impl SqliteClient {
    /// 创建客户端（尚未连接）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            conn: None,
        }
    }

    /// 使用已有连接（连接视为已建立）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ImportResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| ImportError::DatabaseConnectionError(format!("锁获取失败: {}", e)))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }
        Ok(Self {
            db_path: String::new(),
            conn: Some(conn),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn connection(&self) -> ImportResult<&Arc<Mutex<Connection>>> {
        self.conn
            .as_ref()
            .ok_or_else(|| ImportError::DatabaseConnectionError("尚未连接数据库".to_string()))
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn connect(&mut self) -> ImportResult<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        let conn = open_sqlite_connection(&self.db_path).map_err(|e| {
            ImportError::DatabaseConnectionError(format!("{}: {}", self.db_path, e))
        })?;
        debug!(db_path = %self.db_path, "SQLite 连接已打开");
        self.conn = Some(Arc::new(Mutex::new(conn)));
        Ok(())
    }

    async fn disconnect(&mut self) -> ImportResult<()> {
        if self.conn.take().is_some() {
            debug!(db_path = %self.db_path, "SQLite 连接已关闭");
        }
        Ok(())
    }

    async fn exec_sql(&self, sql: &str, params: &[SqlValue]) -> ImportResult<Vec<SqlRow>> {
        let conn = self
            .connection()?
            .lock()
            .map_err(|e| ImportError::DatabaseConnectionError(format!("锁获取失败: {}", e)))?;

        let mut stmt = conn.prepare(sql)?;
        if stmt.column_count() == 0 {
            stmt.execute(params_from_iter(params.iter()))?;
            return Ok(Vec::new());
        }

        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                values.push(from_value_ref(row.get_ref(i)?));
            }
            result.push(SqlRow::new(columns.clone(), values));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_exec_sql_roundtrip() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut client = SqliteClient::new(temp_file.path().to_str().unwrap());
        client.connect().await.unwrap();

        client
            .exec_sql("CREATE TABLE t (id INTEGER, d DATE, flag BOOLEAN)", &[])
            .await
            .unwrap();
        client
            .exec_sql(
                "INSERT INTO t (id, d, flag) VALUES (?, ?, ?)",
                &[
                    SqlValue::Integer(1),
                    SqlValue::Date(NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()),
                    SqlValue::Boolean(true),
                ],
            )
            .await
            .unwrap();

        let rows = client.exec_sql("SELECT id, d, flag FROM t", &[]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&SqlValue::Integer(1)));
        assert_eq!(rows[0].get("d"), Some(&SqlValue::Text("2025-01-20".to_string())));
        assert_eq!(rows[0].get("flag"), Some(&SqlValue::Integer(1)));

        client.disconnect().await.unwrap();
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_exec_sql_requires_connection() {
        let client = SqliteClient::new("unused.db");
        let result = client.exec_sql("SELECT 1", &[]).await;
        assert!(matches!(result, Err(ImportError::DatabaseConnectionError(_))));
    }

    #[tokio::test]
    async fn test_connect_missing_database_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing.db");
        let mut client = SqliteClient::new(path.to_str().unwrap());
        let result = client.connect().await;
        assert!(matches!(result, Err(ImportError::DatabaseConnectionError(_))));
        assert!(!client.is_connected());
    }
}
