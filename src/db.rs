// ==========================================
// 数据库管理工具 - SQLite 连接初始化
// ==========================================
// 导入只面向已存在的目标表:
// - 数据库文件必须已存在，路径写错时不会静默创建空库
// - 外键约束开启，违反外键的行按行级插入错误上报
// - busy_timeout 覆盖整个导入事务期间的写锁等待
// ==========================================

use rusqlite::{Connection, OpenFlags};
use std::time::Duration;

/// 写锁等待上限（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 为导入连接设置 PRAGMA（每个连接单独生效）
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 以读写方式打开已存在的数据库
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(db_path, flags)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_import_connection_pragmas() {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = open_sqlite_connection(temp_file.path().to_str().unwrap()).unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
        let timeout: i64 = conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, DEFAULT_BUSY_TIMEOUT_MS as i64);
    }

    #[test]
    fn test_missing_database_not_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("typo.db");
        assert!(open_sqlite_connection(path.to_str().unwrap()).is_err());
        assert!(!path.exists());
    }
}
