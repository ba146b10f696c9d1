// ==========================================
// 数据库管理工具 - 表数据导入 - 导入编排
// ==========================================
// 流程:
//   校验参数 → 连接 → 解析表名 → 查询元数据 → 打开记录源
//   → BEGIN → [清空表] → 逐条读取/转换/攒批写入 → COMMIT
// 状态: Pending → Connected → Introspected → MappingEstablished
//       → Streaming → Committing → Completed | Failed
// 红线:
// - 任何致命错误在 BEGIN 之后都先 ROLLBACK 再向上传播
// - 文件中没有数据行时 ROLLBACK（包括清空表）
// - 两条出口都关闭记录源并断开连接
// ==========================================

use crate::client::DatabaseClient;
use crate::config::{ImportOptions, MAX_REPORTED_ERRORS};
use crate::dialect::{strategy_for, DialectStrategy};
use crate::domain::import::{BatchItem, RowErrorLog};
use crate::domain::table::{QualifiedName, TableMetadata};
use crate::importer::batch_inserter::BatchInserter;
use crate::importer::column_matcher::{match_columns, validate_required_columns};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{open_source, RecordSource};
use crate::importer::identifier::{parse_table_name, qualified_sql};
use crate::importer::table_metadata::fetch_table_metadata;
use crate::importer::type_coercer::{describe_row_errors, TypeCoercer};
use std::fmt;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// ImportState - 导入状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    Pending,
    Connected,
    Introspected,
    MappingEstablished,
    Streaming,
    Committing,
    Completed,
    Failed,
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportState::Pending => "PENDING",
            ImportState::Connected => "CONNECTED",
            ImportState::Introspected => "INTROSPECTED",
            ImportState::MappingEstablished => "MAPPING_ESTABLISHED",
            ImportState::Streaming => "STREAMING",
            ImportState::Committing => "COMMITTING",
            ImportState::Completed => "COMPLETED",
            ImportState::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

/// 事务内的累计统计
struct RunStats {
    rows_processed: usize,
    rows_inserted: usize,
    batches: usize,
    statements: usize,
    truncated: bool,
    errors: RowErrorLog,
}

impl RunStats {
    fn new() -> Self {
        Self {
            rows_processed: 0,
            rows_inserted: 0,
            batches: 0,
            statements: 0,
            truncated: false,
            errors: RowErrorLog::new(MAX_REPORTED_ERRORS),
        }
    }
}

// ==========================================
// TableImporter - 导入编排器
// ==========================================
pub struct TableImporter<C: DatabaseClient> {
    client: C,
    options: ImportOptions,
    state: ImportState,
    run_id: Uuid,
}

impl<C: DatabaseClient> TableImporter<C> {
    /// 创建导入器
    ///
    /// # 参数
    /// - client: 未连接的数据库客户端（run 内部负责连接与断开）
    /// - options: 导入参数
    pub fn new(client: C, options: ImportOptions) -> Self {
        Self {
            client,
            options,
            state: ImportState::Pending,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    fn transition(&mut self, next: ImportState) {
        debug!(from = %self.state, to = %next, "导入状态变更");
        self.state = next;
    }

    /// 执行导入
    ///
    /// # 返回
    /// - Ok(ImportResult): 导入完成（可能含行级错误，或文件无数据）
    /// - Err(ImportError): 致命错误（事务已回滚）
    #[instrument(
        name = "table_import",
        skip(self),
        fields(run_id = %self.run_id, table = %self.options.table, file = %self.options.filename)
    )]
    pub async fn run(&mut self) -> ImportResult<crate::domain::import::ImportResult> {
        // 参数校验在连接与打开文件之前
        if let Err(e) = self.options.validate() {
            self.transition(ImportState::Failed);
            error!(error = %e, "导入参数无效");
            return Err(e);
        }

        info!(
            format = %self.options.output,
            match_mode = %self.options.match_mode,
            batch_size = self.options.batch_size,
            truncate = self.options.truncate,
            "开始导入"
        );

        let dialect = strategy_for(self.client.dialect());
        if let Err(e) = self.client.connect().await {
            self.transition(ImportState::Failed);
            error!(error = %e, "数据库连接失败");
            return Err(e);
        }
        self.transition(ImportState::Connected);

        let result = self.run_connected(dialect.as_ref()).await;

        if let Err(e) = self.client.disconnect().await {
            warn!(error = %e, "断开数据库连接失败");
        }

        match &result {
            Ok(summary) => {
                self.transition(ImportState::Completed);
                info!(
                    success = summary.success,
                    rows_processed = summary.rows_processed,
                    rows_inserted = summary.rows_inserted,
                    rows_with_errors = summary.rows_with_errors,
                    no_data = summary.no_data,
                    "导入完成"
                );
            }
            Err(e) => {
                self.transition(ImportState::Failed);
                error!(error = %e, "导入失败");
            }
        }
        result
    }

    async fn run_connected(
        &mut self,
        dialect: &dyn DialectStrategy,
    ) -> ImportResult<crate::domain::import::ImportResult> {
        debug!("步骤 1: 解析表名");
        let table = parse_table_name(&self.options.table, dialect)?;

        debug!(table = %table, "步骤 2: 查询目标表元数据");
        let metadata = fetch_table_metadata(&self.client, dialect, &table).await?;
        self.transition(ImportState::Introspected);
        info!(table = %table, columns = metadata.columns.len(), "目标表元数据已加载");

        debug!("步骤 3: 打开记录源");
        let mut source = open_source(&self.options.filename, &self.options.source_options())?;

        let outcome = self
            .run_transaction(dialect, &table, &metadata, source.as_mut())
            .await;
        source.close();
        outcome
    }

    async fn run_transaction(
        &mut self,
        dialect: &dyn DialectStrategy,
        table: &QualifiedName,
        metadata: &TableMetadata,
        source: &mut dyn RecordSource,
    ) -> ImportResult<crate::domain::import::ImportResult> {
        debug!("步骤 4: 开启事务");
        self.exec_control(dialect.begin_sql()).await?;

        let streamed = self.stream_rows(dialect, table, metadata, source).await;

        let stats = match streamed {
            Ok(stats) => stats,
            Err(e) => {
                self.rollback(dialect).await;
                return Err(e);
            }
        };

        if stats.rows_processed == 0 {
            warn!(table = %table, "文件中没有数据行，回滚事务");
            self.rollback(dialect).await;
            return Ok(self.build_result(table, RunStats::new(), true));
        }

        self.transition(ImportState::Committing);
        if let Err(e) = self.exec_control(dialect.commit_sql()).await {
            self.rollback(dialect).await;
            return Err(e);
        }

        info!(
            batches = stats.batches,
            statements = stats.statements,
            "事务已提交"
        );
        Ok(self.build_result(table, stats, false))
    }

    async fn stream_rows(
        &mut self,
        dialect: &dyn DialectStrategy,
        table: &QualifiedName,
        metadata: &TableMetadata,
        source: &mut dyn RecordSource,
    ) -> ImportResult<RunStats> {
        let mut stats = RunStats::new();
        let qualified = qualified_sql(table);

        if self.options.truncate {
            debug!(table = %table, "步骤 5: 清空目标表");
            self.exec_control(&dialect.truncate_sql(&qualified)).await?;
            stats.truncated = true;
        }

        let Some(first) = source.next_record().await? else {
            return Ok(stats);
        };

        debug!("步骤 6: 建立列映射");
        let file_columns: Vec<&str> = first.keys().collect();
        let mapping = match_columns(&file_columns, metadata, self.options.match_mode)?;
        validate_required_columns(&mapping, metadata)?;
        self.transition(ImportState::MappingEstablished);
        info!(mapped = mapping.len(), file_columns = file_columns.len(), "列映射已确定");

        let coercer = TypeCoercer::new(metadata, dialect);
        let inserter = BatchInserter::new(dialect, qualified, mapping.destination_columns());
        let batch_size = self.options.batch_size();
        let mut batch: Vec<BatchItem> = Vec::with_capacity(batch_size);

        debug!("步骤 7: 读取并写入数据");
        self.transition(ImportState::Streaming);

        let mut pending = Some(first);
        loop {
            let record = match pending.take() {
                Some(record) => record,
                None => match source.next_record().await? {
                    Some(record) => record,
                    None => break,
                },
            };
            stats.rows_processed += 1;
            let row = stats.rows_processed;

            match coercer.convert(&record, &mapping, row) {
                Ok(converted) => batch.push(BatchItem {
                    record: converted,
                    original_index: row,
                }),
                Err(errors) => {
                    let message = describe_row_errors(&errors);
                    debug!(row, error = %message, "行转换失败");
                    stats.errors.record(row, message);
                }
            }

            if batch.len() >= batch_size {
                self.flush(&inserter, &mut batch, &mut stats).await?;
            }
        }
        self.flush(&inserter, &mut batch, &mut stats).await?;

        Ok(stats)
    }

    async fn flush(
        &self,
        inserter: &BatchInserter<'_>,
        batch: &mut Vec<BatchItem>,
        stats: &mut RunStats,
    ) -> ImportResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let outcome = inserter.insert_batch(&self.client, batch).await?;
        stats.batches += 1;
        stats.statements += outcome.statements;
        stats.rows_inserted += outcome.inserted;
        for err in outcome.errors {
            stats.errors.record(err.row, err.error);
        }

        debug!(
            batch = stats.batches,
            size = batch.len(),
            inserted = outcome.inserted,
            total_inserted = stats.rows_inserted,
            "批次已写入"
        );
        batch.clear();
        Ok(())
    }

    async fn exec_control(&self, sql: &str) -> ImportResult<()> {
        self.client
            .exec_sql(sql, &[])
            .await
            .map(|_| ())
            .map_err(|e| ImportError::DatabaseTransactionError(format!("{}: {}", sql, e)))
    }

    /// 回滚失败只记录日志，保留原始错误
    async fn rollback(&self, dialect: &dyn DialectStrategy) {
        match self.exec_control(dialect.rollback_sql()).await {
            Ok(()) => debug!("事务已回滚"),
            Err(e) => warn!(error = %e, "事务回滚失败"),
        }
    }

    fn build_result(
        &self,
        table: &QualifiedName,
        stats: RunStats,
        no_data: bool,
    ) -> crate::domain::import::ImportResult {
        let rows_with_errors = stats.errors.total();
        let (errors, truncation_notice) = stats.errors.into_parts();

        crate::domain::import::ImportResult {
            success: !no_data && rows_with_errors == 0,
            rows_processed: stats.rows_processed,
            rows_inserted: stats.rows_inserted,
            rows_with_errors,
            table: table.to_string(),
            match_mode: self.options.match_mode,
            truncated: stats.truncated,
            batch_size: self.options.batch_size(),
            errors,
            truncation_notice,
            no_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SqlRow;
    use crate::domain::record::SqlValue;
    use crate::domain::types::Dialect;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::{Builder, NamedTempFile};

    /// HANA 方言的脚本化客户端：目录查询返回固定列，其他语句只记录
    struct ScriptedHanaClient {
        log: Arc<Mutex<Vec<String>>>,
        connected: Arc<Mutex<bool>>,
        fail_insert: bool,
    }

    #[async_trait]
    impl DatabaseClient for ScriptedHanaClient {
        fn dialect(&self) -> Dialect {
            Dialect::Hana
        }

        async fn connect(&mut self) -> ImportResult<()> {
            *self.connected.lock().unwrap() = true;
            Ok(())
        }

        async fn disconnect(&mut self) -> ImportResult<()> {
            *self.connected.lock().unwrap() = false;
            Ok(())
        }

        async fn exec_sql(&self, sql: &str, params: &[SqlValue]) -> ImportResult<Vec<SqlRow>> {
            self.log.lock().unwrap().push(sql.to_string());
            if sql.contains("SYS.TABLE_COLUMNS") {
                assert!(!params.is_empty());
                let columns = vec!["COLUMN_NAME", "POSITION", "DATA_TYPE_NAME", "IS_NULLABLE", "DEFAULT_VALUE"];
                return Ok(vec![
                    SqlRow::new(
                        columns.clone(),
                        vec![
                            SqlValue::Text("ID".to_string()),
                            SqlValue::Integer(1),
                            SqlValue::Text("INTEGER".to_string()),
                            SqlValue::Text("FALSE".to_string()),
                            SqlValue::Null,
                        ],
                    ),
                    SqlRow::new(
                        columns,
                        vec![
                            SqlValue::Text("NAME".to_string()),
                            SqlValue::Integer(2),
                            SqlValue::Text("NVARCHAR".to_string()),
                            SqlValue::Text("TRUE".to_string()),
                            SqlValue::Null,
                        ],
                    ),
                ]);
            }
            if self.fail_insert && sql.starts_with("INSERT") {
                return Err(ImportError::DatabaseConnectionError("connection reset".to_string()));
            }
            Ok(Vec::new())
        }
    }

    fn scripted(fail_insert: bool) -> (ScriptedHanaClient, Arc<Mutex<Vec<String>>>, Arc<Mutex<bool>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let connected = Arc::new(Mutex::new(false));
        (
            ScriptedHanaClient {
                log: log.clone(),
                connected: connected.clone(),
                fail_insert,
            },
            log,
            connected,
        )
    }

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_hana_statement_sequence() {
        let file = write_csv("id,name\n1,Alice\n2,Bob\n");
        let (client, log, connected) = scripted(false);
        let options = ImportOptions {
            truncate: true,
            ..ImportOptions::new(file.path().to_str().unwrap(), "app.people")
        };

        let mut importer = TableImporter::new(client, options);
        let result = importer.run().await.unwrap();
        assert_eq!(importer.state(), ImportState::Completed);
        assert!(!*connected.lock().unwrap());

        assert!(result.success);
        assert_eq!(result.table, "APP.PEOPLE");
        assert_eq!(result.rows_inserted, 2);

        let statements = log.lock().unwrap().clone();
        assert!(statements[0].contains("SYS.TABLE_COLUMNS"));
        assert_eq!(statements[1], "BEGIN TRANSACTION");
        assert_eq!(statements[2], "TRUNCATE TABLE \"APP\".\"PEOPLE\"");
        assert_eq!(
            statements[3],
            "INSERT INTO \"APP\".\"PEOPLE\" (\"ID\", \"NAME\") VALUES (?, ?), (?, ?)"
        );
        assert_eq!(statements[4], "COMMIT");
    }

    #[tokio::test]
    async fn test_connection_error_during_insert_rolls_back() {
        let file = write_csv("ID,NAME\n1,Alice\n2,Bob\n3,Carol\n4,Dave\n");
        let (client, log, connected) = scripted(true);
        let mut importer = TableImporter::new(client, ImportOptions::new(file.path().to_str().unwrap(), "T"));

        let err = importer.run().await.unwrap_err();
        assert!(matches!(err, ImportError::DatabaseConnectionError(_)));
        assert_eq!(importer.state(), ImportState::Failed);
        assert!(!*connected.lock().unwrap());

        let statements = log.lock().unwrap().clone();
        assert_eq!(statements.iter().filter(|s| s.starts_with("INSERT")).count(), 1);
        assert!(!statements.iter().any(|s| s == "COMMIT"));
        assert_eq!(statements.last().unwrap(), "ROLLBACK");
    }

    #[tokio::test]
    async fn test_missing_file_fails_before_begin() {
        let (client, log, connected) = scripted(false);
        let mut importer = TableImporter::new(client, ImportOptions::new("/nonexistent/data.csv", "T"));
        let err = importer.run().await.unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));
        assert_eq!(importer.state(), ImportState::Failed);
        assert!(!*connected.lock().unwrap());
        assert!(!log.lock().unwrap().iter().any(|s| s.starts_with("BEGIN")));
    }

    #[tokio::test]
    async fn test_required_column_missing_rolls_back() {
        let file = write_csv("NAME\nAlice\n");
        let (client, log, _) = scripted(false);
        let mut importer = TableImporter::new(client, ImportOptions::new(file.path().to_str().unwrap(), "T"));
        let err = importer.run().await.unwrap_err();
        assert!(matches!(err, ImportError::MissingRequiredColumns(ref cols) if cols == &vec!["ID".to_string()]));

        let statements = log.lock().unwrap().clone();
        assert!(!statements.iter().any(|s| s.starts_with("INSERT")));
        assert_eq!(statements.last().unwrap(), "ROLLBACK");
    }

    #[tokio::test]
    async fn test_invalid_batch_size_never_connects() {
        let (client, log, _) = scripted(false);
        let options = ImportOptions {
            batch_size: 0,
            ..ImportOptions::new("/nonexistent/data.csv", "T")
        };
        let mut importer = TableImporter::new(client, options);
        assert!(matches!(importer.run().await, Err(ImportError::InvalidBatchSize(0))));
        assert!(log.lock().unwrap().is_empty());
    }
}
