// ==========================================
// 数据库管理工具 - 表数据导入 - 领域模型层
// ==========================================
// 职责: 定义导入过程中的值、记录、表元数据与结果类型
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod import;
pub mod record;
pub mod table;
pub mod types;

// 重导出核心类型
pub use import::{BatchItem, ColumnMapping, ConvertedRecord, ImportResult, RowError, RowErrorLog};
pub use record::{CellValue, SourceRecord, SqlValue};
pub use table::{ColumnMetadata, QualifiedName, TableMetadata};
pub use types::{Dialect, ExcelCacheMode, FileFormat, MatchMode, TypeFamily};
