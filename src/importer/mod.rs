// ==========================================
// 数据库管理工具 - 导入层
// ==========================================
// 职责: 文件 → 目标表的批量导入
// 支持: CSV / Excel (.xlsx)；HANA / PostgreSQL / SQLite
// ==========================================
// 组件（由底向上）:
//   file_parser     - 文件记录源（流式读取）
//   identifier      - 标识符解析 / 加引号 / 大小写折叠
//   table_metadata  - 目标表列元数据
//   column_matcher  - 文件列 ↔ 目标列匹配
//   type_coercer    - 原始值 → 定型值
//   batch_inserter  - 多行 INSERT + 二分故障隔离
//   table_importer  - 事务边界与状态机
// ==========================================

pub mod batch_inserter;
pub mod column_matcher;
pub mod error;
pub mod file_parser;
pub mod identifier;
pub mod table_importer;
pub mod table_metadata;
pub mod type_coercer;

// 重导出核心类型
pub use batch_inserter::{build_insert_sql, BatchInserter, BatchOutcome};
pub use column_matcher::{match_columns, validate_required_columns};
pub use error::{ImportError, ImportResult};
pub use file_parser::{open_source, FileRecordSource, RecordSource, SourceOptions};
pub use identifier::{parse_table_name, quote_identifier, split_qualified_name};
pub use table_importer::{ImportState, TableImporter};
pub use table_metadata::fetch_table_metadata;
pub use type_coercer::TypeCoercer;
