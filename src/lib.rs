// ==========================================
// 数据库管理工具 - 表数据导入 - 核心库
// ==========================================
// 技术栈: Rust + tokio + rusqlite
// 定位: 命令行数据库管理工具中的批量导入流水线
//   CSV / Excel 文件 → 方言相关的目标表
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 值、记录、元数据与结果
pub mod domain;

// 方言层 - 每种数据库一个策略实现
pub mod dialect;

// 数据库客户端契约与 SQLite 实现
pub mod client;

// 导入层 - 文件读取到批量写入
pub mod importer;

// 配置层 - 导入参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

pub use client::{DatabaseClient, SqlRow, SqliteClient};
pub use config::ImportOptions;
pub use dialect::{strategy_for, DialectStrategy};
pub use domain::types::{Dialect, ExcelCacheMode, FileFormat, MatchMode, TypeFamily};
pub use domain::{ImportResult, RowError};
pub use importer::{ImportError, ImportState, TableImporter};

// ==========================================
// 常量定义
// ==========================================

// 工具版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
