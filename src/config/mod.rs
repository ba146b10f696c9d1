// ==========================================
// 数据库管理工具 - 配置层
// ==========================================
// 职责: 导入参数的默认值、加载与校验
// 存储: JSON 配置文件（可选），命令行参数覆写
// ==========================================

pub mod import_options;

pub use import_options::{ImportOptions, DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE, MAX_REPORTED_ERRORS};
