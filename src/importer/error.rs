// ==========================================
// 数据库管理工具 - 表数据导入 - 错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 致命错误（校验/连接/意外）回滚并向上传播；
//       行级错误（类型转换/插入失败）在本地恢复，仅出现在结果中
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件路径无效: {0}")]
    InvalidPath(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("工作表不存在: 第 {requested} 个（共 {available} 个）")]
    WorksheetNotFound { requested: usize, available: usize },

    // ===== 标识符 / 表名错误 =====
    #[error("标识符无效: {0}")]
    InvalidIdentifier(String),

    #[error("表名无法解析: {0}")]
    InvalidTableName(String),

    #[error("表不存在或没有列: {0}")]
    TableNotFound(String),

    // ===== 映射校验错误 =====
    #[error("没有任何文件列能匹配到目标表的列")]
    NoColumnsMatched,

    #[error("缺少必填列: {}", .0.join(", "))]
    MissingRequiredColumns(Vec<String>),

    // ===== 参数错误 =====
    #[error("批大小无效: {0}（必须在 1 到 10000 之间）")]
    InvalidBatchSize(i64),

    #[error("参数无效 ({option}): {message}")]
    InvalidOption { option: String, message: String },

    // ===== 行级错误 =====
    #[error("类型转换失败 (行 {row}, 字段 {field}): {message}")]
    TypeConversionError {
        row: usize,
        field: String,
        message: String,
    },

    // ===== 数据库错误 =====
    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否为行级错误（不终止导入）
    pub fn is_row_scoped(&self) -> bool {
        matches!(self, ImportError::TypeConversionError { .. })
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => ImportError::DatabaseQueryError(msg),
            _ => ImportError::DatabaseQueryError(err.to_string()),
        }
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::XlsxError>
impl From<calamine::XlsxError> for ImportError {
    fn from(err: calamine::XlsxError) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::InvalidOption {
            option: "config".to_string(),
            message: err.to_string(),
        }
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
