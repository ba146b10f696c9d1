// ==========================================
// 数据库管理工具 - 表数据导入 - 导入参数
// ==========================================
// 来源: JSON 配置文件（camelCase 键）+ 命令行覆写
// 校验: 在打开文件、读取任何行之前完成
// ==========================================

use crate::domain::types::{ExcelCacheMode, FileFormat, MatchMode};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::SourceOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 默认批大小
pub const DEFAULT_BATCH_SIZE: i64 = 1000;

/// 批大小上限
pub const MAX_BATCH_SIZE: i64 = 10_000;

/// xlsx 工作表行数上限（起始行不能超过）
pub const MAX_START_ROW: i64 = 1_048_576;

/// 结果中保留的错误明细上限
pub const MAX_REPORTED_ERRORS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportOptions {
    pub filename: String,
    /// [schema.]table，各段可加引号
    pub table: String,
    /// 文件格式（csv / excel）
    pub output: FileFormat,
    pub match_mode: MatchMode,
    pub truncate: bool,
    pub batch_size: i64,
    pub worksheet: i64,
    pub start_row: i64,
    pub skip_empty_rows: bool,
    pub excel_cache_mode: ExcelCacheMode,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            filename: String::new(),
            table: String::new(),
            output: FileFormat::Csv,
            match_mode: MatchMode::Auto,
            truncate: false,
            batch_size: DEFAULT_BATCH_SIZE,
            worksheet: 1,
            start_row: 1,
            skip_empty_rows: true,
            excel_cache_mode: ExcelCacheMode::Cache,
        }
    }
}

impl ImportOptions {
    pub fn new(filename: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            table: table.into(),
            ..Self::default()
        }
    }

    /// 从 JSON 文件加载
    pub fn from_json_file(path: impl AsRef<Path>) -> ImportResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ImportError::InvalidOption {
            option: "config".to_string(),
            message: format!("{}: {}", path.as_ref().display(), e),
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> ImportResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// 校验参数
    pub fn validate(&self) -> ImportResult<()> {
        if !(1..=MAX_BATCH_SIZE).contains(&self.batch_size) {
            return Err(ImportError::InvalidBatchSize(self.batch_size));
        }
        if self.filename.trim().is_empty() {
            return Err(invalid("filename", "文件名不能为空"));
        }
        if self.table.trim().is_empty() {
            return Err(invalid("table", "表名不能为空"));
        }
        if self.worksheet < 1 {
            return Err(invalid("worksheet", format!("工作表序号必须从 1 开始: {}", self.worksheet)));
        }
        if self.start_row < 1 {
            return Err(invalid("startRow", format!("起始行必须从 1 开始: {}", self.start_row)));
        }
        if self.start_row > MAX_START_ROW {
            return Err(invalid(
                "startRow",
                format!("起始行超出工作表行数上限 {}: {}", MAX_START_ROW, self.start_row),
            ));
        }
        Ok(())
    }

    /// 已校验的批大小
    pub fn batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH_SIZE) as usize
    }

    pub fn source_options(&self) -> SourceOptions {
        SourceOptions {
            format: self.output,
            worksheet: self.worksheet.max(1) as usize,
            start_row: self.start_row.max(1) as usize,
            skip_empty_rows: self.skip_empty_rows,
            excel_cache_mode: self.excel_cache_mode,
        }
    }
}

fn invalid(option: &str, message: impl Into<String>) -> ImportError {
    ImportError::InvalidOption {
        option: option.to_string(),
        message: message.into(),
    }
}
