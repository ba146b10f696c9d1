// ==========================================
// 数据库管理工具 - 表数据导入 - 导入过程实体
// ==========================================
// ColumnMapping: 首条记录确定后冻结的列映射
// ConvertedRecord / BatchItem: 定型后的行及其原始行号
// ImportResult: 导入结果汇总（错误明细有上限）
// ==========================================

use crate::domain::record::SqlValue;
use crate::domain::types::MatchMode;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ColumnMapping - 文件列 → 目标列
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pairs: Vec<(String, String)>,
}

impl ColumnMapping {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// (文件列, 目标列)，按文件列顺序
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn destination_for(&self, source: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(s, _)| s == source)
            .map(|(_, d)| d.as_str())
    }

    /// 去重后的目标列（首次出现顺序），即 INSERT 列清单
    pub fn destination_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::with_capacity(self.pairs.len());
        for (_, dest) in &self.pairs {
            if !columns.contains(dest) {
                columns.push(dest.clone());
            }
        }
        columns
    }

    pub fn contains_destination(&self, column: &str) -> bool {
        self.pairs.iter().any(|(_, d)| d == column)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

// ==========================================
// ConvertedRecord - 目标列 → 定型值
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertedRecord {
    values: Vec<(String, SqlValue)>,
}

impl ConvertedRecord {
    /// 写入目标列值；同一目标列再次写入时覆盖旧值
    pub fn set(&mut self, column: impl Into<String>, value: SqlValue) {
        let column = column.into();
        match self.values.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.values.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ==========================================
// BatchItem - 待插入行
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub record: ConvertedRecord,
    /// 文件中的数据行序号（1 起），仅用于错误归属
    pub original_index: usize,
}

// ==========================================
// RowError - 行级错误
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub error: String,
}

// ==========================================
// RowErrorLog - 行级错误收集器
// ==========================================
// 计数不设上限，明细只保留前 capacity 条
#[derive(Debug, Clone)]
pub struct RowErrorLog {
    capacity: usize,
    entries: Vec<RowError>,
    total: usize,
}

impl RowErrorLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
            total: 0,
        }
    }

    pub fn record(&mut self, row: usize, error: impl Into<String>) {
        self.total += 1;
        if self.entries.len() < self.capacity {
            self.entries.push(RowError {
                row,
                error: error.into(),
            });
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn omitted(&self) -> usize {
        self.total - self.entries.len()
    }

    pub fn entries(&self) -> &[RowError] {
        &self.entries
    }

    /// 拆分为 (明细, 截断提示)
    pub fn into_parts(self) -> (Vec<RowError>, Option<String>) {
        let omitted = self.omitted();
        let notice = (omitted > 0).then(|| {
            format!(
                "仅显示前 {} 条错误，另有 {} 条错误未显示",
                self.entries.len(),
                omitted
            )
        });
        (self.entries, notice)
    }
}

// ==========================================
// ImportResult - 导入结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success: bool,
    pub rows_processed: usize,
    pub rows_inserted: usize,
    pub rows_with_errors: usize,
    pub table: String,
    pub match_mode: MatchMode,
    pub truncated: bool,
    pub batch_size: usize,
    pub errors: Vec<RowError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation_notice: Option<String>,
    /// 文件中没有任何数据行（事务已回滚）
    pub no_data: bool,
}

impl fmt::Display for ImportResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.no_data {
            return writeln!(f, "表 {}: 文件中没有数据行，未写入任何数据", self.table);
        }

        writeln!(f, "表: {}", self.table)?;
        writeln!(f, "匹配模式: {}", self.match_mode)?;
        writeln!(f, "批大小: {}", self.batch_size)?;
        writeln!(f, "已清空: {}", if self.truncated { "是" } else { "否" })?;
        writeln!(f, "处理行数: {}", self.rows_processed)?;
        writeln!(f, "插入行数: {}", self.rows_inserted)?;
        writeln!(f, "错误行数: {}", self.rows_with_errors)?;

        for err in &self.errors {
            writeln!(f, "  行 {}: {}", err.row, err.error)?;
        }
        if let Some(notice) = &self.truncation_notice {
            writeln!(f, "  {}", notice)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_destination_columns_dedup() {
        let mapping = ColumnMapping::new(vec![
            ("a".to_string(), "A".to_string()),
            ("x".to_string(), "B".to_string()),
            ("y".to_string(), "A".to_string()),
        ]);
        assert_eq!(mapping.destination_columns(), vec!["A", "B"]);
        assert_eq!(mapping.destination_for("x"), Some("B"));
        assert!(mapping.contains_destination("B"));
        assert!(!mapping.contains_destination("C"));
    }

    #[test]
    fn test_converted_record_overwrites() {
        let mut record = ConvertedRecord::default();
        record.set("A", SqlValue::Integer(1));
        record.set("A", SqlValue::Integer(2));
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("A"), Some(&SqlValue::Integer(2)));
    }

    #[test]
    fn test_row_error_log_caps_details() {
        let mut log = RowErrorLog::new(2);
        log.record(1, "bad");
        log.record(2, "bad");
        log.record(3, "bad");

        assert_eq!(log.total(), 3);
        assert_eq!(log.omitted(), 1);
        let (entries, notice) = log.into_parts();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].row, 2);
        assert!(notice.unwrap().contains("1"));
    }

    #[test]
    fn test_import_result_serializes_camel_case() {
        let result = ImportResult {
            success: true,
            rows_processed: 3,
            rows_inserted: 3,
            rows_with_errors: 0,
            table: "T".to_string(),
            match_mode: MatchMode::Name,
            truncated: false,
            batch_size: 2,
            errors: vec![],
            truncation_notice: None,
            no_data: false,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["rowsInserted"], 3);
        assert_eq!(json["matchMode"], "name");
        assert!(json.get("truncationNotice").is_none());
    }
}
