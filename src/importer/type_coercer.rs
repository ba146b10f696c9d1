// ==========================================
// 数据库管理工具 - 表数据导入 - 类型转换
// ==========================================
// 职责: 原始单元格值 → 目标列定型值 (SqlValue)，并检查可空性
// 类型族在构造时按方言翻译表一次性算好，逐行只做分派
// 一行内所有列的错误一并收集，整行排除并只记录一次
// ==========================================

use crate::dialect::DialectStrategy;
use crate::domain::import::{ColumnMapping, ConvertedRecord};
use crate::domain::record::{CellValue, SourceRecord, SqlValue};
use crate::domain::table::TableMetadata;
use crate::domain::types::TypeFamily;
use crate::importer::error::ImportError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::HashMap;

const TRUE_TOKENS: [&str; 5] = ["true", "1", "yes", "y", "t"];
const FALSE_TOKENS: [&str; 5] = ["false", "0", "no", "n", "f"];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];
const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];

#[derive(Debug, Clone, Copy, PartialEq)]
struct ColumnTarget {
    family: TypeFamily,
    nullable: bool,
}

pub struct TypeCoercer {
    targets: HashMap<String, ColumnTarget>,
}

impl TypeCoercer {
    pub fn new(metadata: &TableMetadata, dialect: &dyn DialectStrategy) -> Self {
        let targets = metadata
            .columns
            .iter()
            .map(|c| {
                (
                    c.name.clone(),
                    ColumnTarget {
                        family: dialect.type_family(&c.data_type),
                        nullable: c.nullable,
                    },
                )
            })
            .collect();
        Self { targets }
    }

    pub fn family(&self, column: &str) -> Option<TypeFamily> {
        self.targets.get(column).map(|t| t.family)
    }

    /// 转换一行
    ///
    /// # 参数
    /// - record: 文件记录
    /// - mapping: 冻结的列映射
    /// - row: 数据行序号（1 起）
    ///
    /// # 返回
    /// - Ok(ConvertedRecord): 全部列转换成功
    /// - Err(Vec<ImportError>): 该行所有列的转换错误
    pub fn convert(
        &self,
        record: &SourceRecord,
        mapping: &ColumnMapping,
        row: usize,
    ) -> Result<ConvertedRecord, Vec<ImportError>> {
        let mut converted = ConvertedRecord::default();
        let mut errors = Vec::new();

        for (source, dest) in mapping.pairs() {
            let Some(target) = self.targets.get(dest) else {
                errors.push(ImportError::TypeConversionError {
                    row,
                    field: dest.clone(),
                    message: "目标列不存在".to_string(),
                });
                continue;
            };

            match coerce_value(record.get(source), target.family, target.nullable) {
                Ok(value) => converted.set(dest.as_str(), value),
                Err(message) => errors.push(ImportError::TypeConversionError {
                    row,
                    field: dest.clone(),
                    message,
                }),
            }
        }

        if errors.is_empty() {
            Ok(converted)
        } else {
            Err(errors)
        }
    }
}

/// 合并一行的转换错误为一条错误信息
pub fn describe_row_errors(errors: &[ImportError]) -> String {
    errors
        .iter()
        .map(|e| match e {
            ImportError::TypeConversionError { field, message, .. } => format!("{}: {}", field, message),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// 单值转换（None 表示记录中没有该字段）
pub fn coerce_value(value: Option<&CellValue>, family: TypeFamily, nullable: bool) -> Result<SqlValue, String> {
    let value = match value {
        Some(v) if !v.is_blank() => v,
        _ => {
            return if nullable {
                Ok(SqlValue::Null)
            } else {
                Err("不可为空".to_string())
            };
        }
    };

    match family {
        TypeFamily::Integer => to_integer(value),
        TypeFamily::Decimal => to_decimal(value),
        TypeFamily::Boolean => to_boolean(value),
        TypeFamily::Date => to_date(value),
        TypeFamily::Timestamp => to_timestamp(value),
        TypeFamily::Text => Ok(SqlValue::Text(value.to_plain_string())),
    }
}

fn to_integer(value: &CellValue) -> Result<SqlValue, String> {
    let fail = || format!("无法转换为整数: {}", value);
    match value {
        CellValue::Int(i) => Ok(SqlValue::Integer(*i)),
        CellValue::Float(f) => whole_float(*f).map(SqlValue::Integer).ok_or_else(fail),
        CellValue::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        CellValue::Text(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_float))
                .map(SqlValue::Integer)
                .ok_or_else(fail)
        }
        CellValue::DateTime(_) | CellValue::Null => Err(fail()),
    }
}

fn whole_float(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn to_decimal(value: &CellValue) -> Result<SqlValue, String> {
    let fail = || format!("无法转换为数值: {}", value);
    match value {
        CellValue::Int(i) => Ok(SqlValue::Real(*i as f64)),
        CellValue::Float(f) => Ok(SqlValue::Real(*f)),
        CellValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(SqlValue::Real)
            .ok_or_else(fail),
        _ => Err(fail()),
    }
}

fn to_boolean(value: &CellValue) -> Result<SqlValue, String> {
    let fail = || format!("无法转换为布尔值: {}", value);
    match value {
        CellValue::Bool(b) => Ok(SqlValue::Boolean(*b)),
        CellValue::Int(0) => Ok(SqlValue::Boolean(false)),
        CellValue::Int(1) => Ok(SqlValue::Boolean(true)),
        CellValue::Float(f) if *f == 0.0 => Ok(SqlValue::Boolean(false)),
        CellValue::Float(f) if *f == 1.0 => Ok(SqlValue::Boolean(true)),
        CellValue::Text(s) => {
            let token = s.trim().to_lowercase();
            if TRUE_TOKENS.contains(&token.as_str()) {
                Ok(SqlValue::Boolean(true))
            } else if FALSE_TOKENS.contains(&token.as_str()) {
                Ok(SqlValue::Boolean(false))
            } else {
                Err(fail())
            }
        }
        _ => Err(fail()),
    }
}

fn to_date(value: &CellValue) -> Result<SqlValue, String> {
    match value {
        CellValue::DateTime(dt) => Ok(SqlValue::Date(dt.date())),
        CellValue::Text(s) => parse_date(s.trim())
            .or_else(|| parse_timestamp(s.trim()).map(|ts| ts.date()))
            .map(SqlValue::Date)
            .ok_or_else(|| format!("无法转换为日期: {}", s)),
        other => Err(format!("无法转换为日期: {}", other)),
    }
}

fn to_timestamp(value: &CellValue) -> Result<SqlValue, String> {
    match value {
        CellValue::DateTime(dt) => Ok(SqlValue::Timestamp(*dt)),
        CellValue::Text(s) => parse_timestamp(s.trim())
            .or_else(|| parse_date(s.trim()).and_then(|d| d.and_hms_opt(0, 0, 0)))
            .map(SqlValue::Timestamp)
            .ok_or_else(|| format!("无法转换为时间戳: {}", s)),
        other => Err(format!("无法转换为时间戳: {}", other)),
    }
}

/// 解析日期（YYYY-MM-DD / YYYY/MM/DD / YYYY.MM.DD / YYYYMMDD）
fn parse_date(s: &str) -> Option<NaiveDate> {
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year = s[0..4].parse().ok()?;
        let month = s[4..6].parse().ok()?;
        let day = s[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// 解析时间戳（RFC 3339 取本地时刻，或常见 ISO 形式）
fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}
