// ==========================================
// 数据库管理工具 - 表数据导入 - 领域类型定义
// ==========================================
// 职责: 方言 / 匹配模式 / 文件格式 / 类型族 等枚举
// 序列化格式: 小写（与命令行参数一致）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 数据库方言 (Dialect)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Hana,     // 未加引号标识符折叠为大写
    Postgres, // 未加引号标识符折叠为小写
    Sqlite,   // 不折叠，无 schema 概念
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl Dialect {
    /// 客户端 getKind() 返回的方言标签
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Dialect::Hana => "hana",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hana" | "hdb" => Ok(Dialect::Hana),
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            other => Err(format!("不支持的数据库方言: {}", other)),
        }
    }
}

// ==========================================
// 列匹配模式 (Match Mode)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Order, // 按位置
    Name,  // 按列名（大小写不敏感）
    #[default]
    Auto,  // 按列名，失败时退回到文件列位置
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Order => write!(f, "order"),
            MatchMode::Name => write!(f, "name"),
            MatchMode::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "order" => Ok(MatchMode::Order),
            "name" => Ok(MatchMode::Name),
            "auto" => Ok(MatchMode::Auto),
            other => Err(format!("不支持的匹配模式: {}（可选 order/name/auto）", other)),
        }
    }
}

// ==========================================
// 输入文件格式 (File Format)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Csv,
    Excel,
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Csv => write!(f, "csv"),
            FileFormat::Excel => write!(f, "excel"),
        }
    }
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "excel" | "xlsx" => Ok(FileFormat::Excel),
            other => Err(format!("不支持的文件格式: {}（可选 csv/excel）", other)),
        }
    }
}

// ==========================================
// Excel 共享字符串缓存模式
// ==========================================
// 对调用方透明，仅影响底层读取器的内存/速度取舍
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExcelCacheMode {
    #[default]
    Cache,
    Emit,
    Ignore,
}

impl fmt::Display for ExcelCacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExcelCacheMode::Cache => write!(f, "cache"),
            ExcelCacheMode::Emit => write!(f, "emit"),
            ExcelCacheMode::Ignore => write!(f, "ignore"),
        }
    }
}

impl FromStr for ExcelCacheMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cache" => Ok(ExcelCacheMode::Cache),
            "emit" => Ok(ExcelCacheMode::Emit),
            "ignore" => Ok(ExcelCacheMode::Ignore),
            other => Err(format!("不支持的缓存模式: {}（可选 cache/emit/ignore）", other)),
        }
    }
}

// ==========================================
// 列类型族 (Type Family)
// ==========================================
// 由各方言的目录类型名翻译而来，类型转换只按类型族分派
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeFamily {
    Integer,
    Decimal,
    Boolean,
    Date,
    Timestamp,
    Text,
}

impl fmt::Display for TypeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeFamily::Integer => write!(f, "INTEGER"),
            TypeFamily::Decimal => write!(f, "DECIMAL"),
            TypeFamily::Boolean => write!(f, "BOOLEAN"),
            TypeFamily::Date => write!(f, "DATE"),
            TypeFamily::Timestamp => write!(f, "TIMESTAMP"),
            TypeFamily::Text => write!(f, "TEXT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_mode_from_str() {
        assert_eq!("ORDER".parse::<MatchMode>().unwrap(), MatchMode::Order);
        assert_eq!(" name ".parse::<MatchMode>().unwrap(), MatchMode::Name);
        assert!("fuzzy".parse::<MatchMode>().is_err());
        assert_eq!(MatchMode::default(), MatchMode::Auto);
    }

    #[test]
    fn test_dialect_aliases() {
        assert_eq!("hdb".parse::<Dialect>().unwrap(), Dialect::Hana);
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!(Dialect::Sqlite.to_string(), "sqlite");
    }

    #[test]
    fn test_file_format_serde() {
        let format: FileFormat = serde_json::from_str("\"excel\"").unwrap();
        assert_eq!(format, FileFormat::Excel);
        assert_eq!(serde_json::to_string(&ExcelCacheMode::Emit).unwrap(), "\"emit\"");
    }
}
