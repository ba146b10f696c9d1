// ==========================================
// 数据库管理工具 - 表数据导入 - 标识符解析
// ==========================================
// 职责: 标识符校验 / 去引号 / 大小写折叠 / 加引号；schema.table 拆分
// 规则:
// - 未加引号: [A-Za-z_][A-Za-z0-9_$#]{0,126}，不得含 "--" 或 "/*"
// - 加引号:   "..."，内部双引号必须成对出现 ("")，不得含换行/回车/NUL
// - 折叠:     仅作用于未加引号的标识符（由方言决定）
// - 输出:     一律加双引号并转义内部双引号
// ==========================================

use crate::dialect::DialectStrategy;
use crate::domain::table::QualifiedName;
use crate::importer::error::{ImportError, ImportResult};

/// 未加引号标识符最大长度
const MAX_UNQUOTED_LEN: usize = 127;

/// 解析后的单个标识符
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub quoted: bool,
}

/// 解析单个标识符（未折叠大小写）
pub fn parse_identifier(raw: &str) -> ImportResult<Identifier> {
    let raw = raw.trim();
    if raw.starts_with('"') {
        let name = unquote(raw)?;
        return Ok(Identifier { name, quoted: true });
    }

    if !is_valid_unquoted(raw) {
        return Err(ImportError::InvalidIdentifier(raw.to_string()));
    }
    Ok(Identifier {
        name: raw.to_string(),
        quoted: false,
    })
}

/// 解析并按方言折叠
pub fn resolve_identifier(raw: &str, dialect: &dyn DialectStrategy) -> ImportResult<String> {
    let ident = parse_identifier(raw)?;
    Ok(if ident.quoted {
        ident.name
    } else {
        dialect.fold_case(&ident.name)
    })
}

fn is_valid_unquoted(raw: &str) -> bool {
    if raw.is_empty() || raw.chars().count() > MAX_UNQUOTED_LEN {
        return false;
    }
    if raw.contains("--") || raw.contains("/*") {
        return false;
    }

    let mut chars = raw.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '#'))
}

/// 去掉外层双引号并还原 "" → "
fn unquote(raw: &str) -> ImportResult<String> {
    let invalid = || ImportError::InvalidIdentifier(raw.to_string());

    if raw.len() < 2 || !raw.ends_with('"') {
        return Err(invalid());
    }
    let body = &raw[1..raw.len() - 1];

    let mut name = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                // 单独出现的引号非法
                if chars.next_if_eq(&'"').is_none() {
                    return Err(invalid());
                }
                name.push('"');
            }
            '\n' | '\r' | '\0' => return Err(invalid()),
            other => name.push(other),
        }
    }

    if name.is_empty() {
        return Err(invalid());
    }
    Ok(name)
}

/// 加双引号输出（无论原始输入是否加过引号）
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// 生成 SQL 中的限定表名
pub fn qualified_sql(name: &QualifiedName) -> String {
    match &name.schema {
        Some(schema) => format!("{}.{}", quote_identifier(schema), quote_identifier(&name.table)),
        None => quote_identifier(&name.table),
    }
}

/// 按引号外的 '.' 拆分限定名
pub fn split_qualified_name(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in raw.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '.' if !in_quotes => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            other => current.push(other),
        }
    }
    parts.push(current.trim().to_string());
    parts
}

/// 解析 [schema.]table
///
/// # 返回
/// - 1 段: 仅表名，schema 为 None（由方言的默认 schema 决定）
/// - 2 段: schema + table
/// - 其他: InvalidTableName
pub fn parse_table_name(raw: &str, dialect: &dyn DialectStrategy) -> ImportResult<QualifiedName> {
    let parts = split_qualified_name(raw);
    let invalid = |detail: String| ImportError::InvalidTableName(format!("{} ({})", raw, detail));

    let resolve = |part: &str| {
        resolve_identifier(part, dialect).map_err(|e| invalid(e.to_string()))
    };

    match parts.as_slice() {
        [table] => {
            let table = resolve(table)?;
            Ok(QualifiedName::new(None, table))
        }
        [schema, table] => {
            let schema = resolve(schema)?;
            let table = resolve(table)?;
            Ok(QualifiedName::new(Some(schema), table))
        }
        _ => Err(invalid(format!("期望 1 或 2 段，实际 {} 段", parts.len()))),
    }
}
