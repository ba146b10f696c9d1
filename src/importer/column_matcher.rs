// ==========================================
// 数据库管理工具 - 表数据导入 - 列匹配
// ==========================================
// 匹配模式:
// - order: 第 i 个文件列 → 第 i 个目标列（取较短长度）
// - name:  按列名匹配，优先精确大小写，其次忽略大小写；未匹配的文件列丢弃
// - auto:  先按 name 匹配，未匹配的文件列按位置回退到同序号目标列
// 映射由首条记录确定后冻结
// ==========================================

use crate::domain::import::ColumnMapping;
use crate::domain::table::TableMetadata;
use crate::domain::types::MatchMode;
use crate::importer::error::{ImportError, ImportResult};
use tracing::{debug, warn};

/// 建立列映射
///
/// # 参数
/// - file_columns: 首条记录的字段名（文件列顺序）
/// - metadata: 目标表元数据
/// - mode: 匹配模式
///
/// # 返回
/// - Err(NoColumnsMatched): 映射为空
pub fn match_columns<S: AsRef<str>>(
    file_columns: &[S],
    metadata: &TableMetadata,
    mode: MatchMode,
) -> ImportResult<ColumnMapping> {
    let destinations = metadata.column_names();
    let mut pairs: Vec<(String, String)> = Vec::new();

    match mode {
        MatchMode::Order => {
            for (source, dest) in file_columns.iter().zip(destinations.iter()) {
                pairs.push((source.as_ref().to_string(), dest.to_string()));
            }
        }
        MatchMode::Name => {
            for source in file_columns {
                if let Some(dest) = match_by_name(source.as_ref(), &destinations) {
                    pairs.push((source.as_ref().to_string(), dest.to_string()));
                }
            }
        }
        MatchMode::Auto => {
            let by_name: Vec<Option<&str>> = file_columns
                .iter()
                .map(|s| match_by_name(s.as_ref(), &destinations))
                .collect();

            for (idx, source) in file_columns.iter().enumerate() {
                let source = source.as_ref();
                let dest = match by_name[idx] {
                    Some(dest) => dest,
                    None => match destinations.get(idx) {
                        Some(fallback) => {
                            // 位置回退可能落到已按名称匹配的目标列上，保留两者
                            if by_name.iter().flatten().any(|d| d == fallback) {
                                warn!(
                                    source = source,
                                    destination = *fallback,
                                    "位置回退的目标列已被按名称匹配，后写入的值将覆盖"
                                );
                            }
                            *fallback
                        }
                        None => continue,
                    },
                };
                pairs.push((source.to_string(), dest.to_string()));
            }
        }
    }

    if pairs.is_empty() {
        return Err(ImportError::NoColumnsMatched);
    }

    debug!(mode = %mode, pairs = ?pairs, "列映射已确定");
    Ok(ColumnMapping::new(pairs))
}

/// 按名称匹配：精确大小写优先，其次忽略大小写
fn match_by_name<'a>(source: &str, destinations: &[&'a str]) -> Option<&'a str> {
    destinations
        .iter()
        .find(|d| **d == source)
        .or_else(|| destinations.iter().find(|d| d.to_lowercase() == source.to_lowercase()))
        .copied()
}

/// 校验必填列（不可空且无默认值）均在映射中
pub fn validate_required_columns(mapping: &ColumnMapping, metadata: &TableMetadata) -> ImportResult<()> {
    let missing: Vec<String> = metadata
        .required_columns()
        .filter(|c| !mapping.contains_destination(&c.name))
        .map(|c| c.name.clone())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ImportError::MissingRequiredColumns(missing))
    }
}
