// ==========================================
// 数据库管理工具 - 表数据导入 - 文件记录源
// ==========================================
// 支持: CSV (.csv) / Excel (.xlsx)
// 读取方式: 阻塞读取线程 (spawn_blocking) → 有界通道 → 逐条拉取
//   - 只向前读取，不一次性载入整个文件
//   - 表头在第一条数据记录之前确定
//   - close() 或 drop 后读取线程自行退出并释放文件
// ==========================================

use crate::domain::record::{CellValue, SourceRecord};
use crate::domain::types::{ExcelCacheMode, FileFormat};
use crate::importer::error::{ImportError, ImportResult};
use async_trait::async_trait;
use calamine::{open_workbook, DataRef, Reader, Xlsx};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// 通道容量（读取线程最多领先消费方的记录数）
const CHANNEL_CAPACITY: usize = 64;

// ==========================================
// SourceOptions - 记录源参数
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct SourceOptions {
    pub format: FileFormat,
    /// 工作表序号（1 起，仅 Excel）
    pub worksheet: usize,
    /// 表头所在行（1 起，仅 Excel）
    pub start_row: usize,
    /// 跳过全空行（仅 Excel）
    pub skip_empty_rows: bool,
    pub excel_cache_mode: ExcelCacheMode,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            format: FileFormat::Csv,
            worksheet: 1,
            start_row: 1,
            skip_empty_rows: true,
            excel_cache_mode: ExcelCacheMode::Cache,
        }
    }
}

// ==========================================
// RecordSource Trait
// ==========================================
#[async_trait]
pub trait RecordSource: Send {
    /// 拉取下一条记录；文件读完返回 None
    async fn next_record(&mut self) -> ImportResult<Option<SourceRecord>>;

    /// 规范化后的表头；读到表头之前为 None
    fn columns(&self) -> Option<&[String]>;

    /// 停止读取并释放文件
    fn close(&mut self);
}

enum SourceEvent {
    Header(Vec<String>),
    Row(SourceRecord),
}

type EventSender = mpsc::Sender<ImportResult<SourceEvent>>;

// ==========================================
// FileRecordSource - 通道驱动的记录源
// ==========================================
pub struct FileRecordSource {
    format: FileFormat,
    rx: mpsc::Receiver<ImportResult<SourceEvent>>,
    columns: Option<Vec<String>>,
    closed: bool,
}

impl FileRecordSource {
    fn spawn<F>(format: FileFormat, producer: F) -> Self
    where
        F: FnOnce(&EventSender) -> ImportResult<()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = producer(&tx) {
                // 消费方已关闭时发送失败可忽略
                let _ = tx.blocking_send(Err(e));
            }
        });
        Self {
            format,
            rx,
            columns: None,
            closed: false,
        }
    }
}

#[async_trait]
impl RecordSource for FileRecordSource {
    async fn next_record(&mut self) -> ImportResult<Option<SourceRecord>> {
        if self.closed {
            return Ok(None);
        }
        loop {
            match self.rx.recv().await {
                None => return Ok(None),
                Some(Err(e)) => return Err(e),
                Some(Ok(SourceEvent::Header(headers))) => {
                    debug!(columns = ?headers, "读取到表头");
                    self.columns = Some(headers);
                }
                Some(Ok(SourceEvent::Row(record))) => return Ok(Some(record)),
            }
        }
    }

    fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.rx.close();
            debug!(format = %self.format, "记录源已关闭");
        }
    }
}

/// 打开文件记录源
///
/// # 参数
/// - path: 文件路径
/// - options: 格式与 Excel 读取参数
///
/// # 返回
/// - Ok(Box<dyn RecordSource>): 记录源（读取在后台进行）
/// - Err(ImportError): 路径非法 / 文件不存在 / 不是普通文件
pub fn open_source(path: &str, options: &SourceOptions) -> ImportResult<Box<dyn RecordSource>> {
    let path = validate_path(path)?;
    debug!(path = %path.display(), format = %options.format, "打开记录源");

    let source = match options.format {
        FileFormat::Csv => FileRecordSource::spawn(FileFormat::Csv, move |tx| produce_csv(&path, tx)),
        FileFormat::Excel => {
            let options = options.clone();
            FileRecordSource::spawn(FileFormat::Excel, move |tx| {
                produce_excel(&path, &options, tx)
            })
        }
    };
    Ok(Box::new(source))
}

/// 校验并规范化文件路径
pub fn validate_path(raw: &str) -> ImportResult<PathBuf> {
    if raw.contains('\0') {
        return Err(ImportError::InvalidPath(raw.replace('\0', "\\0")));
    }
    if raw.trim().is_empty() {
        return Err(ImportError::InvalidPath("文件路径为空".to_string()));
    }

    let canonical = std::fs::canonicalize(raw).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ImportError::FileNotFound(raw.to_string()),
        _ => ImportError::InvalidPath(format!("{}: {}", raw, e)),
    })?;

    if !canonical.is_file() {
        return Err(ImportError::InvalidPath(format!("不是普通文件: {}", raw)));
    }
    Ok(canonical)
}

/// 表头规范化：去空白，空表头替换为 "Column N"（1 起）
pub fn normalize_headers<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .enumerate()
        .map(|(idx, h)| {
            let h = h.as_ref();
            let h = if idx == 0 { h.trim_start_matches('\u{feff}') } else { h };
            let h = h.trim();
            if h.is_empty() {
                format!("Column {}", idx + 1)
            } else {
                h.to_string()
            }
        })
        .collect()
}

/// 发送事件；消费方已关闭返回 false
fn emit(tx: &EventSender, event: SourceEvent) -> bool {
    tx.blocking_send(Ok(event)).is_ok()
}

// ==========================================
// CSV 读取
// ==========================================
fn produce_csv(path: &Path, tx: &EventSender) -> ImportResult<()> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // 允许行长度与表头不一致
        .trim(Trim::All)
        .from_reader(file);

    let headers = normalize_headers(reader.headers()?.iter());
    if !emit(tx, SourceEvent::Header(headers.clone())) {
        return Ok(());
    }

    for result in reader.records() {
        let row = result?;
        let mut record = SourceRecord::with_capacity(headers.len());
        // 多出的单元格丢弃，缺少的列不出现在记录中
        for (header, value) in headers.iter().zip(row.iter()) {
            record.push(header.as_str(), CellValue::Text(value.to_string()));
        }
        if !emit(tx, SourceEvent::Row(record)) {
            return Ok(());
        }
    }
    Ok(())
}

// ==========================================
// Excel 读取
// ==========================================
fn produce_excel(path: &Path, options: &SourceOptions, tx: &EventSender) -> ImportResult<()> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    // 共享字符串表在打开工作簿时已载入，缓存模式只影响日志
    debug!(cache_mode = %options.excel_cache_mode, "Excel 共享字符串缓存模式");

    let sheet_names = workbook.sheet_names();
    let sheet = options
        .worksheet
        .checked_sub(1)
        .and_then(|idx| sheet_names.get(idx))
        .cloned()
        .ok_or(ImportError::WorksheetNotFound {
            requested: options.worksheet,
            available: sheet_names.len(),
        })?;
    debug!(sheet = %sheet, start_row = options.start_row, "读取工作表");

    let header_row = u32::try_from(options.start_row.saturating_sub(1)).map_err(|_| ImportError::InvalidOption {
        option: "startRow".to_string(),
        message: format!("起始行超出范围: {}", options.start_row),
    })?;
    let mut cells = workbook.worksheet_cells_reader(&sheet)?;

    let mut assembler = RowAssembler::new(header_row, options.skip_empty_rows);
    while let Some(cell) = cells.next_cell()? {
        let (row, col) = cell.get_position();
        if row < header_row {
            continue;
        }
        for event in assembler.advance(row) {
            if !emit(tx, event) {
                return Ok(());
            }
        }
        assembler.push_cell(col, cell_value(cell.get_value()));
    }
    for event in assembler.finish() {
        if !emit(tx, event) {
            return Ok(());
        }
    }
    Ok(())
}

/// 单元格值规范化
///
/// 共享字符串/富文本 → 文本；公式 → 缓存结果；日期 → DateTime；
/// 错误单元格 → 错误文本；其他原样保留
fn cell_value(value: &DataRef<'_>) -> CellValue {
    match value {
        DataRef::Empty => CellValue::Null,
        DataRef::Int(i) => CellValue::Int(*i),
        DataRef::Float(f) => CellValue::Float(*f),
        DataRef::Bool(b) => CellValue::Bool(*b),
        DataRef::String(s) => CellValue::Text(s.clone()),
        DataRef::SharedString(s) => CellValue::Text(s.to_string()),
        DataRef::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Float(dt.as_f64())),
        DataRef::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        DataRef::DurationIso(s) => CellValue::Text(s.clone()),
        DataRef::Error(e) => CellValue::Text(e.to_string()),
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// ==========================================
// RowAssembler - 单元格流 → 行事件
// ==========================================
// 单元格按行顺序到达，且只包含非空单元格；
// 行号跳变时补出中间的空行（未开启跳过空行时）
struct RowAssembler {
    header_row: u32,
    skip_empty_rows: bool,
    headers: Option<Vec<String>>,
    current_row: Option<u32>,
    current_cells: Vec<(u32, CellValue)>,
}

impl RowAssembler {
    fn new(header_row: u32, skip_empty_rows: bool) -> Self {
        Self {
            header_row,
            skip_empty_rows,
            headers: None,
            current_row: None,
            current_cells: Vec::new(),
        }
    }

    fn push_cell(&mut self, col: u32, value: CellValue) {
        self.current_cells.push((col, value));
    }

    /// 进入新行：结束上一行并产生相应事件
    fn advance(&mut self, row: u32) -> Vec<SourceEvent> {
        if self.current_row == Some(row) {
            return Vec::new();
        }
        let mut events = self.flush_current();

        // 表头行本身没有单元格：以空表头继续
        if self.headers.is_none() && row > self.header_row {
            self.headers = Some(Vec::new());
            events.push(SourceEvent::Header(Vec::new()));
        }

        if !self.skip_empty_rows {
            let first_gap = match self.current_row {
                Some(prev) => prev + 1,
                None => self.header_row + 1,
            };
            for _ in first_gap..row {
                events.push(SourceEvent::Row(self.blank_record()));
            }
        }

        self.current_row = Some(row);
        events
    }

    fn finish(&mut self) -> Vec<SourceEvent> {
        let mut events = self.flush_current();
        if self.headers.is_none() {
            self.headers = Some(Vec::new());
            events.push(SourceEvent::Header(Vec::new()));
        }
        events
    }

    fn flush_current(&mut self) -> Vec<SourceEvent> {
        let Some(row) = self.current_row else {
            return Vec::new();
        };
        let cells = std::mem::take(&mut self.current_cells);

        if row == self.header_row {
            let width = cells.iter().map(|(c, _)| *c + 1).max().unwrap_or(0) as usize;
            let mut raw = vec![String::new(); width];
            for (col, value) in cells {
                raw[col as usize] = value.to_plain_string();
            }
            let headers = normalize_headers(raw);
            self.headers = Some(headers.clone());
            return vec![SourceEvent::Header(headers)];
        }

        let headers = self.headers.as_deref().unwrap_or_default();
        let mut values = vec![CellValue::Null; headers.len()];
        let mut dropped = 0usize;
        for (col, value) in cells {
            match values.get_mut(col as usize) {
                Some(slot) => *slot = value,
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(row = row + 1, dropped, "超出表头范围的单元格已丢弃");
        }

        let record: SourceRecord = headers.iter().cloned().zip(values).collect();
        if self.skip_empty_rows && record.is_blank() {
            return Vec::new();
        }
        vec![SourceEvent::Row(record)]
    }

    fn blank_record(&self) -> SourceRecord {
        self.headers
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|h| (h.clone(), CellValue::Null))
            .collect()
    }
}
