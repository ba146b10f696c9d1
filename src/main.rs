// ==========================================
// 数据库管理工具 - 表数据导入 - 命令行入口
// ==========================================
// 用法:
//   table-import import --database app.db --filename data.csv --table people
//   table-import import --database app.db --config import.json --batch-size 500
// 退出码: 0 全部成功；1 致命错误；2 存在行级错误或文件无数据
// ==========================================

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use table_import::{
    logging, ExcelCacheMode, FileFormat, ImportOptions, MatchMode, SqliteClient, TableImporter,
};

/// 文件到数据表的批量导入工具
#[derive(Parser)]
#[command(name = "table-import", version, about = "Bulk import CSV / xlsx files into an existing table")]
struct Cli {
    /// RUST_LOG 未设置时的日志级别
    #[arg(long, global = true, env = "TABLE_IMPORT_LOG", default_value = "info")]
    log_level: String,

    /// 以 JSON 格式输出日志
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a CSV or xlsx file into a table
    Import(ImportArgs),
}

#[derive(Args)]
struct ImportArgs {
    /// SQLite 数据库文件
    #[arg(long, env = "TABLE_IMPORT_DATABASE")]
    database: String,

    /// JSON 参数文件（命令行参数覆盖其中的值）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 源文件
    #[arg(long)]
    filename: Option<String>,

    /// 目标表 [schema.]table
    #[arg(long)]
    table: Option<String>,

    /// 文件格式: csv | excel
    #[arg(long)]
    output: Option<FileFormat>,

    /// 列匹配模式: order | name | auto
    #[arg(long)]
    match_mode: Option<MatchMode>,

    /// 导入前清空目标表
    #[arg(long)]
    truncate: bool,

    /// 每批行数 (1..=10000)
    #[arg(long, allow_hyphen_values = true)]
    batch_size: Option<i64>,

    /// 工作表序号（1 起，仅 Excel）
    #[arg(long, allow_hyphen_values = true)]
    worksheet: Option<i64>,

    /// 表头所在行（1 起，仅 Excel）
    #[arg(long, allow_hyphen_values = true)]
    start_row: Option<i64>,

    /// 是否跳过全空行（仅 Excel）
    #[arg(long)]
    skip_empty_rows: Option<bool>,

    /// 共享字符串缓存模式: cache | emit | ignore
    #[arg(long)]
    excel_cache_mode: Option<ExcelCacheMode>,

    /// 以 JSON 输出导入结果
    #[arg(long)]
    json: bool,
}

impl ImportArgs {
    /// 合并配置文件与命令行参数
    fn to_options(&self) -> anyhow::Result<ImportOptions> {
        let mut options = match &self.config {
            Some(path) => ImportOptions::from_json_file(path)
                .with_context(|| format!("无法加载参数文件 {}", path.display()))?,
            None => ImportOptions::default(),
        };

        if let Some(filename) = &self.filename {
            options.filename = filename.clone();
        }
        if let Some(table) = &self.table {
            options.table = table.clone();
        }
        if let Some(output) = self.output {
            options.output = output;
        }
        if let Some(mode) = self.match_mode {
            options.match_mode = mode;
        }
        if self.truncate {
            options.truncate = true;
        }
        if let Some(batch_size) = self.batch_size {
            options.batch_size = batch_size;
        }
        if let Some(worksheet) = self.worksheet {
            options.worksheet = worksheet;
        }
        if let Some(start_row) = self.start_row {
            options.start_row = start_row;
        }
        if let Some(skip) = self.skip_empty_rows {
            options.skip_empty_rows = skip;
        }
        if let Some(mode) = self.excel_cache_mode {
            options.excel_cache_mode = mode;
        }
        Ok(options)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_json);

    tracing::debug!(version = table_import::VERSION, "table-import 启动");

    match cli.command {
        Command::Import(args) => run_import(args).await,
    }
}

async fn run_import(args: ImportArgs) -> anyhow::Result<ExitCode> {
    let options = args.to_options()?;
    let client = SqliteClient::new(args.database.clone());

    let mut importer = TableImporter::new(client, options);
    let result = importer
        .run()
        .await
        .with_context(|| format!("导入失败 (run_id={})", importer.run_id()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", result);
    }

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}
