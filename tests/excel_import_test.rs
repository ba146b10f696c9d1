// ==========================================
// Excel 记录源 / 导入集成测试
// ==========================================
// 测试目标: 起始行、工作表序号、空行跳过、xlsx → SQLite
// ==========================================


use table_import::config::ImportOptions;
use table_import::domain::record::CellValue;
use table_import::importer::{open_source, ImportError, SourceOptions};
use table_import::{logging, ExcelCacheMode, FileFormat, SqliteClient, TableImporter};
use chrono::NaiveDate;
use test_helpers::{create_test_db, query_rows, write_xlsx, write_xlsx_raw, write_xlsx_sheets};

const DATE_STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy-mm-dd hh:mm"/></numFmts>
<cellXfs count="3">
<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
<xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
<xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
</cellXfs>
</styleSheet>"#;

/// 公式 / 富文本 / 内联字符串 / 日期样式 / 布尔 / 文本公式各一列
fn mixed_cell_workbook() -> tempfile::NamedTempFile {
    let shared = [
        "<t>FORMULA</t>",
        "<t>RICH</t>",
        "<t>INLINE</t>",
        "<t>DAY</t>",
        "<t>STAMP</t>",
        "<t>FLAG</t>",
        "<t>JOINED</t>",
        "<r><t>Ri</t></r><r><rPr><b/></rPr><t>ch</t></r>",
    ];
    let rows = concat!(
        r#"<row r="1">"#,
        r#"<c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>2</v></c>"#,
        r#"<c r="D1" t="s"><v>3</v></c><c r="E1" t="s"><v>4</v></c><c r="F1" t="s"><v>5</v></c>"#,
        r#"<c r="G1" t="s"><v>6</v></c>"#,
        r#"</row><row r="2">"#,
        r#"<c r="A2"><f>1+1</f><v>2</v></c>"#,
        r#"<c r="B2" t="s"><v>7</v></c>"#,
        r#"<c r="C2" t="inlineStr"><is><t>inl</t></is></c>"#,
        r#"<c r="D2" s="1"><v>45677</v></c>"#,
        r#"<c r="E2" s="2"><v>45677.5</v></c>"#,
        r#"<c r="F2" t="b"><v>1</v></c>"#,
        r#"<c r="G2" t="str"><f>"a"&amp;"b"</f><v>ab</v></c>"#,
        r#"</row>"#,
    );
    write_xlsx_raw(rows, &shared, Some(DATE_STYLES))
}

fn excel_options() -> SourceOptions {
    SourceOptions {
        format: FileFormat::Excel,
        ..SourceOptions::default()
    }
}

#[tokio::test]
async fn test_start_row_selects_header() {
    logging::init_test();
    let file = write_xlsx(vec![
        vec!["Quarterly report"],
        vec![],
        vec!["ID", "NAME"],
        vec!["1", "Alice"],
        vec!["2", "Bob"],
    ]);

    let mut source = open_source(
        file.path().to_str().unwrap(),
        &SourceOptions {
            start_row: 3,
            ..excel_options()
        },
    )
    .unwrap();

    let first = source.next_record().await.unwrap().unwrap();
    assert_eq!(source.columns().unwrap(), &["ID".to_string(), "NAME".to_string()]);
    assert_eq!(first.get("ID"), Some(&CellValue::Float(1.0)));
    assert_eq!(first.get("NAME"), Some(&CellValue::Text("Alice".to_string())));

    let second = source.next_record().await.unwrap().unwrap();
    assert_eq!(second.get("NAME"), Some(&CellValue::Text("Bob".to_string())));
    assert!(source.next_record().await.unwrap().is_none());
}

#[tokio::test]
async fn test_skip_empty_rows_and_blank_headers() {
    let file = write_xlsx(vec![
        vec!["ID", "", "NOTE"],
        vec!["1", "x", "a"],
        vec![],
        vec!["2", "", ""],
    ]);

    let mut source = open_source(file.path().to_str().unwrap(), &excel_options()).unwrap();
    let mut records = Vec::new();
    while let Some(record) = source.next_record().await.unwrap() {
        records.push(record);
    }
    assert_eq!(
        source.columns().unwrap(),
        &["ID".to_string(), "Column 2".to_string(), "NOTE".to_string()]
    );
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("Column 2"), Some(&CellValue::Text("x".to_string())));
    assert_eq!(records[1].get("NOTE"), Some(&CellValue::Null));

    // 关闭跳过空行时，空行以全 NULL 记录返回
    let mut source = open_source(
        file.path().to_str().unwrap(),
        &SourceOptions {
            skip_empty_rows: false,
            excel_cache_mode: ExcelCacheMode::Ignore,
            ..excel_options()
        },
    )
    .unwrap();
    let mut count = 0;
    while let Some(record) = source.next_record().await.unwrap() {
        if count == 1 {
            assert!(record.is_blank());
        }
        count += 1;
    }
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_worksheet_ordinal() {
    let file = write_xlsx_sheets(vec![
        ("First", vec![vec!["A"], vec!["first"]]),
        ("Second", vec![vec!["A"], vec!["second"]]),
    ]);

    let mut source = open_source(
        file.path().to_str().unwrap(),
        &SourceOptions {
            worksheet: 2,
            ..excel_options()
        },
    )
    .unwrap();
    let record = source.next_record().await.unwrap().unwrap();
    assert_eq!(record.get("A"), Some(&CellValue::Text("second".to_string())));

    let mut source = open_source(
        file.path().to_str().unwrap(),
        &SourceOptions {
            worksheet: 3,
            ..excel_options()
        },
    )
    .unwrap();
    match source.next_record().await {
        Err(ImportError::WorksheetNotFound { requested, available }) => {
            assert_eq!(requested, 3);
            assert_eq!(available, 2);
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_excel_import_into_sqlite() {
    let (_db, db_path) =
        create_test_db("CREATE TABLE people (ID INTEGER NOT NULL, NAME TEXT, SCORE REAL);").unwrap();
    let file = write_xlsx(vec![
        vec!["exported at 2025-01-20"],
        vec!["id", "name", "score"],
        vec!["1", "Alice", "9.5"],
        vec!["2", "Bob", ""],
    ]);

    let options = ImportOptions {
        output: FileFormat::Excel,
        start_row: 2,
        ..ImportOptions::new(file.path().to_str().unwrap(), "people")
    };
    let mut importer = TableImporter::new(SqliteClient::new(db_path.clone()), options);
    let result = importer.run().await.unwrap();

    assert!(result.success);
    assert_eq!(result.rows_inserted, 2);

    let rows = query_rows(&db_path, "SELECT ID, NAME, SCORE FROM people ORDER BY ID");
    assert_eq!(
        rows,
        vec![
            vec![Some("1".to_string()), Some("Alice".to_string()), Some("9.5".to_string())],
            vec![Some("2".to_string()), Some("Bob".to_string()), None],
        ]
    );
}

#[tokio::test]
async fn test_missing_worksheet_rolls_back() {
    let (_db, db_path) = create_test_db("CREATE TABLE people (ID INTEGER NOT NULL);").unwrap();
    let file = write_xlsx(vec![vec!["ID"], vec!["1"]]);

    let options = ImportOptions {
        output: FileFormat::Excel,
        worksheet: 5,
        ..ImportOptions::new(file.path().to_str().unwrap(), "people")
    };
    let mut importer = TableImporter::new(SqliteClient::new(db_path), options);
    assert!(matches!(
        importer.run().await,
        Err(ImportError::WorksheetNotFound { requested: 5, .. })
    ));
}

#[tokio::test]
async fn test_start_row_beyond_sheet_range_is_rejected() {
    let file = write_xlsx(vec![vec!["ID"], vec!["1"]]);

    let mut source = open_source(
        file.path().to_str().unwrap(),
        &SourceOptions {
            start_row: u32::MAX as usize + 2,
            ..excel_options()
        },
    )
    .unwrap();
    assert!(matches!(
        source.next_record().await,
        Err(ImportError::InvalidOption { ref option, .. }) if option == "startRow"
    ));
}

#[tokio::test]
async fn test_cell_normalization() {
    let file = mixed_cell_workbook();
    let mut source = open_source(file.path().to_str().unwrap(), &excel_options()).unwrap();
    let record = source.next_record().await.unwrap().unwrap();

    let day = NaiveDate::from_ymd_opt(2025, 1, 20).unwrap();
    // 公式取缓存结果
    assert_eq!(record.get("FORMULA"), Some(&CellValue::Float(2.0)));
    assert_eq!(record.get("JOINED"), Some(&CellValue::Text("ab".to_string())));
    // 富文本合并为纯文本
    assert_eq!(record.get("RICH"), Some(&CellValue::Text("Rich".to_string())));
    assert_eq!(record.get("INLINE"), Some(&CellValue::Text("inl".to_string())));
    assert_eq!(
        record.get("DAY"),
        Some(&CellValue::DateTime(day.and_hms_opt(0, 0, 0).unwrap()))
    );
    assert_eq!(
        record.get("STAMP"),
        Some(&CellValue::DateTime(day.and_hms_opt(12, 0, 0).unwrap()))
    );
    assert_eq!(record.get("FLAG"), Some(&CellValue::Bool(true)));
    assert!(source.next_record().await.unwrap().is_none());
}

#[tokio::test]
async fn test_date_styled_cells_import() {
    let (_db, db_path) = create_test_db(
        "CREATE TABLE readings (FORMULA INTEGER, RICH TEXT, INLINE TEXT, DAY DATE, STAMP TIMESTAMP, FLAG BOOLEAN, JOINED TEXT);",
    )
    .unwrap();
    let file = mixed_cell_workbook();

    let options = ImportOptions {
        output: FileFormat::Excel,
        ..ImportOptions::new(file.path().to_str().unwrap(), "readings")
    };
    let mut importer = TableImporter::new(SqliteClient::new(db_path.clone()), options);
    let result = importer.run().await.unwrap();
    assert!(result.success, "{:?}", result.errors);

    let rows = query_rows(
        &db_path,
        "SELECT FORMULA, RICH, INLINE, DAY, STAMP, FLAG, JOINED FROM readings",
    );
    assert_eq!(
        rows,
        vec![vec![
            Some("2".to_string()),
            Some("Rich".to_string()),
            Some("inl".to_string()),
            Some("2025-01-20".to_string()),
            Some("2025-01-20 12:00:00".to_string()),
            Some("1".to_string()),
            Some("ab".to_string()),
        ]]
    );
}
