use std::io::Cursor;

use anyhow::Result;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use tempfile::tempdir;

use lead_enricher::app::enrich_use_case::{EnrichRequest, EnrichUseCase};
use lead_enricher::config::{EnrichToggles, HttpConfig};
use lead_enricher::error::EnrichError;
use lead_enricher::infra::http_client::ReqwestHttp;
use lead_enricher::infra::source_reader::DefaultSourceReader;
use lead_enricher::infra::workbook_writer::{FsArtifactOutput, XlsxWorkbookWriter};
use lead_enricher::pipeline::ingestion::{load_table, SourceRef};

fn use_case(output_dir: &std::path::Path) -> Result<EnrichUseCase> {
    let http = ReqwestHttp::new(&HttpConfig::default())?;
    Ok(EnrichUseCase::new(
        Box::new(DefaultSourceReader::new(Box::new(http))),
        Box::new(XlsxWorkbookWriter::new()),
        Box::new(FsArtifactOutput::new(output_dir)),
    ))
}

fn cell(range: &calamine::Range<Data>, header: &str, row: u32) -> Option<Data> {
    let width = range.width() as u32;
    let col = (0..width).find(|c| range.get_value((0, *c)) == Some(&Data::String(header.to_string())))?;
    range.get_value((row, col)).cloned()
}

#[tokio::test]
async fn test_csv_leads_with_propwire_export_to_workbook() -> Result<()> {
    let dir = tempdir()?;
    let leads = dir.path().join("leads.csv");
    std::fs::write(
        &leads,
        "Parcel,Address,City,State,Zip,County\n\
         12-345,1 Elm St,Springfield,IL,62701,Sangamon\n\
         777,,Reno,NV,,Washoe\n",
    )?;
    let propwire = dir.path().join("propwire.csv");
    std::fs::write(&propwire, "Parcel Number,Owner,Equity\n12345,Ann Lee,40000\n")?;

    let out_dir = dir.path().join("out");
    let report = use_case(&out_dir)?
        .run(EnrichRequest {
            leads: SourceRef::parse(leads.to_str().unwrap()),
            propwire: Some(SourceRef::parse(propwire.to_str().unwrap())),
            property_radar: None,
            toggles: EnrichToggles::default(),
            batch_label: Some("batch_it".to_string()),
        })
        .await?;

    assert_eq!(report.output_path, out_dir.join("batch_it.xlsx"));
    assert_eq!(report.metadata.rows_in, 2);
    assert_eq!(report.metadata.rows_out, 2);

    let bytes = std::fs::read(&report.output_path)?;
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    assert_eq!(workbook.sheet_names(), vec!["enriched", "meta", "columns"]);

    let enriched = workbook.worksheet_range("enriched")?;
    assert_eq!(enriched.height(), 3);
    assert_eq!(cell(&enriched, "APN", 1), Some(Data::String("12-345".into())));
    assert_eq!(cell(&enriched, "APN_norm", 1), Some(Data::String("12345".into())));
    assert_eq!(cell(&enriched, "County Finder", 1), Some(Data::String("Sangamon".into())));
    assert_eq!(cell(&enriched, "Owner", 1), Some(Data::String("Ann Lee".into())));
    assert_eq!(cell(&enriched, "Owner", 2), Some(Data::Empty));
    assert_eq!(
        cell(&enriched, "Whitepages", 2),
        Some(Data::String("https://www.whitepages.com/address/Reno-NV".into()))
    );
    assert_eq!(cell(&enriched, "confidence_score", 1), Some(Data::Float(1.0)));
    // 3/12 + 0.1 + 0.1
    assert_eq!(cell(&enriched, "confidence_score", 2), Some(Data::Float(0.45)));
    assert!(cell(&enriched, "APN_key", 0).is_none());

    let meta = workbook.worksheet_range("meta")?;
    assert_eq!(cell(&meta, "rows_in", 1), Some(Data::Float(2.0)));
    assert_eq!(
        cell(&meta, "toggles", 1),
        Some(Data::String(r#"{"county":true,"osint":true,"social":true}"#.into()))
    );

    let columns = workbook.worksheet_range("columns")?;
    assert_eq!(columns.height() as usize, report.column_count + 1);

    Ok(())
}

#[tokio::test]
async fn test_xlsx_leads_are_read_through_workbook_strategy() -> Result<()> {
    let dir = tempdir()?;
    let leads = dir.path().join("leads.xlsx");

    let mut input = Workbook::new();
    let sheet = input.add_worksheet();
    sheet.write_string(0, 0, "APN")?;
    sheet.write_string(0, 1, "Site Address")?;
    sheet.write_number(1, 0, 12345.0)?;
    sheet.write_string(1, 1, "9 Pine Rd")?;
    input.save(&leads)?;

    let table = load_table(&std::fs::read(&leads)?, "leads.xlsx").expect("xlsx loads");
    assert_eq!(table.text(0, "APN"), "12345");

    let report = use_case(dir.path())?
        .run(EnrichRequest {
            leads: SourceRef::File(leads),
            propwire: None,
            property_radar: None,
            toggles: EnrichToggles { county: false, osint: false, social: true },
            batch_label: Some("xlsx_batch".to_string()),
        })
        .await?;

    // APN, Property Address, 4 backfilled, 2 derived, 3 social, score
    assert_eq!(report.column_count, 2 + 4 + 2 + 3 + 1);
    Ok(())
}

#[tokio::test]
async fn test_unreadable_leads_produce_no_workbook() -> Result<()> {
    let dir = tempdir()?;
    let leads = dir.path().join("leads.xlsx");
    std::fs::write(&leads, [0xffu8, 0xfe, 0x00, 0x9c])?;
    let out_dir = dir.path().join("out");

    let err = use_case(&out_dir)?
        .run(EnrichRequest {
            leads: SourceRef::File(leads),
            propwire: None,
            property_radar: None,
            toggles: EnrichToggles::default(),
            batch_label: Some("never".to_string()),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, EnrichError::UnreadableSource(_)));
    assert!(!out_dir.exists());
    Ok(())
}
