use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, ArrayRef, AsArray, Float32Array, Float64Array, Float64Builder, LargeListArray,
    ListArray, ListBuilder, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use csv::{ReaderBuilder, Trim};
use log::{debug, info};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::model::{Catalog, CatalogRecord, Spectrum};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load the reference catalog.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – `label` string column plus `x` and `y` list columns
/// * `.json`    – `[{ "label": "...", "x": [...], "y": [...] }, ...]`
/// * `.csv`     – columns `label`, `x`, `y`; `x`/`y` hold semicolon-separated floats
///
/// Records are not checked for monotonic domains here; a malformed record
/// only fails its own comparison during ranking.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let records = match extension(path).as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported catalog extension: .{other}"),
    }
    .with_context(|| format!("loading catalog {}", path.display()))?;

    info!("loaded {} catalog record(s) from {}", records.len(), path.display());
    Ok(Catalog::from_records(records))
}

/// Load one spectrum from a two-column `x,y` text table.
///
/// Lines starting with `#` (instrument headers are usually `##KEY=value`)
/// and blank lines are skipped; whitespace around fields is ignored.
pub fn load_spectrum(path: &Path) -> Result<Spectrum> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("opening spectrum {}", path.display()))?;

    let mut x = Vec::new();
    let mut y = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("{}: row {row_no}", path.display()))?;
        if record.len() < 2 {
            bail!("{}: row {row_no} has {} column(s), expected 2", path.display(), record.len());
        }
        x.push(parse_float(&record[0], row_no, "x")?);
        y.push(parse_float(&record[1], row_no, "y")?);
    }
    debug!("read {} samples from {}", x.len(), path.display());

    Spectrum::new(x, y).with_context(|| format!("validating spectrum {}", path.display()))
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn parse_float(s: &str, row: usize, col: &str) -> Result<f64> {
    s.parse::<f64>()
        .with_context(|| format!("Row {row}, {col}: '{s}' is not a number"))
}

fn checked_record(label: String, x: Vec<f64>, y: Vec<f64>, row: usize) -> Result<CatalogRecord> {
    if x.len() != y.len() {
        bail!("Row {row} ({label}): x has {} values but y has {}", x.len(), y.len());
    }
    Ok(CatalogRecord::new(label, Spectrum { x, y }))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct JsonRecord {
    label: String,
    x: Vec<f64>,
    y: Vec<f64>,
}

fn load_json(path: &Path) -> Result<Vec<CatalogRecord>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let rows: Vec<JsonRecord> = serde_json::from_str(&text).context("parsing JSON records")?;

    rows.into_iter()
        .enumerate()
        .map(|(i, r)| checked_record(r.label, r.x, r.y, i))
        .collect()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with `label`, `x`, `y` (any order, extra columns ignored).
/// `x` and `y` contain semicolon-separated floats: `"100.0;100.5;101.0"`.
fn load_csv(path: &Path) -> Result<Vec<CatalogRecord>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers = reader.headers().context("reading CSV headers")?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .with_context(|| format!("CSV missing '{name}' column"))
    };
    let label_idx = column("label")?;
    let x_idx = column("x")?;
    let y_idx = column("y")?;

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;
        let field = |idx: usize| row.get(idx).unwrap_or("");

        let x = parse_semicolon_floats(field(x_idx), row_no, "x")?;
        let y = parse_semicolon_floats(field(y_idx), row_no, "y")?;
        records.push(checked_record(field(label_idx).trim().to_string(), x, y, row_no)?);
    }
    Ok(records)
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Expected schema:
/// - `label`: Utf8 or LargeUtf8
/// - `x`, `y`: List or LargeList of Float64 / Float32
///
/// Other columns are ignored. Works with files written by Pandas
/// (`df.to_parquet()`), Polars and [`write_parquet_catalog`].
fn load_parquet(path: &Path) -> Result<Vec<CatalogRecord>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?
        .build()
        .context("building parquet reader")?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let column = |name: &str| {
            schema
                .index_of(name)
                .map(|i| batch.column(i))
                .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))
        };
        let label_col = column("label")?;
        let x_col = column("x")?;
        let y_col = column("y")?;

        for row in 0..batch.num_rows() {
            let global = records.len();
            let label = extract_string(label_col, row)
                .with_context(|| format!("Row {global}: failed to read 'label'"))?;
            let x = extract_f64_list(x_col, row)
                .with_context(|| format!("Row {global}: failed to read 'x'"))?;
            let y = extract_f64_list(y_col, row)
                .with_context(|| format!("Row {global}: failed to read 'y'"))?;
            records.push(checked_record(label, x, y, global)?);
        }
    }
    Ok(records)
}

// -- Parquet / Arrow helpers --

fn extract_string(col: &ArrayRef, row: usize) -> Result<String> {
    if col.is_null(row) {
        bail!("null label");
    }
    match col.data_type() {
        DataType::Utf8 => Ok(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Ok(col.as_string::<i64>().value(row).to_string()),
        other => bail!("Expected Utf8 label column, got {other:?}"),
    }
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &ArrayRef, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values = match col.data_type() {
        DataType::List(_) => col
            .as_any()
            .downcast_ref::<ListArray>()
            .context("expected ListArray")?
            .value(row),
        DataType::LargeList(_) => col
            .as_any()
            .downcast_ref::<LargeListArray>()
            .context("expected LargeListArray")?
            .value(row),
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // The inner array can be Float64 or Float32
    if let Some(arr) = values.as_any().downcast_ref::<Float64Array>() {
        Ok(arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(arr) = values.as_any().downcast_ref::<Float32Array>() {
        Ok(arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values.data_type()
        )
    }
}

// ---------------------------------------------------------------------------
// Parquet writer
// ---------------------------------------------------------------------------

/// Write records in the layout [`load_catalog`] reads back.
pub fn write_parquet_catalog(path: &Path, records: &[CatalogRecord]) -> Result<()> {
    let mut x_builder = ListBuilder::new(Float64Builder::new());
    let mut y_builder = ListBuilder::new(Float64Builder::new());
    for record in records {
        x_builder.values().append_slice(&record.spectrum.x);
        x_builder.append(true);
        y_builder.values().append_slice(&record.spectrum.y);
        y_builder.append(true);
    }
    let x_array = x_builder.finish();
    let y_array = y_builder.finish();
    let label_array = StringArray::from(records.iter().map(|r| r.label.as_str()).collect::<Vec<_>>());

    let item = Arc::new(Field::new("item", DataType::Float64, true));
    let schema = Arc::new(Schema::new(vec![
        Field::new("label", DataType::Utf8, false),
        Field::new("x", DataType::List(item.clone()), false),
        Field::new("y", DataType::List(item), false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(label_array), Arc::new(x_array), Arc::new(y_array)],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn spectrum_csv_skips_comments_and_whitespace() {
        let file = write_file(
            ".csv",
            "##TITLE=sample\n##UNITS=1/cm\n100.0, 1.5\n\n 100.5 ,2.5\n101.0,3.5\n",
        );
        let s = load_spectrum(file.path()).unwrap();
        assert_eq!(s.x, vec![100.0, 100.5, 101.0]);
        assert_eq!(s.y, vec![1.5, 2.5, 3.5]);
    }

    #[test]
    fn spectrum_csv_rejects_garbage() {
        let file = write_file(".csv", "1.0,2.0\nabc,3.0\n");
        let err = load_spectrum(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("not a number"));
    }

    #[test]
    fn json_catalog_round_trip() {
        let file = write_file(
            ".json",
            r#"[{"label":"quartz","x":[1,2,3],"y":[0.1,0.2,0.3]},{"label":"calcite","x":[1,2],"y":[5,6]}]"#,
        );
        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.fetch_all()[1].label, "calcite");
        assert_eq!(catalog.fetch_all()[0].spectrum.y, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn csv_catalog_with_semicolon_lists() {
        let file = write_file(".csv", "label,x,y\ngypsum,1;2;3,4;5;6\n");
        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(catalog.fetch_all()[0].label, "gypsum");
        assert_eq!(catalog.fetch_all()[0].spectrum.x, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let file = write_file(".csv", "label,x,y\nbad,1;2;3,4;5\n");
        let err = load_catalog(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("x has 3 values but y has 2"));
    }

    #[test]
    fn parquet_catalog_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.parquet");
        let records = vec![
            CatalogRecord::new("a", Spectrum { x: vec![1.0, 2.0], y: vec![3.0, 4.0] }),
            CatalogRecord::new("b", Spectrum { x: vec![0.5, 1.5, 2.5], y: vec![1.0, 0.0, 1.0] }),
        ];
        write_parquet_catalog(&path, &records).unwrap();
        let catalog = load_catalog(&path).unwrap();
        assert_eq!(catalog.into_records(), records);
    }

    #[test]
    fn unknown_extension_is_an_error() {
        let file = write_file(".txt", "");
        assert!(load_catalog(file.path()).is_err());
    }
}
