use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use log::warn;

use super::model::{columns, ComponentRow, NrmRow, COMPONENT_HEADERS, NRM_HEADERS};
use crate::error::{Rs3Error, Rs3Result};

pub const NRM_TABLE_PREFIX: &str = "NRM_";
pub const COMPONENT_TABLE_PREFIX: &str = "Summary_Components_";
pub const SUMMARY_TABLE_PREFIX: &str = "Mean_Int_";
pub const TABLE_EXTENSION: &str = "txt";

// ---------------------------------------------------------------------------
// File naming
// ---------------------------------------------------------------------------

pub fn nrm_table_name(folder: &str) -> String {
    format!("{NRM_TABLE_PREFIX}{folder}.{TABLE_EXTENSION}")
}

pub fn component_table_name(folder: &str) -> String {
    format!("{COMPONENT_TABLE_PREFIX}{folder}.{TABLE_EXTENSION}")
}

/// `Mean_Int_<stem>.txt` for an intermediate table.
pub fn summary_table_name(table: &Path) -> String {
    format!("{SUMMARY_TABLE_PREFIX}{}.{TABLE_EXTENSION}", file_stem(table))
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Tables in `dir` whose file name starts with `prefix` and ends in `.txt`,
/// sorted by name.
pub fn find_tables(dir: &Path, prefix: &str) -> Rs3Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| Rs3Error::io(dir, e))? {
        let path = entry.map_err(|e| Rs3Error::io(dir, e))?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let is_txt = path.extension().and_then(|e| e.to_str()) == Some(TABLE_EXTENSION);
        if name.starts_with(prefix) && is_txt && path.is_file() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write a header and records as comma-separated lines ending in `\n`.
pub fn write_table<W, I, R>(writer: W, headers: &[&str], records: I) -> Rs3Result<()>
where
    W: Write,
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);

    wtr.write_record(headers)?;
    for record in records {
        wtr.write_record(record)?;
    }
    wtr.flush().map_err(|e| Rs3Error::Csv(e.into()))?;
    Ok(())
}

pub fn write_nrm_table<W: Write>(writer: W, rows: &[NrmRow]) -> Rs3Result<()> {
    write_table(writer, NRM_HEADERS, rows.iter().map(NrmRow::record))
}

pub fn write_component_table<W: Write>(writer: W, rows: &[ComponentRow]) -> Rs3Result<()> {
    write_table(writer, COMPONENT_HEADERS, rows.iter().map(ComponentRow::record))
}

pub fn create_file(path: &Path) -> Rs3Result<File> {
    File::create(path).map_err(|e| Rs3Error::io(path, e))
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Nrm,
    Components,
}

impl TableKind {
    pub fn headers(self) -> &'static [&'static str] {
        match self {
            TableKind::Nrm => NRM_HEADERS,
            TableKind::Components => COMPONENT_HEADERS,
        }
    }
}

/// Component-only columns of a components table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentCells {
    pub intensity: String,
    pub limit1: String,
    pub limit2: String,
}

/// The columns the site aggregation needs from one table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// 1-based data row number (the header is row 0).
    pub row: usize,
    pub sample: String,
    pub nrm: String,
    pub component: Option<ComponentCells>,
}

#[derive(Debug)]
pub struct Table {
    pub path: PathBuf,
    pub kind: TableKind,
    pub rows: Vec<TableRow>,
}

/// Read an intermediate table previously written by this crate.
///
/// The layout is chosen from the header, which must match one of the two
/// layouts exactly. Rows with too few fields are logged and skipped.
pub fn read_table(path: &Path) -> Rs3Result<Table> {
    let file = File::open(path).map_err(|e| Rs3Error::io(path, e))?;
    read_table_from(file, path)
}

pub fn read_table_from<R: std::io::Read>(reader: R, path: &Path) -> Rs3Result<Table> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let kind = if headers.len() == COMPONENT_HEADERS.len() {
        TableKind::Components
    } else {
        TableKind::Nrm
    };
    validate_headers(&headers, kind.headers(), path)?;

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let row = idx + 1;
        let record = result?;
        match table_row(&record, kind, row) {
            Some(table_row) => rows.push(table_row),
            None => warn!(
                "{}: row {row}: expected {} fields, found {}; skipping",
                path.display(),
                kind.headers().len(),
                record.len()
            ),
        }
    }

    Ok(Table {
        path: path.to_path_buf(),
        kind,
        rows,
    })
}

fn table_row(record: &StringRecord, kind: TableKind, row: usize) -> Option<TableRow> {
    if record.len() < kind.headers().len() {
        return None;
    }
    let cell = |i: usize| record.get(i).unwrap_or("").to_string();
    let component = match kind {
        TableKind::Nrm => None,
        TableKind::Components => Some(ComponentCells {
            intensity: cell(columns::COMPONENT_INTENSITY),
            limit1: cell(columns::LIMIT1),
            limit2: cell(columns::LIMIT2),
        }),
    };
    Some(TableRow {
        row,
        sample: cell(columns::SAMPLE),
        nrm: cell(columns::NRM),
        component,
    })
}

fn validate_headers(actual: &StringRecord, expected: &[&str], path: &Path) -> Rs3Result<()> {
    let header_error = |index: usize, expected: &str, found: &str| Rs3Error::Header {
        file: path.to_path_buf(),
        index,
        expected: expected.to_string(),
        found: found.to_string(),
    };

    for (i, expected) in expected.iter().enumerate() {
        match actual.get(i) {
            Some(found) if found == *expected => {}
            Some(found) => return Err(header_error(i + 1, expected, found)),
            None => return Err(header_error(i + 1, expected, "")),
        }
    }
    if actual.len() > expected.len() {
        let extra = actual.get(expected.len()).unwrap_or("");
        return Err(header_error(expected.len() + 1, "", extra));
    }
    Ok(())
}
