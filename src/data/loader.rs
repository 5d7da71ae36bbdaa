use std::path::Path;

use log::debug;

use super::model::{ComponentRow, FittedComponent, LimitUnit, NrmRow, ParsedFile, SpecimenInfo};
use crate::error::{Rs3Error, Rs3Result};

/// Token that marks the NRM (undemagnetized) step in the second column.
const NRM_STEP: &str = "0";
/// First token of a fitted-component line.
const COMPONENT_MARKER: &str = "C";
/// Fields of a component line after the marker.
const COMPONENT_FIELDS: usize = 11;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Read and parse one `.rs3` file.
///
/// The file handle is dropped before parsing starts. Bytes that are not valid
/// UTF-8 are dropped rather than rejected.
pub fn load_file(path: &Path) -> Rs3Result<ParsedFile> {
    let bytes = std::fs::read(path).map_err(|e| Rs3Error::io(path, e))?;
    let text = decode_lossy(&bytes);
    debug!("{}: read {} bytes", path.display(), bytes.len());
    parse_rs3(&text, path)
}

/// Parse the text of one `.rs3` file.
///
/// Line 0 is a header, line 1 carries the specimen metadata. Every line whose
/// second token is `0` is an NRM line (the last one wins) and every line whose
/// first token is `C` is a fitted component. Malformed lines are recorded in
/// [`ParsedFile::issues`] and skipped; only a missing or short metadata line
/// fails the whole file.
pub fn parse_rs3(text: &str, source: &Path) -> Rs3Result<ParsedFile> {
    let collapsed = collapse_spaces(text);
    let lines: Vec<Vec<&str>> = collapsed.lines().map(tokenize).collect();

    let specimen = specimen_info(&lines, source)?;

    let mut parsed = ParsedFile::default();
    let mut nrm: Option<String> = None;
    let mut components = Vec::new();

    for (idx, tokens) in lines.iter().enumerate() {
        let line_no = idx + 1;
        if is_blank(tokens) {
            continue;
        }
        if tokens.len() < 2 {
            // Line 0 is a free-form header; it is scanned but never validated.
            if idx == 0 {
                continue;
            }
            parsed.issues.push(format_error(
                source,
                line_no,
                format!("expected at least 2 fields, found {}", tokens.len()),
            ));
            continue;
        }

        if tokens[1] == NRM_STEP {
            match tokens.get(2) {
                Some(value) => nrm = Some(value.to_string()),
                None => parsed.issues.push(format_error(
                    source,
                    line_no,
                    "NRM line has no intensity field".to_string(),
                )),
            }
        }

        if tokens[0] == COMPONENT_MARKER {
            match component_fields(tokens) {
                Ok(component) => components.push(component),
                Err(reason) => parsed.issues.push(format_error(source, line_no, reason)),
            }
        }
    }

    parsed.components = components
        .into_iter()
        .map(|component| ComponentRow {
            specimen: specimen.clone(),
            nrm: nrm.clone(),
            component,
        })
        .collect();
    parsed.nrm = nrm.map(|nrm| NrmRow { specimen, nrm });

    Ok(parsed)
}

/// Decode bytes as UTF-8, dropping invalid sequences.
pub fn decode_lossy(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

// ---------------------------------------------------------------------------
// Tokenizing helpers
// ---------------------------------------------------------------------------

/// Collapse every run of spaces into one space. Tabs are left alone.
fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_space = false;
    for ch in text.chars() {
        if ch == ' ' {
            if !prev_space {
                out.push(ch);
            }
            prev_space = true;
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out
}

fn tokenize(line: &str) -> Vec<&str> {
    line.split(' ').collect()
}

fn is_blank(tokens: &[&str]) -> bool {
    tokens.iter().all(|t| t.trim().is_empty())
}

fn specimen_info(lines: &[Vec<&str>], source: &Path) -> Rs3Result<SpecimenInfo> {
    let tokens = lines.get(1).ok_or_else(|| {
        format_error(source, 2, "missing specimen line".to_string())
    })?;
    match tokens.as_slice() {
        [sample, sdec, idec, bdec, binc, ..] => Ok(SpecimenInfo {
            sample: sample.to_string(),
            sdec: sdec.to_string(),
            idec: idec.to_string(),
            bdec: bdec.to_string(),
            binc: binc.to_string(),
        }),
        _ => Err(format_error(
            source,
            2,
            format!("specimen line needs 5 fields, found {}", tokens.len()),
        )),
    }
}

fn component_fields(tokens: &[&str]) -> Result<FittedComponent, String> {
    let fields = tokens
        .get(1..=COMPONENT_FIELDS)
        .ok_or_else(|| {
            format!(
                "component line needs {COMPONENT_FIELDS} fields after 'C', found {}",
                tokens.len() - 1
            )
        })?;
    let component = FittedComponent::from_tokens(fields)
        .ok_or_else(|| "component line has the wrong number of fields".to_string())?;

    match (
        LimitUnit::of(&component.limit1),
        LimitUnit::of(&component.limit2),
    ) {
        (Some(a), Some(b)) if a != b => Err(format!(
            "component '{}' mixes limit units: '{}' and '{}'",
            component.label, component.limit1, component.limit2
        )),
        _ => Ok(component),
    }
}

fn format_error(source: &Path, line: usize, reason: String) -> Rs3Error {
    Rs3Error::Format {
        file: source.to_path_buf(),
        line,
        reason,
    }
}
