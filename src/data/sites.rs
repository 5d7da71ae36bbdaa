use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use log::warn;

use super::model::{DemagRange, Limit, COMPONENT_SUMMARY_HEADERS, NRM_SUMMARY_HEADERS};
use super::table::{write_table, ComponentCells, Table, TableKind, TableRow};
use crate::error::{Rs3Error, Rs3Result};

/// Text written for a statistic with no input values.
pub const MISSING: &str = "Nan";

// ---------------------------------------------------------------------------
// Site keys
// ---------------------------------------------------------------------------

/// Site name of a sample: everything before the first `delimiter`, or the
/// whole sample name when the delimiter is absent.
pub fn site_key(sample: &str, delimiter: char) -> &str {
    sample.split(delimiter).next().unwrap_or(sample)
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n); NaN for an empty slice.
pub fn population_stdev(values: &[f64]) -> f64 {
    let m = mean(values);
    if m.is_nan() {
        return m;
    }
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Mean and population standard deviation of one quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub mean: f64,
    pub stdev: f64,
}

impl Moments {
    pub fn of(values: &[f64]) -> Self {
        Moments {
            mean: mean(values),
            stdev: population_stdev(values),
        }
    }
}

/// Mean lower and upper bound of one demagnetization axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeMeans {
    /// Components contributing to this axis.
    pub count: usize,
    pub min: f64,
    pub max: f64,
}

// ---------------------------------------------------------------------------
// SiteSummary – one output row
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SiteSummary {
    pub site: String,
    /// Values behind the site mean: parsed NRM values for NRM tables,
    /// parsed component intensities for components tables.
    pub n: usize,
    pub nrm: Moments,
    /// Present for components tables only.
    pub component: Option<ComponentSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSummary {
    pub intensity: Moments,
    pub thermal: RangeMeans,
    pub alternating_field: RangeMeans,
}

impl SiteSummary {
    pub fn record(&self) -> Vec<String> {
        let mut rec = vec![
            self.site.clone(),
            self.n.to_string(),
            format_value(self.nrm.mean),
            format_value(self.nrm.stdev),
        ];
        if let Some(comp) = &self.component {
            rec.extend([
                format_value(comp.intensity.mean),
                format_value(comp.intensity.stdev),
                comp.thermal.count.to_string(),
                comp.alternating_field.count.to_string(),
                format_value(round1(comp.thermal.min)),
                format_value(round1(comp.thermal.max)),
                format_value(round1(comp.alternating_field.min)),
                format_value(round1(comp.alternating_field.max)),
            ]);
        }
        rec
    }
}

/// Shortest round-trip representation, always with a decimal point;
/// NaN becomes [`MISSING`].
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        MISSING.to_string()
    } else {
        format!("{v:?}")
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Group accumulator
// ---------------------------------------------------------------------------

/// The single in-flight site group.
#[derive(Debug)]
struct SiteAccumulator {
    site: String,
    nrm: Vec<f64>,
    intensity: Vec<f64>,
    t_min: Vec<f64>,
    t_max: Vec<f64>,
    c_min: Vec<f64>,
    c_max: Vec<f64>,
}

impl SiteAccumulator {
    fn new(site: &str) -> Self {
        SiteAccumulator {
            site: site.to_string(),
            nrm: Vec::new(),
            intensity: Vec::new(),
            t_min: Vec::new(),
            t_max: Vec::new(),
            c_min: Vec::new(),
            c_max: Vec::new(),
        }
    }

    fn add(&mut self, row: &TableRow, file: &Path) {
        match parse_number(&row.nrm, "NRM_(A/m)", row.row, file) {
            Ok(v) => self.nrm.push(v),
            Err(e) => warn!("{e}; excluded from site '{}'", self.site),
        }

        let Some(cells) = &row.component else {
            return;
        };
        match parse_number(&cells.intensity, "M(A/m)", row.row, file) {
            Ok(v) => self.intensity.push(v),
            Err(e) => warn!("{e}; excluded from site '{}'", self.site),
        }
        match classify_limits(cells, row.row, file) {
            Ok(DemagRange::Thermal { min, max }) => {
                self.t_min.push(min);
                self.t_max.push(max);
            }
            Ok(DemagRange::AlternatingField { min, max }) => {
                self.c_min.push(min);
                self.c_max.push(max);
            }
            Ok(DemagRange::Unclassified) => {}
            Err(e) => warn!("{e}; no temperature or coercivity for site '{}'", self.site),
        }
    }

    fn finish(self, kind: TableKind) -> SiteSummary {
        let n = match kind {
            TableKind::Nrm => self.nrm.len(),
            TableKind::Components => self.intensity.len(),
        };
        let component = match kind {
            TableKind::Nrm => None,
            TableKind::Components => Some(ComponentSummary {
                intensity: Moments::of(&self.intensity),
                thermal: RangeMeans {
                    count: self.t_min.len(),
                    min: mean(&self.t_min),
                    max: mean(&self.t_max),
                },
                alternating_field: RangeMeans {
                    count: self.c_min.len(),
                    min: mean(&self.c_min),
                    max: mean(&self.c_max),
                },
            }),
        };
        SiteSummary {
            site: self.site,
            n,
            nrm: Moments::of(&self.nrm),
            component,
        }
    }
}

fn parse_number(value: &str, field: &'static str, row: usize, file: &Path) -> Rs3Result<f64> {
    value.trim().parse::<f64>().map_err(|_| Rs3Error::Value {
        file: file.to_path_buf(),
        row,
        field,
        value: value.to_string(),
    })
}

/// Classify a component by its limits. `Limit1` decides the axis and `Limit2`
/// must carry the same unit.
pub fn classify_limits(cells: &ComponentCells, row: usize, file: &Path) -> Rs3Result<DemagRange> {
    let value_error = |field: &'static str, value: &str| Rs3Error::Value {
        file: file.to_path_buf(),
        row,
        field,
        value: value.to_string(),
    };
    let lower = Limit::parse(&cells.limit1).map_err(|_| value_error("Limit1", &cells.limit1))?;
    if lower == Limit::Unrecognized {
        return Ok(DemagRange::Unclassified);
    }
    let upper = Limit::parse(&cells.limit2).map_err(|_| value_error("Limit2", &cells.limit2))?;

    match (lower, upper) {
        (Limit::Temperature(min), Limit::Temperature(max)) => Ok(DemagRange::Thermal { min, max }),
        (Limit::Coercivity(min), Limit::Coercivity(max)) => {
            Ok(DemagRange::AlternatingField { min, max })
        }
        _ => Err(Rs3Error::Format {
            file: file.to_path_buf(),
            line: row + 1,
            reason: format!(
                "limits '{}' and '{}' do not share a unit",
                cells.limit1, cells.limit2
            ),
        }),
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Average a table per site.
///
/// Rows are grouped by runs of equal site key in table order; the table is
/// never re-sorted, so a site split across two runs yields two output rows.
/// With `strict` set, such a split is an error instead.
pub fn summarize_sites(table: &Table, delimiter: char, strict: bool) -> Rs3Result<Vec<SiteSummary>> {
    let mut summaries = Vec::new();
    let mut closed: HashSet<String> = HashSet::new();

    let open = table
        .rows
        .iter()
        .try_fold(None::<SiteAccumulator>, |current, row| {
            let key = site_key(&row.sample, delimiter);
            let mut acc = match current {
                Some(acc) if acc.site == key => acc,
                previous => {
                    if let Some(prev) = previous {
                        closed.insert(prev.site.clone());
                        summaries.push(prev.finish(table.kind));
                    }
                    if closed.contains(key) {
                        if strict {
                            return Err(Rs3Error::NonContiguousSite {
                                file: table.path.clone(),
                                site: key.to_string(),
                                row: row.row,
                            });
                        }
                        warn!(
                            "{}: row {}: site '{key}' is not contiguous; it will appear more than once",
                            table.path.display(),
                            row.row
                        );
                    }
                    SiteAccumulator::new(key)
                }
            };
            acc.add(row, &table.path);
            Ok(Some(acc))
        })?;

    if let Some(acc) = open {
        summaries.push(acc.finish(table.kind));
    }
    Ok(summaries)
}

/// Write `Mean_Int_*` rows for a table of the given kind.
pub fn write_summary_table<W: Write>(
    writer: W,
    kind: TableKind,
    summaries: &[SiteSummary],
) -> Rs3Result<()> {
    let headers = match kind {
        TableKind::Nrm => NRM_SUMMARY_HEADERS,
        TableKind::Components => COMPONENT_SUMMARY_HEADERS,
    };
    write_table(writer, headers, summaries.iter().map(SiteSummary::record))
}
