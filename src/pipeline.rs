use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};

use crate::config::Config;
use crate::data::collector::collect_rs3_files;
use crate::data::intensity::{nrm_values, write_histogram, IntensityDistribution};
use crate::data::loader::load_file;
use crate::data::sites::{summarize_sites, write_summary_table};
use crate::data::table::{
    component_table_name, create_file, file_stem, find_tables, nrm_table_name, read_table,
    summary_table_name, write_component_table, write_nrm_table, COMPONENT_TABLE_PREFIX,
    NRM_TABLE_PREFIX, TABLE_EXTENSION,
};
use crate::error::Rs3Error;

pub const HISTOGRAM_PREFIX: &str = "Hist_";

// ---------------------------------------------------------------------------
// Stage 1: .rs3 files → NRM and component tables
// ---------------------------------------------------------------------------

/// What happened to one folder during extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderReport {
    pub folder: String,
    pub files: usize,
    /// Files that could not be read or had no usable specimen line.
    pub skipped_files: usize,
    /// Lines dropped as malformed.
    pub skipped_lines: usize,
    pub nrm_rows: usize,
    pub component_rows: usize,
}

/// Parse every `.rs3` file under the base directory and write one NRM table
/// and one components table per folder.
pub fn extract(config: &Config) -> Result<Vec<FolderReport>> {
    let out_dir = config.output_dir();
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let files_by_folder = collect_rs3_files(&config.base_dir)
        .with_context(|| format!("scanning {}", config.base_dir.display()))?;
    if files_by_folder.is_empty() {
        warn!("No .rs3 files found under {}", config.base_dir.display());
    }

    files_by_folder
        .iter()
        .map(|(folder, files)| extract_folder(folder, files, out_dir))
        .collect()
}

/// Parse one folder's files and write its two tables. A file that cannot be
/// read or has no usable specimen line is logged, counted and skipped.
pub fn extract_folder(folder: &str, files: &[PathBuf], out_dir: &Path) -> Result<FolderReport> {
    let mut report = FolderReport {
        folder: folder.to_string(),
        files: files.len(),
        ..Default::default()
    };
    let mut nrm_rows = Vec::new();
    let mut component_rows = Vec::new();

    for file in files {
        let parsed = match load_file(file) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Skipping file: {e}");
                report.skipped_files += 1;
                continue;
            }
        };
        for issue in &parsed.issues {
            warn!("{issue}; line skipped");
        }
        report.skipped_lines += parsed.issues.len();
        if parsed.is_empty() {
            debug!("{}: no NRM or component lines", file.display());
        }
        nrm_rows.extend(parsed.nrm);
        component_rows.extend(parsed.components);
    }

    let nrm_path = out_dir.join(nrm_table_name(folder));
    write_nrm_table(create_file(&nrm_path)?, &nrm_rows)
        .with_context(|| format!("writing {}", nrm_path.display()))?;
    let comp_path = out_dir.join(component_table_name(folder));
    write_component_table(create_file(&comp_path)?, &component_rows)
        .with_context(|| format!("writing {}", comp_path.display()))?;

    report.nrm_rows = nrm_rows.len();
    report.component_rows = component_rows.len();
    info!(
        "{folder}: {} file(s), {} skipped, {} NRM row(s), {} component row(s), {} bad line(s)",
        report.files,
        report.skipped_files,
        report.nrm_rows,
        report.component_rows,
        report.skipped_lines
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Stage 2: tables → per-site means
// ---------------------------------------------------------------------------

/// Write `Mean_Int_*` for every NRM and components table in the output
/// directory. Returns the paths written.
///
/// Unreadable or foreign tables are logged and skipped. In strict mode a
/// table with split sites is not written and the run fails once all other
/// tables are done.
pub fn summarize(config: &Config) -> Result<Vec<PathBuf>> {
    let out_dir = config.output_dir();
    let mut tables = find_tables(out_dir, COMPONENT_TABLE_PREFIX)
        .with_context(|| format!("listing tables in {}", out_dir.display()))?;
    tables.extend(find_tables(out_dir, NRM_TABLE_PREFIX)?);
    info!("Summarizing {} table(s) in {}", tables.len(), out_dir.display());

    let mut written = Vec::new();
    let mut split_tables = 0usize;
    for path in &tables {
        let table = match read_table(path) {
            Ok(table) => table,
            Err(e) => {
                warn!("Skipping table: {e}");
                continue;
            }
        };
        if table.rows.is_empty() {
            warn!("{}: no data rows", path.display());
        }

        let summaries = match summarize_sites(&table, config.site_delimiter, config.strict_sites) {
            Ok(summaries) => summaries,
            Err(e @ Rs3Error::NonContiguousSite { .. }) => {
                warn!("{e}");
                split_tables += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let out_path = out_dir.join(summary_table_name(path));
        write_summary_table(create_file(&out_path)?, table.kind, &summaries)
            .with_context(|| format!("writing {}", out_path.display()))?;
        info!("{}: {} site(s)", out_path.display(), summaries.len());
        written.push(out_path);
    }

    if split_tables > 0 {
        bail!("{split_tables} table(s) have non-contiguous sites");
    }
    Ok(written)
}

// ---------------------------------------------------------------------------
// Stage 3: NRM tables → intensity distribution
// ---------------------------------------------------------------------------

/// Compute the intensity distribution of every NRM table and write its bins
/// as `Hist_<stem>.txt`.
pub fn distribution(config: &Config) -> Result<Vec<PathBuf>> {
    let out_dir = config.output_dir();
    let tables = find_tables(out_dir, NRM_TABLE_PREFIX)
        .with_context(|| format!("listing tables in {}", out_dir.display()))?;

    let mut written = Vec::new();
    for path in &tables {
        let table = match read_table(path) {
            Ok(table) => table,
            Err(e) => {
                warn!("Skipping table: {e}");
                continue;
            }
        };
        let Some(dist) = IntensityDistribution::from_values(nrm_values(&table), config.histogram_bins)
        else {
            warn!("{}: no positive NRM values, no histogram", path.display());
            continue;
        };

        let [q1, q2, q3] = dist.quartiles;
        info!(
            "{}: n = {}, min {:.4} mA/m, max {:.4} mA/m, quartiles {q1:.4} / {q2:.4} / {q3:.4}",
            path.display(),
            dist.values.len(),
            dist.min(),
            dist.max()
        );
        debug!("{}: ECDF has {} step(s)", path.display(), dist.ecdf().len());

        let out_path = out_dir.join(histogram_table_name(path));
        write_histogram(create_file(&out_path)?, &dist)
            .with_context(|| format!("writing {}", out_path.display()))?;
        written.push(out_path);
    }
    Ok(written)
}

pub fn histogram_table_name(table: &Path) -> String {
    format!("{HISTOGRAM_PREFIX}{}.{TABLE_EXTENSION}", file_stem(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn rs3(sample: &str, nrm: &str, limits: Option<(&str, &str)>) -> String {
        let mut text = format!(
            "Name  Sdec Sinc Bdec Binc\n{sample}   120  35   210  12\n\
T  0    {nrm}  181.2  40.1\nT  200  1.0E-03  182.0  41.0\n"
        );
        if let Some((l1, l2)) = limits {
            text.push_str(&format!(
                "C  ChRM  2.0E-03  183.0  40.2  176.4  54.0  171.5  41.1  2.7  {l1}  {l2}  5\n"
            ));
        }
        text
    }

    fn config(dir: &TempDir) -> Config {
        Config {
            base_dir: dir.path().join("data"),
            output_dir: Some(dir.path().join("out")),
            ..Config::default()
        }
    }

    fn write(path: &Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn full_run_writes_all_tables() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);
        let data = &cfg.base_dir;
        write(&data.join("AB/AB-01.rs3"), &rs3("AB-01", "5.0E-03", Some(("200C", "580C"))));
        write(&data.join("AB/AB-02.rs3"), &rs3("AB-02", "7.0E-03", Some(("300C", "600C"))));
        write(&data.join("AB/late/CD-01.rs3"), &rs3("CD-01", "1.0E-02", None));
        write(&data.join("AB/broken.rs3"), "only a header\n");

        let reports = extract(&cfg).unwrap();
        assert_eq!(
            reports,
            vec![FolderReport {
                folder: "AB".into(),
                files: 4,
                skipped_files: 1,
                skipped_lines: 0,
                nrm_rows: 3,
                component_rows: 2,
            }]
        );

        let out = cfg.output_dir();
        let nrm = fs::read_to_string(out.join("NRM_AB.txt")).unwrap();
        assert_eq!(
            nrm,
            "Sample,Sdec,Idec,Bdec,BInc,NRM_(A/m)\n\
AB-01,120,35,210,12,5.0E-03\n\
AB-02,120,35,210,12,7.0E-03\n\
CD-01,120,35,210,12,1.0E-02\n"
        );
        let comp = fs::read_to_string(out.join("Summary_Components_AB.txt")).unwrap();
        assert_eq!(comp.lines().count(), 3);
        assert!(comp.lines().nth(1).unwrap().ends_with(",2.7,200C,580C"));

        let written = summarize(&cfg).unwrap();
        assert_eq!(written.len(), 2);
        let mean_nrm = fs::read_to_string(out.join("Mean_Int_NRM_AB.txt")).unwrap();
        let lines: Vec<&str> = mean_nrm.lines().collect();
        assert_eq!(lines[0], "Site,n,NRM_comp_mean_(A/m),stdev");
        assert!(lines[1].starts_with("AB,2,0.006"), "{}", lines[1]);
        assert_eq!(lines[2], "CD,1,0.01,0.0");

        let mean_comp = fs::read_to_string(out.join("Mean_Int_Summary_Components_AB.txt")).unwrap();
        let row = mean_comp.lines().nth(1).unwrap();
        assert!(row.ends_with(",2,0,250.0,590.0,Nan,Nan"), "{row}");

        let hist = distribution(&cfg).unwrap();
        assert_eq!(hist, vec![out.join("Hist_NRM_AB.txt")]);
        let bins = fs::read_to_string(&hist[0]).unwrap();
        assert_eq!(bins.lines().count(), 50);
    }

    #[test]
    fn strict_mode_fails_on_split_sites() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config(&dir);
        cfg.strict_sites = true;
        let out = cfg.output_dir().to_path_buf();
        write(
            &out.join("NRM_X.txt"),
            "Sample,Sdec,Idec,Bdec,BInc,NRM_(A/m)\nA-1,1,2,3,4,1.0\nB-1,1,2,3,4,2.0\nA-2,1,2,3,4,3.0\n",
        );
        write(
            &out.join("NRM_Y.txt"),
            "Sample,Sdec,Idec,Bdec,BInc,NRM_(A/m)\nA-1,1,2,3,4,1.0\n",
        );

        assert!(summarize(&cfg).is_err());
        assert!(!out.join("Mean_Int_NRM_X.txt").exists());
        assert!(out.join("Mean_Int_NRM_Y.txt").exists());
    }

    #[test]
    fn foreign_tables_are_skipped() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);
        let out = cfg.output_dir().to_path_buf();
        write(&out.join("NRM_notes.txt"), "just,some,notes\n");
        assert!(summarize(&cfg).unwrap().is_empty());
    }

    #[test]
    fn unreadable_file_is_skipped_and_the_folder_still_written() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        let good = data.join("AB/AB-01.rs3");
        write(&good, &rs3("AB-01", "5.0E-03", Some(("200C", "580C"))));
        let gone = data.join("AB/AB-02.rs3");

        let report = extract_folder("AB", &[good, gone], &out).unwrap();
        assert_eq!(report.files, 2);
        assert_eq!(report.skipped_files, 1);
        assert_eq!(report.nrm_rows, 1);
        assert_eq!(report.component_rows, 1);

        let nrm = fs::read_to_string(out.join("NRM_AB.txt")).unwrap();
        assert_eq!(nrm.lines().count(), 2);
        assert!(nrm.ends_with("AB-01,120,35,210,12,5.0E-03\n"), "{nrm}");
        assert!(out.join("Summary_Components_AB.txt").exists());
    }

    #[test]
    fn missing_base_dir_is_fatal() {
        let dir = TempDir::new().unwrap();
        assert!(extract(&config(&dir)).is_err());
    }
}
