//! Folder-to-file CSV combiner.
//!
//! Each configured group names a folder of per-station CSV files and the
//! combined file to produce. Files are read in sorted name order so repeated
//! runs over an unchanged folder give byte-identical output.

use std::path::{Path, PathBuf};

use crate::config::{CombineGroup, HarvestConfig};
use crate::logging::{self, Component};
use crate::model::HarvestError;
use crate::table::{Table, concat_tables, read_indexed_csv, write_indexed_csv};

/// Result of combining one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineSummary {
    pub output_file: PathBuf,
    pub files_read: usize,
    pub rows_written: usize,
    pub columns: usize,
}

/// Regular files directly inside `dir`, sorted by file name.
pub fn list_input_files(dir: &Path) -> Result<Vec<PathBuf>, HarvestError> {
    let entries = std::fs::read_dir(dir).map_err(|e| HarvestError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| HarvestError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Reads every file in the group's folder and writes the concatenation.
pub fn combine_group(group: &CombineGroup) -> Result<CombineSummary, HarvestError> {
    let files = list_input_files(&group.input_dir)?;

    let mut tables: Vec<Table> = Vec::with_capacity(files.len());
    for file in &files {
        let table = read_indexed_csv(file)?;
        logging::debug(
            Component::Combine,
            file.file_name().and_then(|n| n.to_str()),
            &format!("read {} rows", table.len()),
        );
        tables.push(table);
    }

    let combined = concat_tables(&tables);
    if let Some(parent) = group.output_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| HarvestError::io(parent, e))?;
        }
    }
    write_indexed_csv(&combined, &group.output_file)?;

    let summary = CombineSummary {
        output_file: group.output_file.clone(),
        files_read: files.len(),
        rows_written: combined.len(),
        columns: combined.headers.len(),
    };
    logging::info(
        Component::Combine,
        None,
        &format!(
            "{} -> {}: {} files, {} rows, {} columns",
            group.input_dir.display(),
            summary.output_file.display(),
            summary.files_read,
            summary.rows_written,
            summary.columns
        ),
    );
    Ok(summary)
}

/// Combines every configured group in order. The first failure stops the run.
pub fn run_combine(config: &HarvestConfig) -> Result<Vec<CombineSummary>, HarvestError> {
    let mut summaries = Vec::with_capacity(config.combine.groups.len());
    for group in &config.combine.groups {
        summaries.push(combine_group(group)?);
    }
    logging::log_run_summary(Component::Combine, summaries.len(), summaries.len(), 0);
    Ok(summaries)
}
