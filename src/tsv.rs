//! Tab-separated output files, one per vendor per day.

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{prelude::*, record::Record};

/// What one dump run produced for one vendor.
pub struct OutputFile {
    pub path: PathBuf,
    pub n_records: usize,
}

/// Write one day of records, overwriting any previous dump at `path`.
///
/// The optional summary line goes first, verbatim, then the tab-delimited
/// column header, then one row per record in `columns` order. A record that
/// carries a field outside `columns`, or lacks a declared column, fails the
/// whole write. Writes are not atomic: a failure partway leaves a partial
/// file behind.
pub fn write(
    path: &Path,
    summary: Option<&str>,
    columns: &[&'static str],
    records: &[Record],
) -> Result<OutputFile> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("failed to create `{}`", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_to(&mut writer, summary, columns, records)
        .with_context(|| format!("failed to write `{}`", path.display()))?;
    writer.flush().with_context(|| format!("failed to flush `{}`", path.display()))?;
    Ok(OutputFile { path: path.to_path_buf(), n_records: records.len() })
}

/// Writer-generic body of [`write`].
pub fn write_to(
    mut writer: impl Write,
    summary: Option<&str>,
    columns: &[&'static str],
    records: &[Record],
) -> Result {
    if let Some(summary) = summary {
        writeln!(writer, "{summary}")?;
    }
    let mut tsv = csv::WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    tsv.write_record(columns)?;
    for record in records {
        for field in record.fields() {
            ensure!(
                columns.contains(&field),
                "the record at {} carries the undeclared field `{field}`",
                record.time(),
            );
        }
        let row = columns
            .iter()
            .map(|column| {
                record.render(column).with_context(|| {
                    format!("the record at {} is missing `{column}`", record.time())
                })
            })
            .collect::<Result<Vec<String>>>()?;
        tsv.write_record(&row)?;
    }
    tsv.flush()?;
    Ok(())
}
