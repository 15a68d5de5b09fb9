//! JSON files in and out of the crate.
use super::table::ParticleTable;
use super::types::{Particle, ParticleRecord, TableRole};
use crate::display::RunSummary;
use crate::error::Result;
use crate::workflow::NodeOutput;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

pub const SUMMARY_FILE: &str = "correction_summary.json";

/// Reads a JSON array of particle records into a table.
///
/// Derived fields are recomputed from the raw sizes; ids must be unique.
pub fn load_table(path: impl AsRef<Path>, name: &str, role: TableRole) -> Result<ParticleTable> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let records: Vec<ParticleRecord> = serde_json::from_reader(reader)?;
    let table = ParticleTable::from_particles(name, role, records.into_iter().map(Particle::from))?;
    tracing::info!(table = name, path = %path.display(), particles = table.len(), "loaded table");
    Ok(table)
}

/// Writes the particles of `table` as a JSON array.
pub fn write_table(path: impl AsRef<Path>, table: &ParticleTable) -> Result<()> {
    write_json(path.as_ref(), table.particles())
}

/// Writes `{name}{suffix}.json` and `{name}_elimination_log.json` under `dir`,
/// creating it when needed. Returns both paths.
pub fn write_node_output(dir: impl AsRef<Path>, output: &NodeOutput, suffix: &str) -> Result<(PathBuf, PathBuf)> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let table_path = dir.join(format!("{}{}.json", output.name, suffix));
    let log_path = dir.join(format!("{}_elimination_log.json", output.name));
    write_table(&table_path, &output.outcome.corrected)?;
    write_json(&log_path, &output.outcome.log)?;

    tracing::debug!(node = %output.name, table = %table_path.display(), log = %log_path.display(), "wrote node output");
    Ok((table_path, log_path))
}

pub fn write_summary(dir: impl AsRef<Path>, summary: &RunSummary) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(SUMMARY_FILE);
    write_json(&path, summary)?;
    Ok(path)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}
