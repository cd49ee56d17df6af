//! Saving and loading energy systems.
//!
//! A saved system is a directory: a JSON manifest naming every unit, plus
//! one binary record per unit holding its scalar attributes and dense
//! float64 series. The manifest carries a format version so future layouts
//! can be detected instead of misread.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::errors::{RpraError, RpraResult};
use crate::system::{EnergySystem, EnergySystemBuilder};
use crate::unit::{EnergyUnit, UnitId, UnitKind};

/// Name of the manifest file inside a saved-system directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    units: Vec<ManifestEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestEntry {
    id: UnitId,
    kind: UnitKind,
    file: String,
}

fn persistence_error(path: &Path, reason: impl ToString) -> RpraError {
    RpraError::Persistence {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

impl EnergySystem {
    /// Persist every unit plus a manifest into `dir`, creating it if needed.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> RpraResult<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| persistence_error(dir, e))?;

        let mut entries = Vec::with_capacity(self.size());
        for unit in self.iter() {
            let file_name = format!("unit_{}.bin", unit.id());
            let path = dir.join(&file_name);
            let writer =
                BufWriter::new(File::create(&path).map_err(|e| persistence_error(&path, e))?);
            bincode::serialize_into(writer, unit).map_err(|e| persistence_error(&path, e))?;
            entries.push(ManifestEntry {
                id: unit.id(),
                kind: unit.kind(),
                file: file_name,
            });
        }

        let manifest = Manifest {
            version: FORMAT_VERSION,
            units: entries,
        };
        let path = dir.join(MANIFEST_FILE);
        let writer = BufWriter::new(File::create(&path).map_err(|e| persistence_error(&path, e))?);
        serde_json::to_writer_pretty(writer, &manifest).map_err(|e| persistence_error(&path, e))
    }

    /// Restore a system previously written by [`EnergySystem::save`].
    pub fn load<P: AsRef<Path>>(dir: P) -> RpraResult<EnergySystem> {
        let dir = dir.as_ref();
        let manifest_path = dir.join(MANIFEST_FILE);
        let reader =
            BufReader::new(File::open(&manifest_path).map_err(|e| persistence_error(&manifest_path, e))?);
        let manifest: Manifest =
            serde_json::from_reader(reader).map_err(|e| persistence_error(&manifest_path, e))?;
        if manifest.version != FORMAT_VERSION {
            return Err(persistence_error(
                &manifest_path,
                format!(
                    "unsupported format version {} (this build reads version {})",
                    manifest.version, FORMAT_VERSION
                ),
            ));
        }

        let mut builder = EnergySystemBuilder::new();
        for entry in manifest.units {
            let path = dir.join(&entry.file);
            let reader =
                BufReader::new(File::open(&path).map_err(|e| persistence_error(&path, e))?);
            let unit: EnergyUnit =
                bincode::deserialize_from(reader).map_err(|e| persistence_error(&path, e))?;
            if unit.id() != entry.id || unit.kind() != entry.kind {
                return Err(persistence_error(
                    &path,
                    format!(
                        "record holds {} unit {} but the manifest lists {} unit {}",
                        unit.kind(),
                        unit.id(),
                        entry.kind,
                        entry.id
                    ),
                ));
            }
            builder.add_unit(unit)?;
        }
        Ok(builder.build())
    }
}
