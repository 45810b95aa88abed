//! JSON persistence helpers.
//!
//! - `write_json_file`: pretty-print a serializable value to disk.
//! - `read_json_file`: parse a JSON file into a deserializable value.
//! - `save_record` / `load_record`: persist the per-eye aggregate. Loading
//!   goes through the normalizing deserializers, so a stored record with a
//!   positive cylinder or an oversized history comes back normalized.

use crate::computed::{ComputedPrescription, PrescriptionRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read JSON {}: {e}", path.display()))?;
    serde_json::from_str(&data).map_err(|e| format!("Failed to parse JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}

/// Writes a snapshot of `computed` to `path`.
pub fn save_record(path: &Path, computed: &ComputedPrescription) -> Result<(), String> {
    write_json_file(path, &computed.snapshot())
}

pub fn load_record(path: &Path) -> Result<ComputedPrescription, String> {
    let record: PrescriptionRecord = read_json_file(path)?;
    Ok(ComputedPrescription::from_record(record))
}
