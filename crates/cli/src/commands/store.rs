//! JSON files standing in for the session document store and channel directory.

use std::fs;
use std::path::{Path, PathBuf};

use chanprice_core::{
    ApplicationError, ChannelDirectory, DiscountTierConfig, PricingSession, PricingSnapshot,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

pub fn read_session(path: &Path) -> Result<PricingSession, ApplicationError> {
    read_json(path, "session")
}

pub fn write_session(path: &Path, session: &PricingSession) -> Result<(), ApplicationError> {
    write_json(path, session)
}

pub fn read_directory(path: &Path) -> Result<ChannelDirectory, ApplicationError> {
    read_json(path, "channel directory")
}

pub fn read_tier(path: &Path) -> Result<DiscountTierConfig, ApplicationError> {
    read_json(path, "discount tier")
}

pub fn read_snapshot(path: &Path) -> Result<PricingSnapshot, ApplicationError> {
    read_json(path, "snapshot")
}

/// Writes `snapshot` as `<dir>/<snapshot id>.json`, creating the directory.
pub fn write_snapshot(dir: &Path, snapshot: &PricingSnapshot) -> Result<PathBuf, ApplicationError> {
    fs::create_dir_all(dir).map_err(|error| {
        ApplicationError::Persistence(format!(
            "could not create snapshot directory `{}`: {error}",
            dir.display()
        ))
    })?;
    let path = dir.join(format!("{}.json", snapshot.id));
    write_json(&path, snapshot)?;
    Ok(path)
}

fn read_json<T: DeserializeOwned>(path: &Path, kind: &str) -> Result<T, ApplicationError> {
    let raw = fs::read_to_string(path).map_err(|error| {
        ApplicationError::Persistence(format!(
            "could not read {kind} `{}`: {error}",
            path.display()
        ))
    })?;
    let document = serde_json::from_str(&raw).map_err(|error| {
        ApplicationError::Persistence(format!(
            "could not parse {kind} `{}`: {error}",
            path.display()
        ))
    })?;
    debug!(event_name = "store.document.read", kind, path = %path.display(), "document read");
    Ok(document)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ApplicationError> {
    let encoded = serde_json::to_string_pretty(value).map_err(|error| {
        ApplicationError::Persistence(format!("could not encode `{}`: {error}", path.display()))
    })?;
    fs::write(path, encoded).map_err(|error| {
        ApplicationError::Persistence(format!("could not write `{}`: {error}", path.display()))
    })?;
    debug!(event_name = "store.document.written", path = %path.display(), "document written");
    Ok(())
}
