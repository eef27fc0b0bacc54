//! Directory-backed migration store
//!
//! Migration files live in one directory and are named
//! `<version>_<name>.<up|down>.<ext>`, e.g. `0003_add_users.up.sql`.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{MigrateError, MigrateResult};
use crate::store::{FileStore, UnitCatalog};
use crate::unit::{MigrationPair, MigrationUnit};
use crate::version::{Direction, Version};

/// Width multiple used when zero-padding new version numbers
const VERSION_PAD_WIDTH: usize = 4;

/// Migration store reading a single directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

/// Fields parsed out of a migration file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFileName {
    pub version: Version,
    pub name: String,
    pub direction: Direction,
    pub extension: String,
}

/// Parse `<version>_<name>.<up|down>.<ext>`; `None` for anything else
pub fn parse_file_name(file_name: &str) -> Option<ParsedFileName> {
    let mut parts = file_name.rsplitn(3, '.');
    let extension = parts.next()?;
    let direction = parts.next()?.parse::<Direction>().ok()?;
    let stem = parts.next()?;

    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    let (digits, name) = stem.split_once('_')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) || name.is_empty() {
        return None;
    }

    Some(ParsedFileName {
        version: digits.parse().ok()?,
        name: name.to_string(),
        direction,
        extension: extension.to_string(),
    })
}

/// Build the file name for a unit, zero-padding the version to a multiple of four digits
pub fn format_file_name(version: Version, name: &str, direction: Direction, extension: &str) -> String {
    let digits = version.to_string();
    let padded_len = digits.len().div_ceil(VERSION_PAD_WIDTH) * VERSION_PAD_WIDTH;
    format!(
        "{:0>width$}_{}.{}.{}",
        digits,
        name,
        direction,
        extension,
        width = padded_len
    )
}

fn normalize_name(name: &str) -> MigrateResult<String> {
    let name = name.trim().replace(char::is_whitespace, "_");
    if name.is_empty() {
        return Err(MigrateError::Store("migration name must not be empty".to_string()));
    }
    if name.contains(['/', '\\']) || name.contains("..") {
        return Err(MigrateError::Store(format!(
            "migration name '{}' must not contain path separators",
            name
        )));
    }
    Ok(name)
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write_new_file(&self, path: &Path) -> MigrateResult<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(|e| MigrateError::io(path, e))?;
        file.flush().await.map_err(|e| MigrateError::io(path, e))?;
        Ok(())
    }
}

#[async_trait]
impl FileStore for DirectoryStore {
    async fn discover(&self) -> MigrateResult<Vec<MigrationUnit>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Migration directory {} does not exist", self.dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(MigrateError::io(&self.dir, e)),
        };

        let mut units = Vec::new();
        let mut seen = HashSet::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MigrateError::io(&self.dir, e))?
        {
            let path = entry.path();
            let file_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };

            let parsed = match parse_file_name(file_name) {
                Some(parsed) => parsed,
                None => {
                    tracing::debug!("Ignoring non-migration file {}", path.display());
                    continue;
                }
            };

            if !seen.insert((parsed.version, parsed.direction)) {
                return Err(MigrateError::Store(format!(
                    "duplicate {} migration for version {} ({})",
                    parsed.direction,
                    parsed.version,
                    path.display()
                )));
            }

            units.push(MigrationUnit::new(
                parsed.version,
                parsed.name,
                parsed.direction,
                path.to_string_lossy(),
            ));
        }

        Ok(UnitCatalog::new(units).into_units())
    }

    async fn create(&self, name: &str, extension: &str) -> MigrateResult<MigrationPair> {
        let name = normalize_name(name)?;
        let catalog = UnitCatalog::new(self.discover().await?);
        let version = catalog
            .max_version()
            .get()
            .checked_add(1)
            .map(Version)
            .ok_or_else(|| MigrateError::Store("no version left after the highest existing one".to_string()))?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| MigrateError::io(&self.dir, e))?;

        let up_path = self
            .dir
            .join(format_file_name(version, &name, Direction::Up, extension));
        let down_path = self
            .dir
            .join(format_file_name(version, &name, Direction::Down, extension));

        self.write_new_file(&up_path).await?;
        self.write_new_file(&down_path).await?;

        tracing::info!("Created version {} migration files in {}", version, self.dir.display());

        Ok(MigrationPair {
            version,
            name: name.clone(),
            up: MigrationUnit::new(version, name.clone(), Direction::Up, up_path.to_string_lossy()),
            down: MigrationUnit::new(version, name, Direction::Down, down_path.to_string_lossy()),
        })
    }

    async fn read_content(&self, unit: &MigrationUnit) -> MigrateResult<Vec<u8>> {
        fs::read(&unit.source)
            .await
            .map_err(|e| MigrateError::io(&unit.source, e))
    }
}
