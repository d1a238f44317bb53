use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::Deserialize;

use super::domain::{PetId, UserId};

/// Identity and pet ownership lookups owned by the marketplace CRUD layer.
pub trait Directory: Send + Sync {
    fn pet_owner(&self, pet: &PetId) -> Result<Option<UserId>, DirectoryError>;
    fn is_caregiver(&self, user: &UserId) -> Result<bool, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read directory seed {path}: {source}")]
    SeedIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed directory seed {path}: {source}")]
    SeedFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// JSON layout accepted by [`InMemoryDirectory::from_seed_file`].
#[derive(Debug, Default, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub pets: Vec<PetSeed>,
    #[serde(default)]
    pub caregivers: Vec<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct PetSeed {
    pub id: PetId,
    #[serde(default)]
    pub owner: Option<UserId>,
}

#[derive(Debug, Default)]
struct Entries {
    pets: BTreeMap<PetId, Option<UserId>>,
    caregivers: BTreeSet<UserId>,
}

/// Directory backed by a process-local map, used by the demo and tests.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    entries: RwLock<Entries>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: DirectorySeed) -> Self {
        let entries = Entries {
            pets: seed
                .pets
                .into_iter()
                .map(|pet| (pet.id, pet.owner))
                .collect(),
            caregivers: seed.caregivers.into_iter().collect(),
        };
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| DirectoryError::SeedIo {
            path: path.to_path_buf(),
            source,
        })?;
        let seed: DirectorySeed =
            serde_json::from_str(&raw).map_err(|source| DirectoryError::SeedFormat {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_seed(seed))
    }

    pub fn with_pet(self, pet: &str, owner: Option<&str>) -> Self {
        if let Ok(mut entries) = self.entries.write() {
            entries.pets.insert(
                PetId(pet.to_string()),
                owner.map(|owner| UserId(owner.to_string())),
            );
        }
        self
    }

    pub fn with_caregiver(self, user: &str) -> Self {
        if let Ok(mut entries) = self.entries.write() {
            entries.caregivers.insert(UserId(user.to_string()));
        }
        self
    }
}

impl Directory for InMemoryDirectory {
    fn pet_owner(&self, pet: &PetId) -> Result<Option<UserId>, DirectoryError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| DirectoryError::Unavailable("directory lock poisoned".to_string()))?;
        Ok(entries.pets.get(pet).cloned().flatten())
    }

    fn is_caregiver(&self, user: &UserId) -> Result<bool, DirectoryError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| DirectoryError::Unavailable("directory lock poisoned".to_string()))?;
        Ok(entries.caregivers.contains(user))
    }
}
