// Domain-level errors.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    UnknownTankType(String),
    UnknownDifficulty(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::UnknownTankType(key) => write!(f, "unknown tank type `{key}`"),
            CatalogError::UnknownDifficulty(key) => write!(f, "unknown difficulty `{key}`"),
        }
    }
}

impl std::error::Error for CatalogError {}
