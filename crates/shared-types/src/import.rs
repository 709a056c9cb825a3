use serde::{Deserialize, Serialize};

/// Entities that can be exported as CSV.
pub const EXPORT_ENTITES: &[&str] = &[
    "affaires",
    "dossiers-recouvrement",
    "lots",
    "locataires",
    "encaissements",
    "clients-conseil",
    "factures",
];

/// Entities that can be imported from CSV.
pub const IMPORT_ENTITES: &[&str] = &[
    "locataires",
    "clients-conseil",
    "dossiers-recouvrement",
    "lots",
];

/// A rejected CSV row. Line 1 is the header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ImportErreur {
    pub ligne: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ImportReport {
    pub entite: String,
    pub dry_run: bool,
    pub lignes_total: usize,
    pub lignes_valides: usize,
    /// Rows written; always 0 on a dry run.
    pub lignes_importees: usize,
    pub erreurs: Vec<ImportErreur>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct ImportParams {
    #[serde(default)]
    pub dry_run: bool,
}
