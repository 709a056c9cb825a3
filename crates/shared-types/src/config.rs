use serde::{Deserialize, Serialize};

/// Feature flags controlling which optional subsystems are active.
///
/// Loaded from `config.toml` at server startup. Missing keys fall back to
/// the values of `FeatureFlags::default()`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FeatureFlags {
    /// Export traces and logs over OTLP.
    #[serde(default)]
    pub telemetry: bool,
    /// Write an `audit_logs` row for every mutation.
    #[serde(default = "default_true")]
    pub audit: bool,
    /// Maintain the in-memory full-text index behind `/api/recherche`.
    #[serde(default = "default_true")]
    pub search: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            telemetry: false,
            audit: true,
            search: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Firm-wide settings used by invoicing, rent collection and reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CabinetSettings {
    #[serde(default = "default_nom")]
    pub nom: String,
    #[serde(default = "default_ville")]
    pub ville: String,
    /// Currency label printed after amounts.
    #[serde(default = "default_devise")]
    pub devise: String,
    /// VAT rate applied to advisory invoices, in percent.
    #[serde(default = "default_taux_tva")]
    pub taux_tva: f64,
    /// Management fee on collected rents for new buildings, in percent.
    #[serde(default = "default_taux_commission")]
    pub taux_commission_defaut: f64,
}

impl Default for CabinetSettings {
    fn default() -> Self {
        Self {
            nom: default_nom(),
            ville: default_ville(),
            devise: default_devise(),
            taux_tva: default_taux_tva(),
            taux_commission_defaut: default_taux_commission(),
        }
    }
}

fn default_nom() -> String {
    "CAPCO".to_string()
}

fn default_ville() -> String {
    "Abidjan".to_string()
}

fn default_devise() -> String {
    "FCFA".to_string()
}

fn default_taux_tva() -> f64 {
    18.0
}

fn default_taux_commission() -> f64 {
    10.0
}

/// Top-level config file structure matching `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub cabinet: CabinetSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.features.audit);
        assert!(config.features.search);
        assert!(!config.features.telemetry);
        assert_eq!(config.cabinet.devise, "FCFA");
        assert_eq!(config.cabinet.taux_tva, 18.0);
    }

    #[test]
    fn partial_toml_keeps_missing_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [features]
            audit = false

            [cabinet]
            taux_commission_defaut = 8.5
            "#,
        )
        .unwrap();
        assert!(!config.features.audit);
        assert!(config.features.search);
        assert_eq!(config.cabinet.taux_commission_defaut, 8.5);
        assert_eq!(config.cabinet.nom, "CAPCO");
    }

    #[test]
    fn full_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [features]
            telemetry = true
            audit = true
            search = false

            [cabinet]
            nom = "CAPCO Conseil"
            ville = "Bouake"
            devise = "XOF"
            taux_tva = 0.0
            taux_commission_defaut = 12.0
            "#,
        )
        .unwrap();
        assert!(config.features.telemetry);
        assert!(!config.features.search);
        assert_eq!(config.cabinet.nom, "CAPCO Conseil");
        assert_eq!(config.cabinet.devise, "XOF");
        assert_eq!(config.cabinet.taux_tva, 0.0);
    }
}
