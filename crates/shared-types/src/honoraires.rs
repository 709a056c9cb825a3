use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "validation")]
use validator::Validate;

use crate::money;

pub const MODES_FACTURATION: &[&str] = &["forfait", "horaire", "resultat", "mixte"];

pub const DEPENSE_CATEGORIES: &[&str] = &[
    "frais_justice",
    "huissier",
    "expertise",
    "deplacement",
    "greffe",
    "autre",
];

pub fn is_valid_mode_facturation(s: &str) -> bool {
    MODES_FACTURATION.contains(&s)
}

pub fn is_valid_depense_categorie(s: &str) -> bool {
    DEPENSE_CATEGORIES.contains(&s)
}

/// A fee agreement attached to an affaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Honoraires {
    pub id: Uuid,
    pub affaire_id: Uuid,
    pub libelle: String,
    pub mode_facturation: String,
    pub montant_convenu: i64,
    pub date_convention: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fee agreement row joined with the sum of its payments.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct HonorairesRow {
    #[cfg_attr(feature = "server", sqlx(flatten))]
    pub honoraires: Honoraires,
    pub montant_paye: i64,
}

/// API response for a fee agreement with its payment situation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HonorairesResponse {
    #[serde(flatten)]
    pub honoraires: Honoraires,
    pub montant_paye: i64,
    pub reste_a_payer: i64,
}

impl From<HonorairesRow> for HonorairesResponse {
    fn from(row: HonorairesRow) -> Self {
        let reste_a_payer = money::reste(row.honoraires.montant_convenu, row.montant_paye);
        Self {
            honoraires: row.honoraires,
            montant_paye: row.montant_paye,
            reste_a_payer,
        }
    }
}

/// A payment received against a fee agreement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct PaiementHonoraires {
    pub id: Uuid,
    pub honoraires_id: Uuid,
    pub montant: i64,
    pub date_paiement: NaiveDate,
    pub mode_paiement: String,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An expense advanced by the firm on an affaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Depense {
    pub id: Uuid,
    pub affaire_id: Uuid,
    pub libelle: String,
    pub categorie: String,
    pub montant: i64,
    pub date_depense: NaiveDate,
    pub justificatif: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Expenses of an affaire with their total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DepensesAffaire {
    pub depenses: Vec<Depense>,
    pub total: i64,
}

impl DepensesAffaire {
    pub fn new(depenses: Vec<Depense>) -> Self {
        let total = depenses.iter().map(|d| d.montant).sum();
        Self { depenses, total }
    }
}

/// Check a payment against what is left to pay. Returns the 400 message.
pub fn check_paiement(montant: i64, reste_a_payer: i64) -> Result<(), String> {
    if montant <= 0 {
        return Err("Payment amount must be positive".to_string());
    }
    if montant > reste_a_payer {
        return Err(format!(
            "Payment of {} exceeds the remaining balance of {}",
            montant, reste_a_payer
        ));
    }
    Ok(())
}

// ── Request types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct CreateHonorairesRequest {
    pub affaire_id: Uuid,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Libelle is required"))
    )]
    pub libelle: String,
    pub mode_facturation: String,
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 0i64, max = 1_000_000_000_000i64, message = "Amount must be between 0 and 1 000 000 000 000"))
    )]
    pub montant_convenu: i64,
    /// Defaults to today.
    #[serde(default)]
    pub date_convention: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct UpdateHonorairesRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub libelle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_facturation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 0i64, max = 1_000_000_000_000i64, message = "Amount must be between 0 and 1 000 000 000 000"))
    )]
    pub montant_convenu: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_convention: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Payment body shared by fee, recovery and invoice payments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct CreatePaiementRequest {
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 1i64, max = 1_000_000_000_000i64, message = "Amount must be between 1 and 1 000 000 000 000"))
    )]
    pub montant: i64,
    /// Defaults to today.
    #[serde(default)]
    pub date_paiement: Option<NaiveDate>,
    pub mode_paiement: String,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct CreateDepenseRequest {
    pub affaire_id: Uuid,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Libelle is required"))
    )]
    pub libelle: String,
    pub categorie: String,
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 1i64, max = 1_000_000_000_000i64, message = "Amount must be between 1 and 1 000 000 000 000"))
    )]
    pub montant: i64,
    #[serde(default)]
    pub date_depense: Option<NaiveDate>,
    #[serde(default)]
    pub justificatif: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct UpdateDepenseRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub libelle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categorie: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 1i64, max = 1_000_000_000_000i64, message = "Amount must be between 1 and 1 000 000 000 000"))
    )]
    pub montant: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_depense: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justificatif: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn honoraires(montant_convenu: i64) -> Honoraires {
        let now = Utc::now();
        Honoraires {
            id: Uuid::nil(),
            affaire_id: Uuid::nil(),
            libelle: "Convention d'honoraires".into(),
            mode_facturation: "forfait".into(),
            montant_convenu,
            date_convention: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn response_computes_reste() {
        let resp = HonorairesResponse::from(HonorairesRow {
            honoraires: honoraires(1_500_000),
            montant_paye: 500_000,
        });
        assert_eq!(resp.reste_a_payer, 1_000_000);

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["montant_convenu"], 1_500_000);
        assert_eq!(json["reste_a_payer"], 1_000_000);
    }

    #[test]
    fn payment_bounds() {
        assert!(check_paiement(100, 100).is_ok());
        assert!(check_paiement(101, 100).is_err());
        assert!(check_paiement(0, 100).is_err());
        assert!(check_paiement(-5, 100).is_err());
    }

    #[test]
    fn depenses_total() {
        let now = Utc::now();
        let depense = |montant| Depense {
            id: Uuid::new_v4(),
            affaire_id: Uuid::nil(),
            libelle: "Frais de greffe".into(),
            categorie: "greffe".into(),
            montant,
            date_depense: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            justificatif: None,
            created_at: now,
            updated_at: now,
        };
        let list = DepensesAffaire::new(vec![depense(15_000), depense(7_500)]);
        assert_eq!(list.total, 22_500);
        assert_eq!(DepensesAffaire::new(vec![]).total, 0);
    }

    #[test]
    fn vocabularies() {
        assert!(is_valid_mode_facturation("mixte"));
        assert!(!is_valid_mode_facturation("gratuit"));
        assert!(is_valid_depense_categorie("huissier"));
        assert!(!is_valid_depense_categorie("repas"));
    }
}
