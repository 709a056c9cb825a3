use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "validation")]
use validator::Validate;

use crate::money;

pub const CLIENT_TYPES: &[&str] = &["particulier", "entreprise", "institution"];

pub const CLIENT_STATUTS: &[&str] = &["actif", "inactif"];

pub const FACTURE_STATUTS: &[&str] = &[
    "brouillon",
    "emise",
    "partiellement_payee",
    "payee",
    "annulee",
];

pub fn is_valid_client_type(s: &str) -> bool {
    CLIENT_TYPES.contains(&s)
}

pub fn is_valid_client_statut(s: &str) -> bool {
    CLIENT_STATUTS.contains(&s)
}

pub fn is_valid_facture_statut(s: &str) -> bool {
    FACTURE_STATUTS.contains(&s)
}

/// Invoices that may still receive payments.
pub fn facture_accepte_paiement(statut: &str) -> bool {
    matches!(statut, "emise" | "partiellement_payee")
}

/// Status of an issued invoice derived from what has been paid on it.
/// A zero total is settled as soon as it is issued.
pub fn statut_facture_apres_paiements(montant_ttc: i64, montant_paye: i64) -> &'static str {
    if montant_paye >= montant_ttc {
        "payee"
    } else if montant_paye <= 0 {
        "emise"
    } else {
        "partiellement_payee"
    }
}

/// Past due and not fully paid. Drafts and cancelled invoices are never late.
pub fn facture_en_retard(
    statut: &str,
    date_echeance: Option<NaiveDate>,
    reste_a_payer: i64,
    today: NaiveDate,
) -> bool {
    facture_accepte_paiement(statut)
        && reste_a_payer > 0
        && date_echeance.map(|d| d < today).unwrap_or(false)
}

/// An advisory client billed by invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct ClientConseil {
    pub id: Uuid,
    pub reference: String,
    pub type_client: String,
    pub nom: String,
    pub raison_sociale: Option<String>,
    pub contact_nom: Option<String>,
    pub telephone: Option<String>,
    pub email: Option<String>,
    pub adresse: Option<String>,
    /// Monthly retainer, 0 when billed per job.
    pub honoraire_mensuel: i64,
    pub statut: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClientConseil {
    pub fn designation(&self) -> &str {
        self.raison_sociale
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.nom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct FactureConseil {
    pub id: Uuid,
    pub numero: String,
    pub client_id: Uuid,
    pub objet: String,
    pub date_emission: NaiveDate,
    pub date_echeance: Option<NaiveDate>,
    pub montant_ht: i64,
    pub taux_tva: f64,
    pub montant_tva: i64,
    pub montant_ttc: i64,
    pub statut: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Invoice row joined with its client name and the sum of its payments.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct FactureRow {
    #[cfg_attr(feature = "server", sqlx(flatten))]
    pub facture: FactureConseil,
    pub client_nom: String,
    pub montant_paye: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FactureResponse {
    #[serde(flatten)]
    pub facture: FactureConseil,
    pub client_nom: String,
    pub montant_paye: i64,
    pub reste_a_payer: i64,
    pub en_retard: bool,
}

impl FactureResponse {
    pub fn from_row(row: FactureRow, today: NaiveDate) -> Self {
        let f = &row.facture;
        let reste_a_payer = if f.statut == "annulee" {
            0
        } else {
            money::reste(f.montant_ttc, row.montant_paye)
        };
        let en_retard = facture_en_retard(&f.statut, f.date_echeance, reste_a_payer, today);
        Self {
            facture: row.facture,
            client_nom: row.client_nom,
            montant_paye: row.montant_paye,
            reste_a_payer,
            en_retard,
        }
    }
}

impl From<FactureRow> for FactureResponse {
    fn from(row: FactureRow) -> Self {
        Self::from_row(row, Utc::now().date_naive())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct PaiementConseil {
    pub id: Uuid,
    pub facture_id: Uuid,
    pub montant: i64,
    pub date_paiement: NaiveDate,
    pub mode_paiement: String,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Raw advisory billing totals fetched from the database.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct ConseilTotaux {
    pub clients_total: i64,
    pub clients_actifs: i64,
    pub nombre_factures: i64,
    pub total_facture: i64,
    pub total_encaisse: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ConseilStatistiques {
    pub clients_total: i64,
    pub clients_actifs: i64,
    pub nombre_factures: i64,
    /// TTC of every issued, non-cancelled invoice.
    pub total_facture: i64,
    pub total_encaisse: i64,
    pub total_impaye: i64,
    pub facture_moyenne: i64,
}

impl From<ConseilTotaux> for ConseilStatistiques {
    fn from(t: ConseilTotaux) -> Self {
        Self {
            clients_total: t.clients_total,
            clients_actifs: t.clients_actifs,
            nombre_factures: t.nombre_factures,
            total_facture: t.total_facture,
            total_encaisse: t.total_encaisse,
            total_impaye: money::reste(t.total_facture, t.total_encaisse),
            facture_moyenne: money::moyenne(t.total_facture, t.nombre_factures),
        }
    }
}

// ── Request types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct CreateClientConseilRequest {
    pub type_client: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Nom is required"))
    )]
    pub nom: String,
    #[serde(default)]
    pub raison_sociale: Option<String>,
    #[serde(default)]
    pub contact_nom: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
    #[serde(default)]
    #[cfg_attr(
        feature = "validation",
        validate(email(message = "Valid email is required"))
    )]
    pub email: Option<String>,
    #[serde(default)]
    pub adresse: Option<String>,
    #[serde(default)]
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 0i64, max = 1_000_000_000_000i64, message = "Amount must be between 0 and 1 000 000 000 000"))
    )]
    pub honoraire_mensuel: i64,
    /// Defaults to `actif`.
    #[serde(default)]
    pub statut: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct UpdateClientConseilRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raison_sociale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_nom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telephone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(
        feature = "validation",
        validate(email(message = "Valid email is required"))
    )]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adresse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 0i64, max = 1_000_000_000_000i64, message = "Amount must be between 0 and 1 000 000 000 000"))
    )]
    pub honoraire_mensuel: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statut: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct CreateFactureRequest {
    pub client_id: Uuid,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Objet is required"))
    )]
    pub objet: String,
    /// Defaults to today.
    #[serde(default)]
    pub date_emission: Option<NaiveDate>,
    #[serde(default)]
    pub date_echeance: Option<NaiveDate>,
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 0i64, max = 1_000_000_000_000i64, message = "Amount must be between 0 and 1 000 000 000 000"))
    )]
    pub montant_ht: i64,
    /// Defaults to the configured VAT rate.
    #[serde(default)]
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 0.0, max = 100.0, message = "VAT rate must be between 0 and 100"))
    )]
    pub taux_tva: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct UpdateFactureRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_emission: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_echeance: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 0i64, max = 1_000_000_000_000i64, message = "Amount must be between 0 and 1 000 000 000 000"))
    )]
    pub montant_ht: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 0.0, max = 100.0, message = "VAT rate must be between 0 and 100"))
    )]
    pub taux_tva: Option<f64>,
}

/// `date_echeance`, when set, must not precede `date_emission`.
pub fn check_echeance(date_emission: NaiveDate, date_echeance: Option<NaiveDate>) -> Result<(), String> {
    match date_echeance {
        Some(e) if e < date_emission => {
            Err("date_echeance must not be before date_emission".to_string())
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct ClientConseilListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub q: Option<String>,
    pub statut: Option<String>,
    pub type_client: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct FactureListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub q: Option<String>,
    pub client_id: Option<Uuid>,
    pub statut: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(statut: &str, ttc: i64, paye: i64, echeance: Option<NaiveDate>) -> FactureRow {
        let now = Utc::now();
        FactureRow {
            facture: FactureConseil {
                id: Uuid::nil(),
                numero: "FAC-2025-0001".into(),
                client_id: Uuid::nil(),
                objet: "Assistance juridique".into(),
                date_emission: date(2025, 1, 10),
                date_echeance: echeance,
                montant_ht: ttc,
                taux_tva: 0.0,
                montant_tva: 0,
                montant_ttc: ttc,
                statut: statut.into(),
                created_at: now,
                updated_at: now,
            },
            client_nom: "Orange CI".into(),
            montant_paye: paye,
        }
    }

    #[test]
    fn status_follows_payments() {
        assert_eq!(statut_facture_apres_paiements(590_000, 0), "emise");
        assert_eq!(
            statut_facture_apres_paiements(590_000, 100_000),
            "partiellement_payee"
        );
        assert_eq!(statut_facture_apres_paiements(590_000, 590_000), "payee");
    }

    #[test]
    fn zero_invoice_is_settled_on_issue() {
        assert_eq!(statut_facture_apres_paiements(0, 0), "payee");
    }

    #[test]
    fn payable_statuses() {
        assert!(facture_accepte_paiement("emise"));
        assert!(facture_accepte_paiement("partiellement_payee"));
        assert!(!facture_accepte_paiement("brouillon"));
        assert!(!facture_accepte_paiement("payee"));
        assert!(!facture_accepte_paiement("annulee"));
    }

    #[test]
    fn late_invoices() {
        let today = date(2025, 3, 1);
        let late = FactureResponse::from_row(
            row("partiellement_payee", 100_000, 40_000, Some(date(2025, 2, 10))),
            today,
        );
        assert!(late.en_retard);
        assert_eq!(late.reste_a_payer, 60_000);

        let paid = FactureResponse::from_row(row("payee", 100_000, 100_000, Some(date(2025, 2, 10))), today);
        assert!(!paid.en_retard);

        let due_today = FactureResponse::from_row(row("emise", 100_000, 0, Some(today)), today);
        assert!(!due_today.en_retard);

        let draft = FactureResponse::from_row(row("brouillon", 100_000, 0, Some(date(2025, 1, 1))), today);
        assert!(!draft.en_retard);

        let no_due_date = FactureResponse::from_row(row("emise", 100_000, 0, None), today);
        assert!(!no_due_date.en_retard);
    }

    #[test]
    fn cancelled_invoice_owes_nothing() {
        let resp = FactureResponse::from_row(row("annulee", 100_000, 0, None), date(2025, 3, 1));
        assert_eq!(resp.reste_a_payer, 0);
    }

    #[test]
    fn echeance_order() {
        assert!(check_echeance(date(2025, 1, 10), None).is_ok());
        assert!(check_echeance(date(2025, 1, 10), Some(date(2025, 1, 10))).is_ok());
        assert!(check_echeance(date(2025, 1, 10), Some(date(2025, 1, 9))).is_err());
    }

    #[test]
    fn statistics_derive_impaye() {
        let stats = ConseilStatistiques::from(ConseilTotaux {
            clients_total: 5,
            clients_actifs: 4,
            nombre_factures: 3,
            total_facture: 1_770_000,
            total_encaisse: 590_000,
        });
        assert_eq!(stats.total_impaye, 1_180_000);
        assert_eq!(stats.facture_moyenne, 590_000);
    }
}
