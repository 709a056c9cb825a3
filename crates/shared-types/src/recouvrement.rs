use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "validation")]
use validator::Validate;

use crate::common::CountByLabel;
use crate::money;

pub const RECOUVREMENT_STATUTS: &[&str] = &[
    "ouvert",
    "amiable",
    "judiciaire",
    "solde",
    "cloture",
    "irrecouvrable",
];

pub const ACTION_TYPES: &[&str] = &[
    "relance",
    "mise_en_demeure",
    "sommation",
    "protocole",
    "assignation",
    "saisie",
    "autre",
];

pub fn is_valid_recouvrement_statut(s: &str) -> bool {
    RECOUVREMENT_STATUTS.contains(&s)
}

pub fn is_valid_action_type(s: &str) -> bool {
    ACTION_TYPES.contains(&s)
}

/// Closed dossiers accept no further actions or payments.
pub fn dossier_est_ferme(statut: &str) -> bool {
    matches!(statut, "cloture" | "irrecouvrable")
}

/// Statuses that stamp `date_cloture`.
pub fn recouvrement_statut_closes(statut: &str) -> bool {
    matches!(statut, "solde" | "cloture" | "irrecouvrable")
}

/// Status change implied by the balance after a payment is added or removed.
///
/// A dossier whose balance reaches zero becomes `solde`; a `solde` dossier
/// that owes money again goes back to `amiable`. `None` means unchanged.
pub fn statut_apres_paiements(statut: &str, reste_du: i64) -> Option<&'static str> {
    if dossier_est_ferme(statut) {
        return None;
    }
    match (statut, reste_du) {
        ("solde", r) if r > 0 => Some("amiable"),
        ("solde", _) => None,
        (_, 0) => Some("solde"),
        _ => None,
    }
}

/// A debt-collection file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct DossierRecouvrement {
    pub id: Uuid,
    pub reference: String,
    pub creancier_nom: String,
    pub creancier_contact: Option<String>,
    pub debiteur_nom: String,
    pub debiteur_contact: Option<String>,
    pub debiteur_adresse: Option<String>,
    pub montant_principal: i64,
    pub frais: i64,
    pub interets: i64,
    pub statut: String,
    pub date_ouverture: NaiveDate,
    pub date_cloture: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dossier row joined with the sum of its payments.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct DossierRow {
    #[cfg_attr(feature = "server", sqlx(flatten))]
    pub dossier: DossierRecouvrement,
    pub montant_recouvre: i64,
}

/// What is owed and what has been collected on a dossier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SituationRecouvrement {
    pub montant_du: i64,
    pub montant_recouvre: i64,
    pub reste_du: i64,
    /// Percentage of `montant_du` collected, 0 when nothing is due.
    pub taux_recouvrement: f64,
}

impl SituationRecouvrement {
    pub fn compute(principal: i64, frais: i64, interets: i64, recouvre: i64) -> Self {
        let montant_du = principal.saturating_add(frais).saturating_add(interets);
        Self {
            montant_du,
            montant_recouvre: recouvre,
            reste_du: money::reste(montant_du, recouvre),
            taux_recouvrement: money::taux(recouvre, montant_du),
        }
    }
}

/// API response for a dossier with its situation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DossierResponse {
    #[serde(flatten)]
    pub dossier: DossierRecouvrement,
    pub situation: SituationRecouvrement,
}

impl From<DossierRow> for DossierResponse {
    fn from(row: DossierRow) -> Self {
        let d = &row.dossier;
        let situation =
            SituationRecouvrement::compute(d.montant_principal, d.frais, d.interets, row.montant_recouvre);
        Self {
            dossier: row.dossier,
            situation,
        }
    }
}

/// A step taken to collect a debt (reminder, formal notice, seizure...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct ActionRecouvrement {
    pub id: Uuid,
    pub dossier_id: Uuid,
    pub type_action: String,
    pub date_action: NaiveDate,
    pub description: String,
    pub resultat: Option<String>,
    pub prochaine_etape: Option<String>,
    pub date_prochaine_etape: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct PaiementRecouvrement {
    pub id: Uuid,
    pub dossier_id: Uuid,
    pub montant: i64,
    pub date_paiement: NaiveDate,
    pub mode_paiement: String,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Portfolio-wide recovery figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RecouvrementStatistiques {
    pub total_dossiers: i64,
    pub par_statut: Vec<CountByLabel>,
    pub total_du: i64,
    pub total_recouvre: i64,
    pub reste_du: i64,
    pub taux_global: f64,
    /// Average amount due per dossier.
    pub montant_moyen: i64,
}

impl RecouvrementStatistiques {
    pub fn new(par_statut: Vec<CountByLabel>, total_du: i64, total_recouvre: i64) -> Self {
        let total_dossiers = par_statut.iter().map(|c| c.count).sum();
        Self {
            total_dossiers,
            par_statut,
            total_du,
            total_recouvre,
            reste_du: money::reste(total_du, total_recouvre),
            taux_global: money::taux(total_recouvre, total_du),
            montant_moyen: money::moyenne(total_du, total_dossiers),
        }
    }
}

// ── Request types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct CreateDossierRequest {
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Creditor name is required"))
    )]
    pub creancier_nom: String,
    #[serde(default)]
    pub creancier_contact: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Debtor name is required"))
    )]
    pub debiteur_nom: String,
    #[serde(default)]
    pub debiteur_contact: Option<String>,
    #[serde(default)]
    pub debiteur_adresse: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 0i64, max = 1_000_000_000_000i64, message = "Amount must be between 0 and 1 000 000 000 000"))
    )]
    pub montant_principal: i64,
    #[serde(default)]
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 0i64, max = 1_000_000_000_000i64, message = "Amount must be between 0 and 1 000 000 000 000"))
    )]
    pub frais: i64,
    #[serde(default)]
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 0i64, max = 1_000_000_000_000i64, message = "Amount must be between 0 and 1 000 000 000 000"))
    )]
    pub interets: i64,
    /// Defaults to `ouvert`.
    #[serde(default)]
    pub statut: Option<String>,
    #[serde(default)]
    pub date_ouverture: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct UpdateDossierRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creancier_nom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creancier_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debiteur_nom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debiteur_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debiteur_adresse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 0i64, max = 1_000_000_000_000i64, message = "Amount must be between 0 and 1 000 000 000 000"))
    )]
    pub montant_principal: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 0i64, max = 1_000_000_000_000i64, message = "Amount must be between 0 and 1 000 000 000 000"))
    )]
    pub frais: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 0i64, max = 1_000_000_000_000i64, message = "Amount must be between 0 and 1 000 000 000 000"))
    )]
    pub interets: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_ouverture: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct CreateActionRequest {
    pub type_action: String,
    #[serde(default)]
    pub date_action: Option<NaiveDate>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Description is required"))
    )]
    pub description: String,
    #[serde(default)]
    pub resultat: Option<String>,
    #[serde(default)]
    pub prochaine_etape: Option<String>,
    #[serde(default)]
    pub date_prochaine_etape: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct DossierListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub q: Option<String>,
    pub statut: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn situation_sums_the_debt() {
        let s = SituationRecouvrement::compute(1_000_000, 50_000, 25_000, 537_500);
        assert_eq!(s.montant_du, 1_075_000);
        assert_eq!(s.reste_du, 537_500);
        assert_eq!(s.taux_recouvrement, 50.0);
    }

    #[test]
    fn situation_saturates_instead_of_overflowing() {
        let s = SituationRecouvrement::compute(i64::MAX, 1, 0, 0);
        assert_eq!(s.montant_du, i64::MAX);
        assert_eq!(s.reste_du, i64::MAX);
    }

    #[test]
    fn situation_with_nothing_due() {
        let s = SituationRecouvrement::compute(0, 0, 0, 0);
        assert_eq!(s.reste_du, 0);
        assert_eq!(s.taux_recouvrement, 0.0);
    }

    #[test]
    fn full_payment_settles_the_dossier() {
        assert_eq!(statut_apres_paiements("ouvert", 0), Some("solde"));
        assert_eq!(statut_apres_paiements("judiciaire", 0), Some("solde"));
        assert_eq!(statut_apres_paiements("amiable", 1), None);
    }

    #[test]
    fn removing_a_payment_reopens_a_settled_dossier() {
        assert_eq!(statut_apres_paiements("solde", 10_000), Some("amiable"));
        assert_eq!(statut_apres_paiements("solde", 0), None);
    }

    #[test]
    fn closed_dossiers_never_change() {
        assert_eq!(statut_apres_paiements("cloture", 0), None);
        assert_eq!(statut_apres_paiements("irrecouvrable", 500), None);
        assert!(dossier_est_ferme("cloture"));
        assert!(!dossier_est_ferme("solde"));
    }

    #[test]
    fn closing_statuses_stamp_date() {
        assert!(recouvrement_statut_closes("solde"));
        assert!(recouvrement_statut_closes("irrecouvrable"));
        assert!(!recouvrement_statut_closes("judiciaire"));
    }

    #[test]
    fn statistics_aggregate() {
        let stats = RecouvrementStatistiques::new(
            vec![
                CountByLabel {
                    label: "ouvert".into(),
                    count: 3,
                },
                CountByLabel {
                    label: "solde".into(),
                    count: 1,
                },
            ],
            4_000_000,
            1_000_000,
        );
        assert_eq!(stats.total_dossiers, 4);
        assert_eq!(stats.reste_du, 3_000_000);
        assert_eq!(stats.taux_global, 25.0);
        assert_eq!(stats.montant_moyen, 1_000_000);
    }
}
