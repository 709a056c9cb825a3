use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "validation")]
use validator::Validate;

use crate::audience::Audience;
use crate::common::CountByLabel;

// ── Validation constants ────────────────────────────────────────────

/// Valid affaire nature values matching the DB CHECK constraint.
pub const AFFAIRE_NATURES: &[&str] = &[
    "civile",
    "commerciale",
    "sociale",
    "penale",
    "administrative",
    "autre",
];

/// Valid affaire status values matching the DB CHECK constraint.
pub const AFFAIRE_STATUTS: &[&str] = &["en_cours", "suspendue", "cloturee", "radiee"];

pub fn is_valid_affaire_nature(s: &str) -> bool {
    AFFAIRE_NATURES.contains(&s)
}

pub fn is_valid_affaire_statut(s: &str) -> bool {
    AFFAIRE_STATUTS.contains(&s)
}

/// Closing statuses stamp `date_cloture`; every other status clears it.
pub fn affaire_statut_closes(statut: &str) -> bool {
    matches!(statut, "cloturee" | "radiee")
}

// ── DB row struct ───────────────────────────────────────────────────

/// A litigation case handled by the firm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Affaire {
    pub id: Uuid,
    pub reference: String,
    pub intitule: String,
    pub nature: String,
    pub juridiction: String,
    pub client_nom: String,
    pub partie_adverse: Option<String>,
    pub avocat_adverse: Option<String>,
    pub statut: String,
    pub date_ouverture: NaiveDate,
    pub date_cloture: Option<NaiveDate>,
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── API response types ──────────────────────────────────────────────

/// API response shape for an affaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AffaireResponse {
    pub id: String,
    pub reference: String,
    pub intitule: String,
    pub nature: String,
    pub juridiction: String,
    pub client_nom: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partie_adverse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avocat_adverse: Option<String>,
    pub statut: String,
    pub date_ouverture: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_cloture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Affaire> for AffaireResponse {
    fn from(a: Affaire) -> Self {
        Self {
            id: a.id.to_string(),
            reference: a.reference,
            intitule: a.intitule,
            nature: a.nature,
            juridiction: a.juridiction,
            client_nom: a.client_nom,
            partie_adverse: a.partie_adverse,
            avocat_adverse: a.avocat_adverse,
            statut: a.statut,
            date_ouverture: a.date_ouverture.to_string(),
            date_cloture: a.date_cloture.map(|d| d.to_string()),
            observations: a.observations,
            created_at: a.created_at.to_rfc3339(),
            updated_at: a.updated_at.to_rfc3339(),
        }
    }
}

/// Counts shown on the litigation overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AffaireStatistiques {
    pub total: i64,
    pub par_statut: Vec<CountByLabel>,
    pub par_nature: Vec<CountByLabel>,
    /// Programmed hearings from today onwards.
    pub audiences_a_venir: i64,
}

/// Financial and scheduling summary of one affaire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AffaireSynthese {
    pub affaire: AffaireResponse,
    pub honoraires_convenus: i64,
    pub honoraires_encaisses: i64,
    pub honoraires_reste: i64,
    pub total_depenses: i64,
    pub nombre_audiences: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prochaine_audience: Option<Audience>,
}

// ── Request types ───────────────────────────────────────────────────

/// Request to open a new affaire. The reference is generated by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct CreateAffaireRequest {
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, max = 300, message = "Intitule is required"))
    )]
    pub intitule: String,
    pub nature: String,
    #[serde(default)]
    pub juridiction: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Client name is required"))
    )]
    pub client_nom: String,
    #[serde(default)]
    pub partie_adverse: Option<String>,
    #[serde(default)]
    pub avocat_adverse: Option<String>,
    /// Defaults to `en_cours`.
    #[serde(default)]
    pub statut: Option<String>,
    /// Defaults to today.
    #[serde(default)]
    pub date_ouverture: Option<NaiveDate>,
    #[serde(default)]
    pub observations: Option<String>,
}

/// Request to update an affaire (only provided fields are changed).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct UpdateAffaireRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, max = 300, message = "Intitule cannot be empty"))
    )]
    pub intitule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub juridiction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_nom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partie_adverse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avocat_adverse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_ouverture: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
}

/// Query parameters for the affaire list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct AffaireListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub q: Option<String>,
    pub statut: Option<String>,
    pub nature: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabularies() {
        assert!(is_valid_affaire_nature("commerciale"));
        assert!(!is_valid_affaire_nature("criminelle"));
        assert!(is_valid_affaire_statut("radiee"));
        assert!(!is_valid_affaire_statut("closed"));
    }

    #[test]
    fn closing_statuses() {
        assert!(affaire_statut_closes("cloturee"));
        assert!(affaire_statut_closes("radiee"));
        assert!(!affaire_statut_closes("en_cours"));
        assert!(!affaire_statut_closes("suspendue"));
    }

    #[test]
    fn response_formats_dates() {
        let now = Utc::now();
        let affaire = Affaire {
            id: Uuid::nil(),
            reference: "AFF-2025-0001".into(),
            intitule: "SCI Plateau c/ Diallo".into(),
            nature: "civile".into(),
            juridiction: "Tribunal de Premiere Instance d'Abidjan".into(),
            client_nom: "SCI Plateau".into(),
            partie_adverse: Some("M. Diallo".into()),
            avocat_adverse: None,
            statut: "cloturee".into(),
            date_ouverture: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            date_cloture: NaiveDate::from_ymd_opt(2025, 6, 30),
            observations: None,
            created_at: now,
            updated_at: now,
        };
        let resp = AffaireResponse::from(affaire);
        assert_eq!(resp.date_ouverture, "2025-01-15");
        assert_eq!(resp.date_cloture.as_deref(), Some("2025-06-30"));

        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("avocat_adverse").is_none());
        assert!(json.get("observations").is_none());
    }

    #[test]
    fn update_request_skips_absent_fields() {
        let req: UpdateAffaireRequest =
            serde_json::from_str(r#"{"juridiction":"Cour d'appel"}"#).unwrap();
        assert_eq!(req.juridiction.as_deref(), Some("Cour d'appel"));
        assert!(req.intitule.is_none());
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"juridiction":"Cour d'appel"}"#);
    }
}
