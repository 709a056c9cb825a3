use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "validation")]
use validator::Validate;

pub const AUDIENCE_STATUTS: &[&str] = &["programmee", "tenue", "renvoyee", "annulee"];

pub const RESULTAT_TYPES: &[&str] = &["renvoi", "delibere", "jugement", "radiation", "autre"];

pub fn is_valid_audience_statut(s: &str) -> bool {
    AUDIENCE_STATUTS.contains(&s)
}

pub fn is_valid_resultat_type(s: &str) -> bool {
    RESULTAT_TYPES.contains(&s)
}

/// Longest span the calendar endpoint will return.
pub const CALENDRIER_MAX_JOURS: i64 = 366;

pub const A_VENIR_JOURS_DEFAUT: i64 = 7;
pub const A_VENIR_JOURS_MAX: i64 = 90;

/// A court hearing scheduled for an affaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Audience {
    pub id: Uuid,
    pub affaire_id: Uuid,
    pub date_audience: NaiveDate,
    pub heure: Option<NaiveTime>,
    pub juridiction: String,
    pub salle: Option<String>,
    pub objet: String,
    pub statut: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A hearing together with the affaire it belongs to (calendar views).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct AudienceCalendrier {
    #[serde(flatten)]
    #[cfg_attr(feature = "server", sqlx(flatten))]
    pub audience: Audience,
    pub affaire_reference: String,
    pub affaire_intitule: String,
}

/// Outcome recorded for a hearing. At most one per hearing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct ResultatAudience {
    pub id: Uuid,
    pub audience_id: Uuid,
    pub type_resultat: String,
    pub decision: Option<String>,
    pub date_prochaine_audience: Option<NaiveDate>,
    pub date_delibere: Option<NaiveDate>,
    /// Follow-up hearing created for a `renvoi`.
    pub audience_suivante_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Response to recording an outcome: the outcome plus any follow-up hearing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ResultatResponse {
    pub resultat: ResultatAudience,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience_suivante: Option<Audience>,
}

/// Status the hearing takes once an outcome of `type_resultat` is recorded.
pub fn statut_apres_resultat(type_resultat: &str) -> &'static str {
    if type_resultat == "renvoi" {
        "renvoyee"
    } else {
        "tenue"
    }
}

// ── Request types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct CreateAudienceRequest {
    pub affaire_id: Uuid,
    pub date_audience: NaiveDate,
    #[serde(default)]
    pub heure: Option<NaiveTime>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Juridiction is required"))
    )]
    pub juridiction: String,
    #[serde(default)]
    pub salle: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Objet is required"))
    )]
    pub objet: String,
    /// Defaults to `programmee`.
    #[serde(default)]
    pub statut: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateAudienceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_audience: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heure: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub juridiction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statut: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateResultatRequest {
    pub type_resultat: String,
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub date_prochaine_audience: Option<NaiveDate>,
    /// Time of the follow-up hearing; defaults to the current hearing's time.
    #[serde(default)]
    pub heure_prochaine_audience: Option<NaiveTime>,
    #[serde(default)]
    pub date_delibere: Option<NaiveDate>,
}

impl CreateResultatRequest {
    /// Check the outcome against the hearing date. Returns `(field, message)`.
    pub fn check(&self, date_audience: NaiveDate) -> Result<(), (&'static str, String)> {
        if !is_valid_resultat_type(&self.type_resultat) {
            return Err((
                "type_resultat",
                format!(
                    "Invalid type_resultat: {}. Valid values: {}",
                    self.type_resultat,
                    RESULTAT_TYPES.join(", ")
                ),
            ));
        }
        match self.type_resultat.as_str() {
            "renvoi" => match self.date_prochaine_audience {
                None => Err((
                    "date_prochaine_audience",
                    "A renvoi requires date_prochaine_audience".to_string(),
                )),
                Some(next) if next <= date_audience => Err((
                    "date_prochaine_audience",
                    "The next hearing must be after the current hearing".to_string(),
                )),
                Some(_) => Ok(()),
            },
            "delibere" if self.date_delibere.is_none() => Err((
                "date_delibere",
                "A delibere requires date_delibere".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct AudienceListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub q: Option<String>,
    pub affaire_id: Option<Uuid>,
    pub statut: Option<String>,
    /// Inclusive lower bound on `date_audience`.
    pub du: Option<NaiveDate>,
    /// Inclusive upper bound on `date_audience`.
    pub au: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct CalendrierParams {
    pub du: NaiveDate,
    pub au: NaiveDate,
}

impl CalendrierParams {
    pub fn check(&self) -> Result<(), String> {
        if self.du > self.au {
            return Err("du must not be after au".to_string());
        }
        if (self.au - self.du).num_days() > CALENDRIER_MAX_JOURS {
            return Err(format!(
                "Calendar range cannot exceed {} days",
                CALENDRIER_MAX_JOURS
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct AVenirParams {
    pub jours: Option<i64>,
}

impl AVenirParams {
    /// Look-ahead window in days, clamped to 1..=90.
    pub fn jours(&self) -> i64 {
        self.jours
            .unwrap_or(A_VENIR_JOURS_DEFAUT)
            .clamp(1, A_VENIR_JOURS_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn resultat(type_resultat: &str) -> CreateResultatRequest {
        CreateResultatRequest {
            type_resultat: type_resultat.to_string(),
            decision: None,
            date_prochaine_audience: None,
            heure_prochaine_audience: None,
            date_delibere: None,
        }
    }

    #[test]
    fn renvoi_requires_a_later_date() {
        let hearing = date(2025, 3, 10);
        let mut req = resultat("renvoi");
        assert_eq!(req.check(hearing).unwrap_err().0, "date_prochaine_audience");

        req.date_prochaine_audience = Some(hearing);
        assert!(req.check(hearing).is_err());

        req.date_prochaine_audience = Some(date(2025, 4, 7));
        assert!(req.check(hearing).is_ok());
    }

    #[test]
    fn delibere_requires_date() {
        let mut req = resultat("delibere");
        assert_eq!(
            req.check(date(2025, 3, 10)).unwrap_err().0,
            "date_delibere"
        );
        req.date_delibere = Some(date(2025, 5, 2));
        assert!(req.check(date(2025, 3, 10)).is_ok());
    }

    #[test]
    fn jugement_needs_nothing_else() {
        assert!(resultat("jugement").check(date(2025, 3, 10)).is_ok());
        assert_eq!(
            resultat("acquittement").check(date(2025, 3, 10)).unwrap_err().0,
            "type_resultat"
        );
    }

    #[test]
    fn hearing_status_after_outcome() {
        assert_eq!(statut_apres_resultat("renvoi"), "renvoyee");
        assert_eq!(statut_apres_resultat("jugement"), "tenue");
        assert_eq!(statut_apres_resultat("radiation"), "tenue");
    }

    #[test]
    fn calendar_range_checks() {
        let ok = CalendrierParams {
            du: date(2025, 1, 1),
            au: date(2025, 12, 31),
        };
        assert!(ok.check().is_ok());

        let reversed = CalendrierParams {
            du: date(2025, 2, 1),
            au: date(2025, 1, 1),
        };
        assert!(reversed.check().is_err());

        let too_long = CalendrierParams {
            du: date(2024, 1, 1),
            au: date(2025, 6, 1),
        };
        assert!(too_long.check().is_err());
    }

    #[test]
    fn a_venir_window_is_clamped() {
        assert_eq!(AVenirParams { jours: None }.jours(), 7);
        assert_eq!(AVenirParams { jours: Some(0) }.jours(), 1);
        assert_eq!(AVenirParams { jours: Some(30) }.jours(), 30);
        assert_eq!(AVenirParams { jours: Some(365) }.jours(), 90);
    }

    #[test]
    fn calendar_item_flattens_audience() {
        let now = Utc::now();
        let item = AudienceCalendrier {
            audience: Audience {
                id: Uuid::nil(),
                affaire_id: Uuid::nil(),
                date_audience: date(2025, 3, 10),
                heure: NaiveTime::from_hms_opt(9, 0, 0),
                juridiction: "TPI Abidjan".into(),
                salle: None,
                objet: "Plaidoiries".into(),
                statut: "programmee".into(),
                notes: None,
                created_at: now,
                updated_at: now,
            },
            affaire_reference: "AFF-2025-0001".into(),
            affaire_intitule: "SCI c/ X".into(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["date_audience"], "2025-03-10");
        assert_eq!(json["affaire_reference"], "AFF-2025-0001");
        assert!(json.get("audience").is_none());
    }
}
