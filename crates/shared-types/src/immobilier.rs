use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "validation")]
use validator::Validate;

use crate::money;

// ── Validation constants ────────────────────────────────────────────

pub const LOT_TYPES: &[&str] = &[
    "appartement",
    "bureau",
    "commerce",
    "magasin",
    "entrepot",
    "parking",
    "autre",
];

pub const LOT_STATUTS: &[&str] = &["libre", "occupe", "travaux"];

pub const LOCATAIRE_TYPES: &[&str] = &["particulier", "entreprise"];

pub fn is_valid_lot_type(s: &str) -> bool {
    LOT_TYPES.contains(&s)
}

pub fn is_valid_lot_statut(s: &str) -> bool {
    LOT_STATUTS.contains(&s)
}

pub fn is_valid_locataire_type(s: &str) -> bool {
    LOCATAIRE_TYPES.contains(&s)
}

// ── Rent periods ────────────────────────────────────────────────────

/// Parse a `YYYY-MM` rent period into the first day of that month.
pub fn parse_periode(s: &str) -> Result<NaiveDate, String> {
    let err = || format!("Invalid periode: {}. Expected YYYY-MM", s);
    let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(err());
    }
    let year: i32 = year.parse().map_err(|_| err())?;
    let month: u32 = month.parse().map_err(|_| err())?;
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(err)
}

/// Format a period date as `YYYY-MM`.
pub fn format_periode(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// First day of the month containing `date`.
pub fn debut_de_mois(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Serde adapter storing a period as a date and exchanging it as `YYYY-MM`.
pub mod periode_format {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_periode(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_periode(&raw).map_err(serde::de::Error::custom)
    }
}

// ── DB row structs ──────────────────────────────────────────────────

/// A managed building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Immeuble {
    pub id: Uuid,
    pub reference: String,
    pub nom: String,
    pub adresse: String,
    pub ville: Option<String>,
    pub proprietaire_nom: String,
    pub proprietaire_contact: Option<String>,
    /// CAPCO management fee on collected rents, in percent.
    pub taux_commission: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A tenant, either a person or a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Locataire {
    pub id: Uuid,
    pub type_locataire: String,
    pub nom: Option<String>,
    pub prenom: Option<String>,
    pub raison_sociale: Option<String>,
    pub telephone: Option<String>,
    pub email: Option<String>,
    pub piece_identite: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Locataire {
    /// Display name: company name for companies, "Prenom Nom" otherwise.
    pub fn designation(&self) -> String {
        designation_locataire(
            &self.type_locataire,
            self.nom.as_deref(),
            self.prenom.as_deref(),
            self.raison_sociale.as_deref(),
        )
    }
}

pub fn designation_locataire(
    type_locataire: &str,
    nom: Option<&str>,
    prenom: Option<&str>,
    raison_sociale: Option<&str>,
) -> String {
    if type_locataire == "entreprise" {
        if let Some(rs) = raison_sociale.filter(|s| !s.trim().is_empty()) {
            return rs.to_string();
        }
    }
    [prenom, nom]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A person needs a `nom`, a company a `raison_sociale`.
pub fn check_identite_locataire(
    type_locataire: &str,
    nom: Option<&str>,
    raison_sociale: Option<&str>,
) -> Result<(), (&'static str, String)> {
    let blank = |v: Option<&str>| v.map(|s| s.trim().is_empty()).unwrap_or(true);
    match type_locataire {
        "particulier" if blank(nom) => Err(("nom", "Nom is required for a particulier".into())),
        "entreprise" if blank(raison_sociale) => Err((
            "raison_sociale",
            "Raison sociale is required for an entreprise".into(),
        )),
        "particulier" | "entreprise" => Ok(()),
        other => Err((
            "type_locataire",
            format!(
                "Invalid type_locataire: {}. Valid values: {}",
                other,
                LOCATAIRE_TYPES.join(", ")
            ),
        )),
    }
}

/// A rentable unit inside a building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Lot {
    pub id: Uuid,
    pub immeuble_id: Uuid,
    pub numero: String,
    pub type_lot: String,
    pub etage: Option<String>,
    pub surface: Option<f64>,
    pub loyer_mensuel: i64,
    pub statut: String,
    pub locataire_id: Option<Uuid>,
    pub date_entree: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A rent payment received for a lot and a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Encaissement {
    pub id: Uuid,
    pub lot_id: Uuid,
    pub locataire_id: Option<Uuid>,
    #[serde(with = "periode_format")]
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "2025-03"))]
    pub periode: NaiveDate,
    pub montant: i64,
    pub commission_capco: i64,
    pub montant_net: i64,
    pub date_encaissement: NaiveDate,
    pub mode_paiement: String,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ── Statistics ──────────────────────────────────────────────────────

/// Raw lot counts fetched from the database.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct LotCounts {
    pub total: i64,
    pub occupes: i64,
    pub libres: i64,
    pub travaux: i64,
    pub somme_loyers: i64,
}

/// Occupancy figures for one building or the whole portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct OccupationStatistiques {
    pub lots_total: i64,
    pub lots_occupes: i64,
    pub lots_libres: i64,
    pub lots_travaux: i64,
    pub taux_occupation: f64,
    /// Sum of monthly rents of every lot.
    pub loyer_theorique_mensuel: i64,
    pub loyer_moyen: i64,
}

impl From<LotCounts> for OccupationStatistiques {
    fn from(c: LotCounts) -> Self {
        Self {
            lots_total: c.total,
            lots_occupes: c.occupes,
            lots_libres: c.libres,
            lots_travaux: c.travaux,
            taux_occupation: money::taux(c.occupes, c.total),
            loyer_theorique_mensuel: c.somme_loyers,
            loyer_moyen: money::moyenne(c.somme_loyers, c.total),
        }
    }
}

/// Occupied lot whose collections for a month fall short of the rent.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct ImpayeRow {
    pub lot_id: Uuid,
    pub lot_numero: String,
    pub immeuble_id: Uuid,
    pub immeuble_nom: String,
    pub locataire_id: Option<Uuid>,
    pub type_locataire: Option<String>,
    pub locataire_nom: Option<String>,
    pub locataire_prenom: Option<String>,
    pub locataire_raison_sociale: Option<String>,
    pub montant_du: i64,
    pub montant_encaisse: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ImpayeLoyer {
    pub lot_id: Uuid,
    pub lot_numero: String,
    pub immeuble_id: Uuid,
    pub immeuble_nom: String,
    pub locataire_id: Option<Uuid>,
    pub locataire: Option<String>,
    pub montant_du: i64,
    pub montant_encaisse: i64,
    pub reste: i64,
}

impl From<ImpayeRow> for ImpayeLoyer {
    fn from(r: ImpayeRow) -> Self {
        let locataire = r.type_locataire.as_deref().map(|t| {
            designation_locataire(
                t,
                r.locataire_nom.as_deref(),
                r.locataire_prenom.as_deref(),
                r.locataire_raison_sociale.as_deref(),
            )
        });
        Self {
            lot_id: r.lot_id,
            lot_numero: r.lot_numero,
            immeuble_id: r.immeuble_id,
            immeuble_nom: r.immeuble_nom,
            locataire_id: r.locataire_id,
            locataire,
            montant_du: r.montant_du,
            montant_encaisse: r.montant_encaisse,
            reste: money::reste(r.montant_du, r.montant_encaisse),
        }
    }
}

/// Collections of one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct SyntheseMois {
    #[serde(with = "periode_format")]
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "2025-03"))]
    pub periode: NaiveDate,
    pub nombre: i64,
    pub total_encaisse: i64,
    pub total_commission: i64,
    pub total_net: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SyntheseEncaissements {
    pub total_encaisse: i64,
    pub total_commission: i64,
    pub total_net: i64,
    pub par_mois: Vec<SyntheseMois>,
}

impl SyntheseEncaissements {
    pub fn from_mois(par_mois: Vec<SyntheseMois>) -> Self {
        Self {
            total_encaisse: par_mois.iter().map(|m| m.total_encaisse).sum(),
            total_commission: par_mois.iter().map(|m| m.total_commission).sum(),
            total_net: par_mois.iter().map(|m| m.total_net).sum(),
            par_mois,
        }
    }
}

// ── Request types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct CreateImmeubleRequest {
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Nom is required"))
    )]
    pub nom: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Adresse is required"))
    )]
    pub adresse: String,
    #[serde(default)]
    pub ville: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Owner name is required"))
    )]
    pub proprietaire_nom: String,
    #[serde(default)]
    pub proprietaire_contact: Option<String>,
    /// Defaults to the configured rate.
    #[serde(default)]
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 0.0, max = 100.0, message = "Commission rate must be between 0 and 100"))
    )]
    pub taux_commission: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct UpdateImmeubleRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adresse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ville: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proprietaire_nom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proprietaire_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 0.0, max = 100.0, message = "Commission rate must be between 0 and 100"))
    )]
    pub taux_commission: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct CreateLotRequest {
    pub immeuble_id: Uuid,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Numero is required"))
    )]
    pub numero: String,
    pub type_lot: String,
    #[serde(default)]
    pub etage: Option<String>,
    #[serde(default)]
    pub surface: Option<f64>,
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 0i64, max = 1_000_000_000_000i64, message = "Amount must be between 0 and 1 000 000 000 000"))
    )]
    pub loyer_mensuel: i64,
    /// `libre` or `travaux`; tenants are set through the assignment endpoint.
    #[serde(default)]
    pub statut: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct UpdateLotRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numero: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_lot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 0i64, max = 1_000_000_000_000i64, message = "Amount must be between 0 and 1 000 000 000 000"))
    )]
    pub loyer_mensuel: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statut: Option<String>,
}

/// Assign (or with `null`, release) the tenant of a lot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AssignLocataireRequest {
    pub locataire_id: Option<Uuid>,
    /// Defaults to today when a tenant is assigned.
    #[serde(default)]
    pub date_entree: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateLocataireRequest {
    pub type_locataire: String,
    #[serde(default)]
    pub nom: Option<String>,
    #[serde(default)]
    pub prenom: Option<String>,
    #[serde(default)]
    pub raison_sociale: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub piece_identite: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateLocataireRequest {
    pub fn check(&self) -> Result<(), (&'static str, String)> {
        check_identite_locataire(
            &self.type_locataire,
            self.nom.as_deref(),
            self.raison_sociale.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateLocataireRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_locataire: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prenom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raison_sociale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telephone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub piece_identite: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct CreateEncaissementRequest {
    pub lot_id: Uuid,
    /// Rent month, `YYYY-MM`.
    pub periode: String,
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 1i64, max = 1_000_000_000_000i64, message = "Amount must be between 1 and 1 000 000 000 000"))
    )]
    pub montant: i64,
    #[serde(default)]
    pub date_encaissement: Option<NaiveDate>,
    pub mode_paiement: String,
    #[serde(default)]
    pub reference: Option<String>,
    /// Defaults to the lot's current tenant.
    #[serde(default)]
    pub locataire_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct ImmeubleListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub q: Option<String>,
    pub ville: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct LotListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub q: Option<String>,
    pub immeuble_id: Option<Uuid>,
    pub statut: Option<String>,
    pub type_lot: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct LocataireListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub q: Option<String>,
    pub type_locataire: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct EncaissementListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub lot_id: Option<Uuid>,
    pub immeuble_id: Option<Uuid>,
    /// First period, `YYYY-MM`.
    pub du: Option<String>,
    /// Last period, `YYYY-MM`.
    pub au: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct ImpayesParams {
    /// Month to check, `YYYY-MM`.
    pub periode: String,
    pub immeuble_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct SyntheseParams {
    pub du: String,
    pub au: String,
    pub immeuble_id: Option<Uuid>,
}

/// Parse an inclusive `(du, au)` period range given as `YYYY-MM` strings.
pub fn parse_periode_range(
    du: Option<&str>,
    au: Option<&str>,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), String> {
    let du = du.map(parse_periode).transpose()?;
    let au = au.map(parse_periode).transpose()?;
    if let (Some(d), Some(a)) = (du, au) {
        if d > a {
            return Err("du must not be after au".to_string());
        }
    }
    Ok((du, au))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn periode_parsing() {
        assert_eq!(parse_periode("2025-03").unwrap(), date(2025, 3, 1));
        assert_eq!(parse_periode(" 2024-12 ").unwrap(), date(2024, 12, 1));
        assert!(parse_periode("2025-13").is_err());
        assert!(parse_periode("2025-3").is_err());
        assert!(parse_periode("03-2025").is_err());
        assert!(parse_periode("2025/03").is_err());
        assert!(parse_periode("").is_err());
    }

    #[test]
    fn periode_formatting() {
        assert_eq!(format_periode(date(2025, 3, 17)), "2025-03");
        assert_eq!(debut_de_mois(date(2025, 3, 17)), date(2025, 3, 1));
    }

    #[test]
    fn periode_range() {
        let (du, au) = parse_periode_range(Some("2025-01"), Some("2025-06")).unwrap();
        assert_eq!(du, Some(date(2025, 1, 1)));
        assert_eq!(au, Some(date(2025, 6, 1)));
        assert!(parse_periode_range(Some("2025-06"), Some("2025-01")).is_err());
        assert_eq!(parse_periode_range(None, None).unwrap(), (None, None));
    }

    #[test]
    fn encaissement_periode_serializes_as_month() {
        let e = Encaissement {
            id: Uuid::nil(),
            lot_id: Uuid::nil(),
            locataire_id: None,
            periode: date(2025, 3, 1),
            montant: 150_000,
            commission_capco: 15_000,
            montant_net: 135_000,
            date_encaissement: date(2025, 3, 5),
            mode_paiement: "virement".into(),
            reference: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["periode"], "2025-03");
        let back: Encaissement = serde_json::from_value(json).unwrap();
        assert_eq!(back.periode, date(2025, 3, 1));
    }

    #[test]
    fn designation_prefers_raison_sociale_for_companies() {
        assert_eq!(
            designation_locataire("entreprise", Some("Kone"), None, Some("SIB SA")),
            "SIB SA"
        );
        assert_eq!(
            designation_locataire("particulier", Some("Kone"), Some("Awa"), None),
            "Awa Kone"
        );
        assert_eq!(
            designation_locataire("entreprise", Some("Kone"), None, Some("  ")),
            "Kone"
        );
    }

    #[test]
    fn identite_rules() {
        assert!(check_identite_locataire("particulier", Some("Kone"), None).is_ok());
        assert_eq!(
            check_identite_locataire("particulier", Some(" "), None).unwrap_err().0,
            "nom"
        );
        assert_eq!(
            check_identite_locataire("entreprise", Some("Kone"), None).unwrap_err().0,
            "raison_sociale"
        );
        assert_eq!(
            check_identite_locataire("association", Some("X"), Some("Y")).unwrap_err().0,
            "type_locataire"
        );
    }

    #[test]
    fn occupation_statistics() {
        let stats = OccupationStatistiques::from(LotCounts {
            total: 8,
            occupes: 6,
            libres: 1,
            travaux: 1,
            somme_loyers: 1_600_000,
        });
        assert_eq!(stats.taux_occupation, 75.0);
        assert_eq!(stats.loyer_moyen, 200_000);

        let empty = OccupationStatistiques::from(LotCounts::default());
        assert_eq!(empty.taux_occupation, 0.0);
        assert_eq!(empty.loyer_moyen, 0);
    }

    #[test]
    fn impaye_computes_reste() {
        let impaye = ImpayeLoyer::from(ImpayeRow {
            lot_id: Uuid::nil(),
            lot_numero: "A2".into(),
            immeuble_id: Uuid::nil(),
            immeuble_nom: "Residence Cocody".into(),
            locataire_id: Some(Uuid::nil()),
            type_locataire: Some("particulier".into()),
            locataire_nom: Some("Traore".into()),
            locataire_prenom: Some("Ibrahim".into()),
            locataire_raison_sociale: None,
            montant_du: 200_000,
            montant_encaisse: 50_000,
        });
        assert_eq!(impaye.reste, 150_000);
        assert_eq!(impaye.locataire.as_deref(), Some("Ibrahim Traore"));
    }

    #[test]
    fn synthese_totals() {
        let mois = |m, enc, com| SyntheseMois {
            periode: date(2025, m, 1),
            nombre: 1,
            total_encaisse: enc,
            total_commission: com,
            total_net: enc - com,
        };
        let s = SyntheseEncaissements::from_mois(vec![mois(1, 100_000, 10_000), mois(2, 50_000, 5_000)]);
        assert_eq!(s.total_encaisse, 150_000);
        assert_eq!(s.total_commission, 15_000);
        assert_eq!(s.total_net, 135_000);
        assert_eq!(s.par_mois.len(), 2);
    }
}
