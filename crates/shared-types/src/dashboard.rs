use serde::{Deserialize, Serialize};

/// Figures shown on the home screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TableauDeBord {
    pub affaires_en_cours: i64,
    /// Programmed hearings in the next 7 days.
    pub audiences_a_venir: i64,
    pub dossiers_actifs: i64,
    pub reste_du_recouvrement: i64,
    pub lots_occupes: i64,
    pub lots_total: i64,
    pub taux_occupation: f64,
    pub encaissements_mois: i64,
    pub commission_mois: i64,
    pub factures_impayees: i64,
    pub montant_factures_impayees: i64,
}
