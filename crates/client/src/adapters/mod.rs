//! One adapter per resource family. Each mutation lists the cached
//! prefixes it makes stale: its own family plus the aggregates that read it.

mod conseil;
mod contentieux;
mod immobilier;
mod recouvrement;
mod utilisateurs;

pub use conseil::{ClientsConseil, Factures};
pub use contentieux::{Affaires, Audiences, Depenses, HonorairesApi};
pub use immobilier::{Encaissements, Immeubles, Locataires, Lots};
pub use recouvrement::Recouvrement;
pub use utilisateurs::Utilisateurs;

const DASHBOARD: &str = "/api/tableau-de-bord";
const SEARCH: &str = "/api/recherche";

pub(crate) const AFFAIRES: &[&str] = &["/api/affaires", DASHBOARD, SEARCH];
pub(crate) const AUDIENCES: &[&str] = &["/api/audiences", "/api/affaires", DASHBOARD];
pub(crate) const HONORAIRES: &[&str] = &["/api/honoraires", "/api/affaires", DASHBOARD];
pub(crate) const DEPENSES: &[&str] = &["/api/depenses", "/api/affaires"];
pub(crate) const RECOUVREMENT: &[&str] = &["/api/dossiers-recouvrement", DASHBOARD, SEARCH];
pub(crate) const IMMEUBLES: &[&str] =
    &["/api/immeubles", "/api/lots", "/api/encaissements", DASHBOARD, SEARCH];
pub(crate) const LOTS: &[&str] = &["/api/lots", "/api/immeubles", "/api/encaissements", DASHBOARD];
pub(crate) const LOCATAIRES: &[&str] =
    &["/api/locataires", "/api/lots", "/api/immeubles", DASHBOARD, SEARCH];
pub(crate) const ENCAISSEMENTS: &[&str] = &["/api/encaissements", "/api/lots", "/api/immeubles", DASHBOARD];
pub(crate) const CLIENTS: &[&str] = &["/api/clients-conseil", "/api/factures", DASHBOARD, SEARCH];
pub(crate) const FACTURES: &[&str] = &["/api/factures", "/api/clients-conseil", DASHBOARD, SEARCH];
pub(crate) const UTILISATEURS: &[&str] = &["/api/utilisateurs"];

/// Prefixes made stale by a CSV import of `entite`.
pub(crate) fn import_invalidates(entite: &str) -> &'static [&'static str] {
    match entite {
        "locataires" => LOCATAIRES,
        "clients-conseil" => CLIENTS,
        "dossiers-recouvrement" => RECOUVREMENT,
        "lots" => LOTS,
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rent_payment_clears_dependent_views() {
        for prefix in ["/api/encaissements", "/api/lots", "/api/immeubles", DASHBOARD] {
            assert!(ENCAISSEMENTS.contains(&prefix), "missing {prefix}");
        }
    }

    #[test]
    fn lot_changes_clear_arrears_views() {
        for family in [LOTS, IMMEUBLES] {
            for prefix in ["/api/lots", "/api/immeubles", "/api/encaissements", DASHBOARD] {
                assert!(family.contains(&prefix), "missing {prefix}");
            }
        }
    }

    #[test]
    fn tenant_changes_clear_occupancy_views() {
        for prefix in ["/api/locataires", "/api/lots", "/api/immeubles", DASHBOARD] {
            assert!(LOCATAIRES.contains(&prefix), "missing {prefix}");
        }
    }

    #[test]
    fn imports_map_to_their_family() {
        assert_eq!(import_invalidates("lots"), LOTS);
        assert_eq!(import_invalidates("clients-conseil"), CLIENTS);
        assert!(import_invalidates("inconnu").is_empty());
    }
}
