pub mod affaire;
pub mod audience;
pub mod auth;
pub mod conseil;
pub mod dashboard;
pub mod encaissement;
pub mod export;
pub mod facture;
pub mod honoraires;
pub mod immeuble;
pub mod locataire;
pub mod lot;
pub mod rapport;
pub mod recherche;
pub mod recouvrement;
pub mod utilisateur;

use axum::{routing::{delete, get, patch, post, put}, Router};
use shared_types::AppError;
use uuid::Uuid;

use crate::db::AppState;

/// Parse a path id, answering 400 on malformed input.
pub fn parse_uuid(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::bad_request("Invalid UUID format"))
}

/// Build the combined REST API router.
///
/// Literal segments (`statistiques`, `calendrier`, `a-venir`, `impayes`,
/// `synthese`) take precedence over `{id}` captures in axum's matcher.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/password", put(auth::change_password))
        // Utilisateurs & audit
        .route("/api/utilisateurs", get(utilisateur::list_users).post(utilisateur::create_user))
        .route(
            "/api/utilisateurs/{id}",
            get(utilisateur::get_user)
                .put(utilisateur::update_user)
                .delete(utilisateur::delete_user),
        )
        .route("/api/utilisateurs/{id}/role", patch(utilisateur::update_user_role))
        .route("/api/utilisateurs/{id}/statut", patch(utilisateur::update_user_status))
        .route("/api/audit-logs", get(utilisateur::list_audit_logs))
        // Affaires
        .route("/api/affaires", get(affaire::list_affaires).post(affaire::create_affaire))
        .route("/api/affaires/statistiques", get(affaire::affaire_statistiques))
        .route(
            "/api/affaires/{id}",
            get(affaire::get_affaire)
                .put(affaire::update_affaire)
                .delete(affaire::delete_affaire),
        )
        .route("/api/affaires/{id}/statut", patch(affaire::update_affaire_statut))
        .route("/api/affaires/{id}/synthese", get(affaire::affaire_synthese))
        .route("/api/affaires/{id}/audiences", get(audience::list_affaire_audiences))
        .route("/api/affaires/{id}/honoraires", get(honoraires::list_affaire_honoraires))
        .route("/api/affaires/{id}/depenses", get(honoraires::list_affaire_depenses))
        // Audiences
        .route("/api/audiences", get(audience::list_audiences).post(audience::create_audience))
        .route("/api/audiences/calendrier", get(audience::calendrier))
        .route("/api/audiences/a-venir", get(audience::a_venir))
        .route(
            "/api/audiences/{id}",
            get(audience::get_audience)
                .put(audience::update_audience)
                .delete(audience::delete_audience),
        )
        .route(
            "/api/audiences/{id}/resultat",
            get(audience::get_resultat).post(audience::create_resultat),
        )
        .route("/api/resultats/{id}", delete(audience::delete_resultat))
        // Honoraires & dépenses
        .route("/api/honoraires", post(honoraires::create_honoraires))
        .route(
            "/api/honoraires/{id}",
            get(honoraires::get_honoraires)
                .put(honoraires::update_honoraires)
                .delete(honoraires::delete_honoraires),
        )
        .route(
            "/api/honoraires/{id}/paiements",
            get(honoraires::list_paiements).post(honoraires::create_paiement),
        )
        .route("/api/paiements-honoraires/{id}", delete(honoraires::delete_paiement))
        .route("/api/depenses", post(honoraires::create_depense))
        .route(
            "/api/depenses/{id}",
            put(honoraires::update_depense).delete(honoraires::delete_depense),
        )
        // Recouvrement
        .route(
            "/api/dossiers-recouvrement",
            get(recouvrement::list_dossiers).post(recouvrement::create_dossier),
        )
        .route(
            "/api/dossiers-recouvrement/statistiques",
            get(recouvrement::recouvrement_statistiques),
        )
        .route(
            "/api/dossiers-recouvrement/{id}",
            get(recouvrement::get_dossier)
                .put(recouvrement::update_dossier)
                .delete(recouvrement::delete_dossier),
        )
        .route(
            "/api/dossiers-recouvrement/{id}/statut",
            patch(recouvrement::update_dossier_statut),
        )
        .route(
            "/api/dossiers-recouvrement/{id}/actions",
            get(recouvrement::list_actions).post(recouvrement::create_action),
        )
        .route(
            "/api/dossiers-recouvrement/{id}/paiements",
            get(recouvrement::list_paiements).post(recouvrement::create_paiement),
        )
        .route("/api/actions-recouvrement/{id}", delete(recouvrement::delete_action))
        .route("/api/paiements-recouvrement/{id}", delete(recouvrement::delete_paiement))
        // Immeubles, lots, locataires
        .route("/api/immeubles", get(immeuble::list_immeubles).post(immeuble::create_immeuble))
        .route(
            "/api/immeubles/{id}",
            get(immeuble::get_immeuble)
                .put(immeuble::update_immeuble)
                .delete(immeuble::delete_immeuble),
        )
        .route("/api/immeubles/{id}/lots", get(immeuble::list_immeuble_lots))
        .route("/api/immeubles/{id}/statistiques", get(immeuble::immeuble_statistiques))
        .route("/api/lots", get(lot::list_lots).post(lot::create_lot))
        .route("/api/lots/statistiques", get(lot::lot_statistiques))
        .route(
            "/api/lots/{id}",
            get(lot::get_lot).put(lot::update_lot).delete(lot::delete_lot),
        )
        .route("/api/lots/{id}/locataire", patch(lot::assign_locataire))
        .route("/api/lots/{id}/encaissements", get(lot::list_lot_encaissements))
        .route(
            "/api/locataires",
            get(locataire::list_locataires).post(locataire::create_locataire),
        )
        .route(
            "/api/locataires/{id}",
            get(locataire::get_locataire)
                .put(locataire::update_locataire)
                .delete(locataire::delete_locataire),
        )
        // Encaissements
        .route(
            "/api/encaissements",
            get(encaissement::list_encaissements).post(encaissement::create_encaissement),
        )
        .route("/api/encaissements/impayes", get(encaissement::impayes))
        .route("/api/encaissements/synthese", get(encaissement::synthese))
        .route(
            "/api/encaissements/{id}",
            get(encaissement::get_encaissement).delete(encaissement::delete_encaissement),
        )
        // Conseil & factures
        .route(
            "/api/clients-conseil",
            get(conseil::list_clients).post(conseil::create_client),
        )
        .route("/api/clients-conseil/statistiques", get(conseil::conseil_statistiques))
        .route(
            "/api/clients-conseil/{id}",
            get(conseil::get_client)
                .put(conseil::update_client)
                .delete(conseil::delete_client),
        )
        .route("/api/clients-conseil/{id}/factures", get(conseil::list_client_factures))
        .route("/api/factures", get(facture::list_factures).post(facture::create_facture))
        .route(
            "/api/factures/{id}",
            get(facture::get_facture)
                .put(facture::update_facture)
                .delete(facture::delete_facture),
        )
        .route("/api/factures/{id}/emettre", post(facture::emettre_facture))
        .route("/api/factures/{id}/annuler", post(facture::annuler_facture))
        .route(
            "/api/factures/{id}/paiements",
            get(facture::list_paiements).post(facture::create_paiement),
        )
        .route("/api/paiements-conseil/{id}", delete(facture::delete_paiement))
        // Transverse
        .route("/api/tableau-de-bord", get(dashboard::tableau_de_bord))
        .route("/api/recherche", get(recherche::recherche))
        .route(
            "/api/rapports/immeubles/{id}/encaissements",
            get(rapport::releve_encaissements),
        )
        .route(
            "/api/rapports/dossiers-recouvrement/{id}/releve",
            get(rapport::releve_recouvrement),
        )
        .route("/api/rapports/factures/{id}", get(rapport::facture_pdf))
        .route("/api/rapports/affaires/{id}/honoraires", get(rapport::honoraires_affaire))
        .route("/api/exports/{entite}", get(export::export))
        .route("/api/imports/{entite}", post(export::import))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_uuid_rejects_garbage() {
        let err = parse_uuid("not-a-uuid").unwrap_err();
        assert_eq!(err.status_code_u16(), 400);
        assert_eq!(err.message, "Invalid UUID format");
    }

    #[test]
    fn parse_uuid_accepts_hyphenated() {
        let id = Uuid::new_v4();
        assert_eq!(parse_uuid(&id.to_string()).unwrap(), id);
    }
}
