use axum::Router;
use shared_types::{
    // Auth & users
    AppError, AppErrorKind, AuditLog, AuthResponse, ChangePasswordRequest, CreateUserRequest,
    LoginRequest, MessageResponse, RefreshRequest, UpdateUserRequest, UpdateUserRoleRequest,
    UpdateUserStatusRequest, User, UserRole,
    // Shared
    CabinetSettings, CountByLabel, FeatureFlags, PaginationMeta, UpdateStatutRequest,
    // Affaires & audiences
    Affaire, AffaireResponse, AffaireStatistiques, AffaireSynthese, Audience, AudienceCalendrier,
    CreateAffaireRequest, CreateAudienceRequest, CreateResultatRequest, ResultatAudience,
    ResultatResponse, UpdateAffaireRequest, UpdateAudienceRequest,
    // Honoraires & dépenses
    CreateDepenseRequest, CreateHonorairesRequest, CreatePaiementRequest, Depense,
    DepensesAffaire, Honoraires, HonorairesResponse, PaiementHonoraires, UpdateDepenseRequest,
    UpdateHonorairesRequest,
    // Recouvrement
    ActionRecouvrement, CreateActionRequest, CreateDossierRequest, DossierRecouvrement,
    DossierResponse, PaiementRecouvrement, RecouvrementStatistiques, SituationRecouvrement,
    UpdateDossierRequest,
    // Immobilier
    AssignLocataireRequest, CreateEncaissementRequest, CreateImmeubleRequest,
    CreateLocataireRequest, CreateLotRequest, Encaissement, Immeuble, ImpayeLoyer, Locataire,
    Lot, OccupationStatistiques, SyntheseEncaissements, SyntheseMois, UpdateImmeubleRequest,
    UpdateLocataireRequest, UpdateLotRequest,
    // Conseil
    ClientConseil, ConseilStatistiques, CreateClientConseilRequest, CreateFactureRequest,
    FactureConseil, FactureResponse, PaiementConseil, UpdateClientConseilRequest,
    UpdateFactureRequest,
    // Transverse
    ImportErreur, ImportReport, SearchResponse, SearchResult, TableauDeBord,
};
use sqlx::{Pool, Postgres};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_scalar::{Scalar, Servable};

use crate::db::AppState;
use crate::health;
use crate::rest;

/// Declares the `bearer` scheme referenced by protected operations.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&BearerAuth),
    security(("bearer" = [])),
    paths(
        // Auth
        rest::auth::login,
        rest::auth::refresh,
        rest::auth::logout,
        rest::auth::me,
        rest::auth::change_password,
        // Utilisateurs & audit
        rest::utilisateur::list_users,
        rest::utilisateur::create_user,
        rest::utilisateur::get_user,
        rest::utilisateur::update_user,
        rest::utilisateur::delete_user,
        rest::utilisateur::update_user_role,
        rest::utilisateur::update_user_status,
        rest::utilisateur::list_audit_logs,
        // Affaires
        rest::affaire::create_affaire,
        rest::affaire::list_affaires,
        rest::affaire::affaire_statistiques,
        rest::affaire::get_affaire,
        rest::affaire::affaire_synthese,
        rest::affaire::update_affaire,
        rest::affaire::update_affaire_statut,
        rest::affaire::delete_affaire,
        // Audiences
        rest::audience::create_audience,
        rest::audience::list_audiences,
        rest::audience::calendrier,
        rest::audience::a_venir,
        rest::audience::list_affaire_audiences,
        rest::audience::get_audience,
        rest::audience::update_audience,
        rest::audience::delete_audience,
        rest::audience::create_resultat,
        rest::audience::get_resultat,
        rest::audience::delete_resultat,
        // Honoraires & dépenses
        rest::honoraires::create_honoraires,
        rest::honoraires::list_affaire_honoraires,
        rest::honoraires::get_honoraires,
        rest::honoraires::update_honoraires,
        rest::honoraires::delete_honoraires,
        rest::honoraires::create_paiement,
        rest::honoraires::list_paiements,
        rest::honoraires::delete_paiement,
        rest::honoraires::create_depense,
        rest::honoraires::list_affaire_depenses,
        rest::honoraires::update_depense,
        rest::honoraires::delete_depense,
        // Recouvrement
        rest::recouvrement::create_dossier,
        rest::recouvrement::list_dossiers,
        rest::recouvrement::recouvrement_statistiques,
        rest::recouvrement::get_dossier,
        rest::recouvrement::update_dossier,
        rest::recouvrement::update_dossier_statut,
        rest::recouvrement::delete_dossier,
        rest::recouvrement::create_action,
        rest::recouvrement::list_actions,
        rest::recouvrement::delete_action,
        rest::recouvrement::create_paiement,
        rest::recouvrement::list_paiements,
        rest::recouvrement::delete_paiement,
        // Immeubles, lots, locataires
        rest::immeuble::create_immeuble,
        rest::immeuble::list_immeubles,
        rest::immeuble::get_immeuble,
        rest::immeuble::update_immeuble,
        rest::immeuble::delete_immeuble,
        rest::immeuble::list_immeuble_lots,
        rest::immeuble::immeuble_statistiques,
        rest::lot::create_lot,
        rest::lot::list_lots,
        rest::lot::lot_statistiques,
        rest::lot::get_lot,
        rest::lot::update_lot,
        rest::lot::assign_locataire,
        rest::lot::delete_lot,
        rest::lot::list_lot_encaissements,
        rest::locataire::create_locataire,
        rest::locataire::list_locataires,
        rest::locataire::get_locataire,
        rest::locataire::update_locataire,
        rest::locataire::delete_locataire,
        // Encaissements
        rest::encaissement::create_encaissement,
        rest::encaissement::list_encaissements,
        rest::encaissement::impayes,
        rest::encaissement::synthese,
        rest::encaissement::get_encaissement,
        rest::encaissement::delete_encaissement,
        // Conseil & factures
        rest::conseil::create_client,
        rest::conseil::list_clients,
        rest::conseil::conseil_statistiques,
        rest::conseil::get_client,
        rest::conseil::update_client,
        rest::conseil::delete_client,
        rest::conseil::list_client_factures,
        rest::facture::create_facture,
        rest::facture::list_factures,
        rest::facture::get_facture,
        rest::facture::update_facture,
        rest::facture::delete_facture,
        rest::facture::emettre_facture,
        rest::facture::annuler_facture,
        rest::facture::create_paiement,
        rest::facture::list_paiements,
        rest::facture::delete_paiement,
        // Transverse
        rest::dashboard::tableau_de_bord,
        rest::recherche::recherche,
        rest::rapport::releve_encaissements,
        rest::rapport::releve_recouvrement,
        rest::rapport::facture_pdf,
        rest::rapport::honoraires_affaire,
        rest::export::export,
        rest::export::import,
        health::health_check,
    ),
    components(schemas(
        AppError, AppErrorKind, AuditLog, AuthResponse, ChangePasswordRequest, CreateUserRequest,
        LoginRequest, MessageResponse, RefreshRequest, UpdateUserRequest, UpdateUserRoleRequest,
        UpdateUserStatusRequest, User, UserRole,
        CabinetSettings, CountByLabel, FeatureFlags, PaginationMeta, UpdateStatutRequest,
        Affaire, AffaireResponse, AffaireStatistiques, AffaireSynthese, Audience,
        AudienceCalendrier, CreateAffaireRequest, CreateAudienceRequest, CreateResultatRequest,
        ResultatAudience, ResultatResponse, UpdateAffaireRequest, UpdateAudienceRequest,
        CreateDepenseRequest, CreateHonorairesRequest, CreatePaiementRequest, Depense,
        DepensesAffaire, Honoraires, HonorairesResponse, PaiementHonoraires,
        UpdateDepenseRequest, UpdateHonorairesRequest,
        ActionRecouvrement, CreateActionRequest, CreateDossierRequest, DossierRecouvrement,
        DossierResponse, PaiementRecouvrement, RecouvrementStatistiques, SituationRecouvrement,
        UpdateDossierRequest,
        AssignLocataireRequest, CreateEncaissementRequest, CreateImmeubleRequest,
        CreateLocataireRequest, CreateLotRequest, Encaissement, Immeuble, ImpayeLoyer,
        Locataire, Lot, OccupationStatistiques, SyntheseEncaissements, SyntheseMois,
        UpdateImmeubleRequest, UpdateLocataireRequest, UpdateLotRequest,
        ClientConseil, ConseilStatistiques, CreateClientConseilRequest, CreateFactureRequest,
        FactureConseil, FactureResponse, PaiementConseil, UpdateClientConseilRequest,
        UpdateFactureRequest,
        ImportErreur, ImportReport, SearchResponse, SearchResult, TableauDeBord,
        health::HealthResponse,
    )),
    tags(
        (name = "auth", description = "Login, token refresh and password change"),
        (name = "utilisateurs", description = "User accounts and roles"),
        (name = "audit", description = "Audit trail"),
        (name = "affaires", description = "Litigation matters"),
        (name = "audiences", description = "Hearings and their outcomes"),
        (name = "honoraires", description = "Fee agreements and fee payments"),
        (name = "depenses", description = "Matter expenses"),
        (name = "recouvrement", description = "Debt-collection files, actions and payments"),
        (name = "immeubles", description = "Managed buildings"),
        (name = "lots", description = "Rental units and tenant assignment"),
        (name = "locataires", description = "Tenants"),
        (name = "encaissements", description = "Rent collection"),
        (name = "conseil", description = "Advisory clients"),
        (name = "factures", description = "Advisory invoices and payments"),
        (name = "tableau-de-bord", description = "Firm-wide dashboard"),
        (name = "recherche", description = "Full-text search"),
        (name = "rapports", description = "PDF statements and invoices"),
        (name = "exports", description = "CSV exports"),
        (name = "imports", description = "CSV imports"),
        (name = "health", description = "Health check endpoint")
    ),
    info(
        title = "CAPCO API",
        description = "Practice management for litigation, debt collection, property management and advisory work",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;

/// Build the REST API, `/health` and the Scalar docs at `/docs`.
pub fn api_router(pool: Pool<Postgres>) -> Router {
    Router::new()
        .merge(rest::api_router())
        .route("/health", axum::routing::get(health::health_check))
        .with_state(AppState::new(pool))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
}

/// The full application: API routes plus body limit, auth claims,
/// request ids and, when enabled, per-request OpenTelemetry spans.
pub fn app(pool: Pool<Postgres>) -> Router {
    let mut router = api_router(pool);

    if crate::config::feature_flags().telemetry {
        router = router.layer(crate::telemetry::OtelTraceLayer);
    }

    router
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(axum::extract::DefaultBodyLimit::max(crate::config::max_upload_bytes()))
        .layer(axum::middleware::from_fn(crate::auth::middleware::auth_middleware))
        .layer(tower_http::request_id::PropagateRequestIdLayer::x_request_id())
        .layer(tower_http::request_id::SetRequestIdLayer::x_request_id(
            tower_http::request_id::MakeRequestUuid,
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_area() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/login",
            "/api/affaires/{id}/synthese",
            "/api/audiences/a-venir",
            "/api/dossiers-recouvrement/{id}/paiements",
            "/api/lots/{id}/locataire",
            "/api/encaissements/impayes",
            "/api/factures/{id}/emettre",
            "/api/rapports/factures/{id}",
            "/api/imports/{entite}",
            "/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn bearer_scheme_is_declared() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
        assert!(components.schemas.contains_key("AffaireResponse"));
    }
}
