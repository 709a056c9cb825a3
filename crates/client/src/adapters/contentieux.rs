use shared_types::{
    AVenirParams, AffaireListParams, AffaireResponse, AffaireStatistiques, AffaireSynthese,
    Audience, AudienceCalendrier, AudienceListParams, CalendrierParams, CreateAffaireRequest,
    CreateAudienceRequest, CreateDepenseRequest, CreateHonorairesRequest, CreatePaiementRequest,
    CreateResultatRequest, Depense, DepensesAffaire, Honoraires, HonorairesResponse,
    PaginatedResponse, PaiementHonoraires, ResultatAudience, ResultatResponse,
    UpdateAffaireRequest, UpdateAudienceRequest, UpdateDepenseRequest, UpdateHonorairesRequest,
    UpdateStatutRequest,
};
use uuid::Uuid;

use super::{AFFAIRES, AUDIENCES, DEPENSES, HONORAIRES};
use crate::{CapcoClient, ClientResult};

pub struct Affaires<'a> {
    client: &'a CapcoClient,
}

impl<'a> Affaires<'a> {
    pub(crate) fn new(client: &'a CapcoClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &AffaireListParams) -> ClientResult<PaginatedResponse<AffaireResponse>> {
        self.client.get_with("/api/affaires", params).await
    }

    pub async fn get(&self, id: Uuid) -> ClientResult<AffaireResponse> {
        self.client.get(&format!("/api/affaires/{id}")).await
    }

    pub async fn create(&self, req: &CreateAffaireRequest) -> ClientResult<AffaireResponse> {
        self.client.post("/api/affaires", req, AFFAIRES).await
    }

    pub async fn update(&self, id: Uuid, req: &UpdateAffaireRequest) -> ClientResult<AffaireResponse> {
        self.client.put(&format!("/api/affaires/{id}"), req, AFFAIRES).await
    }

    pub async fn update_statut(&self, id: Uuid, statut: &str) -> ClientResult<AffaireResponse> {
        let body = UpdateStatutRequest {
            statut: statut.to_string(),
        };
        self.client
            .patch(&format!("/api/affaires/{id}/statut"), &body, AFFAIRES)
            .await
    }

    /// Also removes the affaire's hearings, fees and expenses server side.
    pub async fn delete(&self, id: Uuid) -> ClientResult<()> {
        self.client
            .delete(&format!("/api/affaires/{id}"), &[AFFAIRES, AUDIENCES, HONORAIRES].concat())
            .await
    }

    pub async fn statistiques(&self) -> ClientResult<AffaireStatistiques> {
        self.client.get("/api/affaires/statistiques").await
    }

    pub async fn synthese(&self, id: Uuid) -> ClientResult<AffaireSynthese> {
        self.client.get(&format!("/api/affaires/{id}/synthese")).await
    }

    pub async fn audiences(&self, id: Uuid) -> ClientResult<Vec<Audience>> {
        self.client.get(&format!("/api/affaires/{id}/audiences")).await
    }
}

pub struct Audiences<'a> {
    client: &'a CapcoClient,
}

impl<'a> Audiences<'a> {
    pub(crate) fn new(client: &'a CapcoClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &AudienceListParams) -> ClientResult<PaginatedResponse<Audience>> {
        self.client.get_with("/api/audiences", params).await
    }

    pub async fn get(&self, id: Uuid) -> ClientResult<Audience> {
        self.client.get(&format!("/api/audiences/{id}")).await
    }

    pub async fn create(&self, req: &CreateAudienceRequest) -> ClientResult<Audience> {
        self.client.post("/api/audiences", req, AUDIENCES).await
    }

    pub async fn update(&self, id: Uuid, req: &UpdateAudienceRequest) -> ClientResult<Audience> {
        self.client.put(&format!("/api/audiences/{id}"), req, AUDIENCES).await
    }

    pub async fn delete(&self, id: Uuid) -> ClientResult<()> {
        self.client.delete(&format!("/api/audiences/{id}"), AUDIENCES).await
    }

    pub async fn calendrier(&self, params: &CalendrierParams) -> ClientResult<Vec<AudienceCalendrier>> {
        self.client.get_with("/api/audiences/calendrier", params).await
    }

    pub async fn a_venir(&self, jours: Option<i64>) -> ClientResult<Vec<AudienceCalendrier>> {
        self.client
            .get_with("/api/audiences/a-venir", &AVenirParams { jours })
            .await
    }

    pub async fn resultat(&self, audience_id: Uuid) -> ClientResult<ResultatAudience> {
        self.client
            .get(&format!("/api/audiences/{audience_id}/resultat"))
            .await
    }

    /// Record the outcome; a `renvoi` also schedules the next hearing.
    pub async fn create_resultat(&self, audience_id: Uuid, req: &CreateResultatRequest) -> ClientResult<ResultatResponse> {
        self.client
            .post(&format!("/api/audiences/{audience_id}/resultat"), req, AUDIENCES)
            .await
    }

    pub async fn delete_resultat(&self, resultat_id: Uuid) -> ClientResult<()> {
        self.client
            .delete(&format!("/api/resultats/{resultat_id}"), AUDIENCES)
            .await
    }
}

pub struct HonorairesApi<'a> {
    client: &'a CapcoClient,
}

impl<'a> HonorairesApi<'a> {
    pub(crate) fn new(client: &'a CapcoClient) -> Self {
        Self { client }
    }

    pub async fn list_for_affaire(&self, affaire_id: Uuid) -> ClientResult<Vec<HonorairesResponse>> {
        self.client
            .get(&format!("/api/affaires/{affaire_id}/honoraires"))
            .await
    }

    pub async fn get(&self, id: Uuid) -> ClientResult<HonorairesResponse> {
        self.client.get(&format!("/api/honoraires/{id}")).await
    }

    pub async fn create(&self, req: &CreateHonorairesRequest) -> ClientResult<Honoraires> {
        self.client.post("/api/honoraires", req, HONORAIRES).await
    }

    pub async fn update(&self, id: Uuid, req: &UpdateHonorairesRequest) -> ClientResult<HonorairesResponse> {
        self.client.put(&format!("/api/honoraires/{id}"), req, HONORAIRES).await
    }

    pub async fn delete(&self, id: Uuid) -> ClientResult<()> {
        self.client.delete(&format!("/api/honoraires/{id}"), HONORAIRES).await
    }

    pub async fn paiements(&self, id: Uuid) -> ClientResult<Vec<PaiementHonoraires>> {
        self.client.get(&format!("/api/honoraires/{id}/paiements")).await
    }

    pub async fn create_paiement(&self, id: Uuid, req: &CreatePaiementRequest) -> ClientResult<PaiementHonoraires> {
        self.client
            .post(&format!("/api/honoraires/{id}/paiements"), req, HONORAIRES)
            .await
    }

    pub async fn delete_paiement(&self, paiement_id: Uuid) -> ClientResult<()> {
        self.client
            .delete(&format!("/api/paiements-honoraires/{paiement_id}"), HONORAIRES)
            .await
    }
}

pub struct Depenses<'a> {
    client: &'a CapcoClient,
}

impl<'a> Depenses<'a> {
    pub(crate) fn new(client: &'a CapcoClient) -> Self {
        Self { client }
    }

    pub async fn list_for_affaire(&self, affaire_id: Uuid) -> ClientResult<DepensesAffaire> {
        self.client
            .get(&format!("/api/affaires/{affaire_id}/depenses"))
            .await
    }

    pub async fn create(&self, req: &CreateDepenseRequest) -> ClientResult<Depense> {
        self.client.post("/api/depenses", req, DEPENSES).await
    }

    pub async fn update(&self, id: Uuid, req: &UpdateDepenseRequest) -> ClientResult<Depense> {
        self.client.put(&format!("/api/depenses/{id}"), req, DEPENSES).await
    }

    pub async fn delete(&self, id: Uuid) -> ClientResult<()> {
        self.client.delete(&format!("/api/depenses/{id}"), DEPENSES).await
    }
}
