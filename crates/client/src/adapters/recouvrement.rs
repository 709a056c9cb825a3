use shared_types::{
    ActionRecouvrement, CreateActionRequest, CreateDossierRequest, CreatePaiementRequest,
    DossierListParams, DossierResponse, PaginatedResponse, PaiementRecouvrement,
    RecouvrementStatistiques, UpdateDossierRequest, UpdateStatutRequest,
};
use uuid::Uuid;

use super::RECOUVREMENT;
use crate::{CapcoClient, ClientResult};

/// Debt-collection files with their actions and payments.
pub struct Recouvrement<'a> {
    client: &'a CapcoClient,
}

impl<'a> Recouvrement<'a> {
    pub(crate) fn new(client: &'a CapcoClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &DossierListParams) -> ClientResult<PaginatedResponse<DossierResponse>> {
        self.client.get_with("/api/dossiers-recouvrement", params).await
    }

    pub async fn get(&self, id: Uuid) -> ClientResult<DossierResponse> {
        self.client.get(&format!("/api/dossiers-recouvrement/{id}")).await
    }

    pub async fn create(&self, req: &CreateDossierRequest) -> ClientResult<DossierResponse> {
        self.client.post("/api/dossiers-recouvrement", req, RECOUVREMENT).await
    }

    pub async fn update(&self, id: Uuid, req: &UpdateDossierRequest) -> ClientResult<DossierResponse> {
        self.client
            .put(&format!("/api/dossiers-recouvrement/{id}"), req, RECOUVREMENT)
            .await
    }

    pub async fn update_statut(&self, id: Uuid, statut: &str) -> ClientResult<DossierResponse> {
        let body = UpdateStatutRequest {
            statut: statut.to_string(),
        };
        self.client
            .patch(&format!("/api/dossiers-recouvrement/{id}/statut"), &body, RECOUVREMENT)
            .await
    }

    pub async fn delete(&self, id: Uuid) -> ClientResult<()> {
        self.client
            .delete(&format!("/api/dossiers-recouvrement/{id}"), RECOUVREMENT)
            .await
    }

    pub async fn statistiques(&self) -> ClientResult<RecouvrementStatistiques> {
        self.client.get("/api/dossiers-recouvrement/statistiques").await
    }

    pub async fn actions(&self, id: Uuid) -> ClientResult<Vec<ActionRecouvrement>> {
        self.client
            .get(&format!("/api/dossiers-recouvrement/{id}/actions"))
            .await
    }

    pub async fn create_action(&self, id: Uuid, req: &CreateActionRequest) -> ClientResult<ActionRecouvrement> {
        self.client
            .post(&format!("/api/dossiers-recouvrement/{id}/actions"), req, RECOUVREMENT)
            .await
    }

    pub async fn delete_action(&self, action_id: Uuid) -> ClientResult<()> {
        self.client
            .delete(&format!("/api/actions-recouvrement/{action_id}"), RECOUVREMENT)
            .await
    }

    pub async fn paiements(&self, id: Uuid) -> ClientResult<Vec<PaiementRecouvrement>> {
        self.client
            .get(&format!("/api/dossiers-recouvrement/{id}/paiements"))
            .await
    }

    /// The dossier status follows the balance, hence the dossier prefix.
    pub async fn create_paiement(&self, id: Uuid, req: &CreatePaiementRequest) -> ClientResult<PaiementRecouvrement> {
        self.client
            .post(&format!("/api/dossiers-recouvrement/{id}/paiements"), req, RECOUVREMENT)
            .await
    }

    pub async fn delete_paiement(&self, paiement_id: Uuid) -> ClientResult<()> {
        self.client
            .delete(&format!("/api/paiements-recouvrement/{paiement_id}"), RECOUVREMENT)
            .await
    }
}
