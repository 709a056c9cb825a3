use shared_types::{
    ClientConseil, ClientConseilListParams, ConseilStatistiques, CreateClientConseilRequest,
    CreateFactureRequest, CreatePaiementRequest, FactureListParams, FactureResponse,
    PaginatedResponse, PaiementConseil, UpdateClientConseilRequest, UpdateFactureRequest,
};
use uuid::Uuid;

use super::{CLIENTS, FACTURES};
use crate::{CapcoClient, ClientResult};

pub struct ClientsConseil<'a> {
    client: &'a CapcoClient,
}

impl<'a> ClientsConseil<'a> {
    pub(crate) fn new(client: &'a CapcoClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &ClientConseilListParams) -> ClientResult<PaginatedResponse<ClientConseil>> {
        self.client.get_with("/api/clients-conseil", params).await
    }

    pub async fn get(&self, id: Uuid) -> ClientResult<ClientConseil> {
        self.client.get(&format!("/api/clients-conseil/{id}")).await
    }

    pub async fn create(&self, req: &CreateClientConseilRequest) -> ClientResult<ClientConseil> {
        self.client.post("/api/clients-conseil", req, CLIENTS).await
    }

    pub async fn update(&self, id: Uuid, req: &UpdateClientConseilRequest) -> ClientResult<ClientConseil> {
        self.client
            .put(&format!("/api/clients-conseil/{id}"), req, CLIENTS)
            .await
    }

    pub async fn delete(&self, id: Uuid) -> ClientResult<()> {
        self.client
            .delete(&format!("/api/clients-conseil/{id}"), CLIENTS)
            .await
    }

    pub async fn statistiques(&self) -> ClientResult<ConseilStatistiques> {
        self.client.get("/api/clients-conseil/statistiques").await
    }

    pub async fn factures(&self, id: Uuid) -> ClientResult<Vec<FactureResponse>> {
        self.client
            .get(&format!("/api/clients-conseil/{id}/factures"))
            .await
    }
}

/// Advisory invoices. Only drafts may be edited; `emettre` and `annuler`
/// move them along.
pub struct Factures<'a> {
    client: &'a CapcoClient,
}

impl<'a> Factures<'a> {
    pub(crate) fn new(client: &'a CapcoClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &FactureListParams) -> ClientResult<PaginatedResponse<FactureResponse>> {
        self.client.get_with("/api/factures", params).await
    }

    pub async fn get(&self, id: Uuid) -> ClientResult<FactureResponse> {
        self.client.get(&format!("/api/factures/{id}")).await
    }

    pub async fn create(&self, req: &CreateFactureRequest) -> ClientResult<FactureResponse> {
        self.client.post("/api/factures", req, FACTURES).await
    }

    pub async fn update(&self, id: Uuid, req: &UpdateFactureRequest) -> ClientResult<FactureResponse> {
        self.client.put(&format!("/api/factures/{id}"), req, FACTURES).await
    }

    pub async fn delete(&self, id: Uuid) -> ClientResult<()> {
        self.client.delete(&format!("/api/factures/{id}"), FACTURES).await
    }

    pub async fn emettre(&self, id: Uuid) -> ClientResult<FactureResponse> {
        self.client
            .post_action(&format!("/api/factures/{id}/emettre"), FACTURES)
            .await
    }

    pub async fn annuler(&self, id: Uuid) -> ClientResult<FactureResponse> {
        self.client
            .post_action(&format!("/api/factures/{id}/annuler"), FACTURES)
            .await
    }

    pub async fn paiements(&self, id: Uuid) -> ClientResult<Vec<PaiementConseil>> {
        self.client.get(&format!("/api/factures/{id}/paiements")).await
    }

    pub async fn create_paiement(&self, id: Uuid, req: &CreatePaiementRequest) -> ClientResult<PaiementConseil> {
        self.client
            .post(&format!("/api/factures/{id}/paiements"), req, FACTURES)
            .await
    }

    pub async fn delete_paiement(&self, paiement_id: Uuid) -> ClientResult<()> {
        self.client
            .delete(&format!("/api/paiements-conseil/{paiement_id}"), FACTURES)
            .await
    }
}
