use chrono::NaiveDate;
use shared_types::{
    AssignLocataireRequest, CreateEncaissementRequest, CreateImmeubleRequest,
    CreateLocataireRequest, CreateLotRequest, Encaissement, EncaissementListParams, Immeuble,
    ImmeubleListParams, ImpayeLoyer, ImpayesParams, Locataire, LocataireListParams, Lot,
    LotListParams, OccupationStatistiques, PaginatedResponse, SyntheseEncaissements,
    SyntheseParams, UpdateImmeubleRequest, UpdateLocataireRequest, UpdateLotRequest,
};
use uuid::Uuid;

use super::{ENCAISSEMENTS, IMMEUBLES, LOCATAIRES, LOTS};
use crate::{CapcoClient, ClientResult};

pub struct Immeubles<'a> {
    client: &'a CapcoClient,
}

impl<'a> Immeubles<'a> {
    pub(crate) fn new(client: &'a CapcoClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &ImmeubleListParams) -> ClientResult<PaginatedResponse<Immeuble>> {
        self.client.get_with("/api/immeubles", params).await
    }

    pub async fn get(&self, id: Uuid) -> ClientResult<Immeuble> {
        self.client.get(&format!("/api/immeubles/{id}")).await
    }

    pub async fn create(&self, req: &CreateImmeubleRequest) -> ClientResult<Immeuble> {
        self.client.post("/api/immeubles", req, IMMEUBLES).await
    }

    pub async fn update(&self, id: Uuid, req: &UpdateImmeubleRequest) -> ClientResult<Immeuble> {
        self.client.put(&format!("/api/immeubles/{id}"), req, IMMEUBLES).await
    }

    /// Refused by the server while the building still has lots.
    pub async fn delete(&self, id: Uuid) -> ClientResult<()> {
        self.client.delete(&format!("/api/immeubles/{id}"), IMMEUBLES).await
    }

    pub async fn lots(&self, id: Uuid) -> ClientResult<Vec<Lot>> {
        self.client.get(&format!("/api/immeubles/{id}/lots")).await
    }

    pub async fn statistiques(&self, id: Uuid) -> ClientResult<OccupationStatistiques> {
        self.client
            .get(&format!("/api/immeubles/{id}/statistiques"))
            .await
    }
}

pub struct Lots<'a> {
    client: &'a CapcoClient,
}

impl<'a> Lots<'a> {
    pub(crate) fn new(client: &'a CapcoClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &LotListParams) -> ClientResult<PaginatedResponse<Lot>> {
        self.client.get_with("/api/lots", params).await
    }

    pub async fn get(&self, id: Uuid) -> ClientResult<Lot> {
        self.client.get(&format!("/api/lots/{id}")).await
    }

    pub async fn create(&self, req: &CreateLotRequest) -> ClientResult<Lot> {
        self.client.post("/api/lots", req, LOTS).await
    }

    pub async fn update(&self, id: Uuid, req: &UpdateLotRequest) -> ClientResult<Lot> {
        self.client.put(&format!("/api/lots/{id}"), req, LOTS).await
    }

    pub async fn delete(&self, id: Uuid) -> ClientResult<()> {
        self.client.delete(&format!("/api/lots/{id}"), LOTS).await
    }

    pub async fn statistiques(&self) -> ClientResult<OccupationStatistiques> {
        self.client.get("/api/lots/statistiques").await
    }

    /// Put a tenant in the lot, or free it with `None`.
    pub async fn assign_locataire(
        &self,
        id: Uuid,
        locataire_id: Option<Uuid>,
        date_entree: Option<NaiveDate>,
    ) -> ClientResult<Lot> {
        let body = AssignLocataireRequest {
            locataire_id,
            date_entree,
        };
        self.client
            .patch(&format!("/api/lots/{id}/locataire"), &body, LOTS)
            .await
    }

    pub async fn encaissements(&self, id: Uuid) -> ClientResult<Vec<Encaissement>> {
        self.client.get(&format!("/api/lots/{id}/encaissements")).await
    }
}

pub struct Locataires<'a> {
    client: &'a CapcoClient,
}

impl<'a> Locataires<'a> {
    pub(crate) fn new(client: &'a CapcoClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &LocataireListParams) -> ClientResult<PaginatedResponse<Locataire>> {
        self.client.get_with("/api/locataires", params).await
    }

    pub async fn get(&self, id: Uuid) -> ClientResult<Locataire> {
        self.client.get(&format!("/api/locataires/{id}")).await
    }

    pub async fn create(&self, req: &CreateLocataireRequest) -> ClientResult<Locataire> {
        self.client.post("/api/locataires", req, LOCATAIRES).await
    }

    pub async fn update(&self, id: Uuid, req: &UpdateLocataireRequest) -> ClientResult<Locataire> {
        self.client
            .put(&format!("/api/locataires/{id}"), req, LOCATAIRES)
            .await
    }

    pub async fn delete(&self, id: Uuid) -> ClientResult<()> {
        self.client
            .delete(&format!("/api/locataires/{id}"), LOCATAIRES)
            .await
    }
}

/// Rent receipts. Commission and net amount are computed server side.
pub struct Encaissements<'a> {
    client: &'a CapcoClient,
}

impl<'a> Encaissements<'a> {
    pub(crate) fn new(client: &'a CapcoClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &EncaissementListParams) -> ClientResult<PaginatedResponse<Encaissement>> {
        self.client.get_with("/api/encaissements", params).await
    }

    pub async fn get(&self, id: Uuid) -> ClientResult<Encaissement> {
        self.client.get(&format!("/api/encaissements/{id}")).await
    }

    pub async fn create(&self, req: &CreateEncaissementRequest) -> ClientResult<Encaissement> {
        self.client.post("/api/encaissements", req, ENCAISSEMENTS).await
    }

    pub async fn delete(&self, id: Uuid) -> ClientResult<()> {
        self.client
            .delete(&format!("/api/encaissements/{id}"), ENCAISSEMENTS)
            .await
    }

    /// Occupied lots whose rent for `periode` (`YYYY-MM`) is not fully paid.
    pub async fn impayes(&self, periode: &str, immeuble_id: Option<Uuid>) -> ClientResult<Vec<ImpayeLoyer>> {
        let params = ImpayesParams {
            periode: periode.to_string(),
            immeuble_id,
        };
        self.client.get_with("/api/encaissements/impayes", &params).await
    }

    pub async fn synthese(&self, params: &SyntheseParams) -> ClientResult<SyntheseEncaissements> {
        self.client.get_with("/api/encaissements/synthese", params).await
    }
}
