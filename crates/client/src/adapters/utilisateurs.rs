use shared_types::{
    AuditLog, AuditLogParams, CreateUserRequest, PaginatedResponse, UpdateUserRequest,
    UpdateUserRoleRequest, UpdateUserStatusRequest, User, UserListParams,
};

use super::UTILISATEURS;
use crate::{CapcoClient, ClientResult};

/// Staff accounts and the audit trail. Admin only.
pub struct Utilisateurs<'a> {
    client: &'a CapcoClient,
}

impl<'a> Utilisateurs<'a> {
    pub(crate) fn new(client: &'a CapcoClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &UserListParams) -> ClientResult<PaginatedResponse<User>> {
        self.client.get_with("/api/utilisateurs", params).await
    }

    pub async fn get(&self, id: i64) -> ClientResult<User> {
        self.client.get(&format!("/api/utilisateurs/{id}")).await
    }

    pub async fn create(&self, req: &CreateUserRequest) -> ClientResult<User> {
        self.client.post("/api/utilisateurs", req, UTILISATEURS).await
    }

    pub async fn update(&self, id: i64, req: &UpdateUserRequest) -> ClientResult<User> {
        self.client
            .put(&format!("/api/utilisateurs/{id}"), req, UTILISATEURS)
            .await
    }

    pub async fn update_role(&self, id: i64, role: &str) -> ClientResult<User> {
        let body = UpdateUserRoleRequest {
            role: role.to_string(),
        };
        self.client
            .patch(&format!("/api/utilisateurs/{id}/role"), &body, UTILISATEURS)
            .await
    }

    pub async fn set_actif(&self, id: i64, actif: bool) -> ClientResult<User> {
        self.client
            .patch(
                &format!("/api/utilisateurs/{id}/statut"),
                &UpdateUserStatusRequest { actif },
                UTILISATEURS,
            )
            .await
    }

    pub async fn delete(&self, id: i64) -> ClientResult<()> {
        self.client
            .delete(&format!("/api/utilisateurs/{id}"), UTILISATEURS)
            .await
    }

    pub async fn audit_logs(&self, params: &AuditLogParams) -> ClientResult<PaginatedResponse<AuditLog>> {
        self.client.get_with("/api/audit-logs", params).await
    }
}
