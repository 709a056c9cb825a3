//! Typed HTTP client for the CAPCO API.
//!
//! [`CapcoClient`] holds the base URL, the token pair and a short-lived GET
//! cache. Each entity has an adapter (`client.affaires()`, `client.lots()`,
//! ...) whose mutations clear the cached resources they affect, so a screen
//! that re-reads after a write never shows stale figures.

mod cache;

pub mod adapters;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::header::{self, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{
    AppError, AuthResponse, ChangePasswordRequest, ImportReport, LoginRequest, RefreshRequest,
    SearchParams, SearchResponse, TableauDeBord, User,
};
use uuid::Uuid;

pub use adapters::*;
pub use cache::ResponseCache;

pub type ClientResult<T> = Result<T, AppError>;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

/// Every mutation is audited server side.
const AUDIT: &str = "/api/audit-logs";

#[derive(Debug, Clone)]
struct Tokens {
    access: String,
    refresh: String,
}

struct Inner {
    base_url: String,
    http: reqwest::Client,
    tokens: RwLock<Option<Tokens>>,
    cache: ResponseCache,
}

/// Cheap to clone; clones share tokens and cache.
#[derive(Clone)]
pub struct CapcoClient {
    inner: Arc<Inner>,
}

fn transport_error(e: reqwest::Error) -> AppError {
    AppError::internal(format!("Request failed: {e}"))
}

/// Pass successful responses through, decode everything else as `AppError`.
async fn checked(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::from_response(status.as_u16(), &body))
}

fn decode<T: DeserializeOwned>(key: &str, body: &str) -> ClientResult<T> {
    serde_json::from_str(body)
        .map_err(|e| AppError::internal(format!("Unexpected response from {key}: {e}")))
}

/// Cache key of a built request: path plus query string.
fn cache_key(url: &reqwest::Url) -> String {
    match url.query() {
        Some(q) if !q.is_empty() => format!("{}?{}", url.path(), q),
        _ => url.path().to_string(),
    }
}

/// Month range for a building statement, `YYYY-MM` on both ends.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Periode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub du: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub au: Option<String>,
}

#[derive(Serialize)]
struct DryRun {
    dry_run: bool,
}

impl CapcoClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_cache_ttl(base_url, DEFAULT_CACHE_TTL)
    }

    /// A zero `ttl` turns the cache off.
    pub fn with_cache_ttl(base_url: impl Into<String>, ttl: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            inner: Arc::new(Inner {
                base_url,
                http: reqwest::Client::new(),
                tokens: RwLock::new(None),
                cache: ResponseCache::new(ttl),
            }),
        }
    }

    /// `CAPCO_API_URL` (default `http://localhost:8080`) and
    /// `CAPCO_CACHE_TTL_SECS` (default 30).
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("CAPCO_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let ttl = std::env::var("CAPCO_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CACHE_TTL);
        Self::with_cache_ttl(base_url, ttl)
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.inner.cache
    }

    // ── Session ─────────────────────────────────────────────────────

    /// Restore a session saved by the caller (e.g. from local storage).
    pub fn set_tokens(&self, access: impl Into<String>, refresh: impl Into<String>) {
        *self.inner.tokens.write().unwrap_or_else(|e| e.into_inner()) = Some(Tokens {
            access: access.into(),
            refresh: refresh.into(),
        });
    }

    pub fn clear_tokens(&self) {
        *self.inner.tokens.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn access_token(&self) -> Option<String> {
        self.tokens().map(|t| t.access)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.tokens().map(|t| t.refresh)
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens().is_some()
    }

    fn tokens(&self) -> Option<Tokens> {
        self.inner
            .tokens
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn store(&self, auth: &AuthResponse) {
        self.set_tokens(auth.access_token.clone(), auth.refresh_token.clone());
    }

    /// Log in and keep the token pair for later calls. Drops cached data
    /// read under a previous identity.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<AuthResponse> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .inner
            .http
            .post(self.url("/api/auth/login"))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let auth: AuthResponse = checked(response)
            .await?
            .json()
            .await
            .map_err(transport_error)?;
        self.store(&auth);
        self.inner.cache.clear();
        tracing::debug!(user_id = auth.user.id, "logged in");
        Ok(auth)
    }

    /// Rotate the token pair. A rejected refresh token ends the session.
    pub async fn refresh(&self) -> ClientResult<AuthResponse> {
        let refresh_token = self
            .refresh_token()
            .ok_or_else(|| AppError::unauthorized("Not logged in"))?;
        let response = self
            .inner
            .http
            .post(self.url("/api/auth/refresh"))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(transport_error)?;
        match checked(response).await {
            Ok(response) => {
                let auth: AuthResponse = response.json().await.map_err(transport_error)?;
                self.store(&auth);
                Ok(auth)
            }
            Err(err) => {
                self.clear_tokens();
                Err(err)
            }
        }
    }

    /// Revoke the server-side refresh tokens and forget the session locally.
    pub async fn logout(&self) -> ClientResult<()> {
        let result = self.send(self.request(Method::POST, "/api/auth/logout")).await;
        self.clear_tokens();
        self.inner.cache.clear();
        result.map(|_| ())
    }

    pub async fn me(&self) -> ClientResult<User> {
        self.get("/api/auth/me").await
    }

    pub async fn change_password(&self, req: &ChangePasswordRequest) -> ClientResult<()> {
        self.send(self.request(Method::PUT, "/api/auth/password").json(req))
            .await
            .map(|_| ())
    }

    // ── Transverse ──────────────────────────────────────────────────

    pub async fn tableau_de_bord(&self) -> ClientResult<TableauDeBord> {
        self.get("/api/tableau-de-bord").await
    }

    pub async fn recherche(&self, params: &SearchParams) -> ClientResult<SearchResponse> {
        self.get_with("/api/recherche", params).await
    }

    /// CSV export of one entity family (`affaires`, `lots`, `factures`, ...).
    pub async fn export_csv(&self, entite: &str) -> ClientResult<String> {
        let response = self
            .send(self.request(Method::GET, &format!("/api/exports/{entite}")))
            .await?;
        response.text().await.map_err(transport_error)
    }

    /// Import CSV rows. Written rows clear the cache of the imported family.
    pub async fn import_csv(&self, entite: &str, csv: String, dry_run: bool) -> ClientResult<ImportReport> {
        let builder = self
            .request(Method::POST, &format!("/api/imports/{entite}"))
            .query(&DryRun { dry_run })
            .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
            .body(csv);
        let report: ImportReport = self.send(builder).await?.json().await.map_err(transport_error)?;
        if report.lignes_importees > 0 {
            self.invalidate(import_invalidates(entite));
        }
        Ok(report)
    }

    pub async fn releve_encaissements_pdf(&self, immeuble_id: Uuid, periode: &Periode) -> ClientResult<Vec<u8>> {
        let builder = self
            .request(Method::GET, &format!("/api/rapports/immeubles/{immeuble_id}/encaissements"))
            .query(periode);
        self.pdf(builder).await
    }

    pub async fn releve_recouvrement_pdf(&self, dossier_id: Uuid) -> ClientResult<Vec<u8>> {
        self.pdf(self.request(
            Method::GET,
            &format!("/api/rapports/dossiers-recouvrement/{dossier_id}/releve"),
        ))
        .await
    }

    pub async fn facture_pdf(&self, facture_id: Uuid) -> ClientResult<Vec<u8>> {
        self.pdf(self.request(Method::GET, &format!("/api/rapports/factures/{facture_id}")))
            .await
    }

    pub async fn honoraires_pdf(&self, affaire_id: Uuid) -> ClientResult<Vec<u8>> {
        self.pdf(self.request(
            Method::GET,
            &format!("/api/rapports/affaires/{affaire_id}/honoraires"),
        ))
        .await
    }

    async fn pdf(&self, builder: RequestBuilder) -> ClientResult<Vec<u8>> {
        let bytes = self.send(builder).await?.bytes().await.map_err(transport_error)?;
        Ok(bytes.to_vec())
    }

    // ── Plumbing ────────────────────────────────────────────────────

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.inner.http.request(method, self.url(path));
        match self.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send, and on a 401 refresh the session once and replay the request.
    async fn send(&self, builder: RequestBuilder) -> ClientResult<Response> {
        let request = builder.build().map_err(transport_error)?;
        let is_auth_call = request.url().path().contains("/api/auth/");
        let replay = request.try_clone();

        let response = self.inner.http.execute(request).await.map_err(transport_error)?;
        if response.status() != StatusCode::UNAUTHORIZED || is_auth_call || self.refresh_token().is_none() {
            return checked(response).await;
        }
        let Some(mut replay) = replay else {
            return checked(response).await;
        };
        if self.refresh().await.is_err() {
            return checked(response).await;
        }
        if let Some(token) = self.access_token() {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| AppError::internal(format!("Invalid token: {e}")))?;
            replay.headers_mut().insert(header::AUTHORIZATION, value);
        }
        tracing::debug!(url = %replay.url(), "replaying request after token refresh");
        let response = self.inner.http.execute(replay).await.map_err(transport_error)?;
        checked(response).await
    }

    async fn fetch_cached<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let request = builder.build().map_err(transport_error)?;
        let key = cache_key(request.url());
        if let Some(body) = self.inner.cache.get(&key) {
            tracing::trace!(key = %key, "cache hit");
            return decode(&key, &body);
        }

        let response = self.send(RequestBuilder::from_parts(self.inner.http.clone(), request)).await?;
        let body = response.text().await.map_err(transport_error)?;
        let value = decode(&key, &body)?;
        self.inner.cache.put(key, body);
        Ok(value)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.fetch_cached(self.request(Method::GET, path)).await
    }

    pub(crate) async fn get_with<T, Q>(&self, path: &str, query: &Q) -> ClientResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.fetch_cached(self.request(Method::GET, path).query(query)).await
    }

    fn invalidate(&self, prefixes: &[&str]) {
        let removed = self.inner.cache.invalidate(prefixes) + self.inner.cache.invalidate(&[AUDIT]);
        tracing::trace!(?prefixes, removed, "cache invalidated");
    }

    async fn mutate<T: DeserializeOwned>(&self, builder: RequestBuilder, invalidates: &[&str]) -> ClientResult<T> {
        let response = self.send(builder).await?;
        self.invalidate(invalidates);
        response.json().await.map_err(transport_error)
    }

    pub(crate) async fn post<B, T>(&self, path: &str, body: &B, invalidates: &[&str]) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.mutate(self.request(Method::POST, path).json(body), invalidates).await
    }

    /// POST without a body, for state transitions such as `emettre`.
    pub(crate) async fn post_action<T: DeserializeOwned>(&self, path: &str, invalidates: &[&str]) -> ClientResult<T> {
        self.mutate(self.request(Method::POST, path), invalidates).await
    }

    pub(crate) async fn put<B, T>(&self, path: &str, body: &B, invalidates: &[&str]) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.mutate(self.request(Method::PUT, path).json(body), invalidates).await
    }

    pub(crate) async fn patch<B, T>(&self, path: &str, body: &B, invalidates: &[&str]) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.mutate(self.request(Method::PATCH, path).json(body), invalidates).await
    }

    pub(crate) async fn delete(&self, path: &str, invalidates: &[&str]) -> ClientResult<()> {
        self.send(self.request(Method::DELETE, path)).await?;
        self.invalidate(invalidates);
        Ok(())
    }

    // ── Adapters ────────────────────────────────────────────────────

    pub fn affaires(&self) -> Affaires<'_> {
        Affaires::new(self)
    }

    pub fn audiences(&self) -> Audiences<'_> {
        Audiences::new(self)
    }

    pub fn honoraires(&self) -> HonorairesApi<'_> {
        HonorairesApi::new(self)
    }

    pub fn depenses(&self) -> Depenses<'_> {
        Depenses::new(self)
    }

    pub fn recouvrement(&self) -> Recouvrement<'_> {
        Recouvrement::new(self)
    }

    pub fn immeubles(&self) -> Immeubles<'_> {
        Immeubles::new(self)
    }

    pub fn lots(&self) -> Lots<'_> {
        Lots::new(self)
    }

    pub fn locataires(&self) -> Locataires<'_> {
        Locataires::new(self)
    }

    pub fn encaissements(&self) -> Encaissements<'_> {
        Encaissements::new(self)
    }

    pub fn clients_conseil(&self) -> ClientsConseil<'_> {
        ClientsConseil::new(self)
    }

    pub fn factures(&self) -> Factures<'_> {
        Factures::new(self)
    }

    pub fn utilisateurs(&self) -> Utilisateurs<'_> {
        Utilisateurs::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_keeps_query() {
        let url = reqwest::Url::parse("http://h/api/lots?page=2&statut=libre").unwrap();
        assert_eq!(cache_key(&url), "/api/lots?page=2&statut=libre");
        let url = reqwest::Url::parse("http://h/api/lots").unwrap();
        assert_eq!(cache_key(&url), "/api/lots");
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let client = CapcoClient::new("http://capco.local/");
        assert_eq!(client.base_url(), "http://capco.local");
        assert!(!client.is_authenticated());
    }

    #[test]
    fn tokens_are_shared_between_clones() {
        let client = CapcoClient::new(DEFAULT_BASE_URL);
        let clone = client.clone();
        client.set_tokens("a", "r");
        assert_eq!(clone.access_token().as_deref(), Some("a"));
        clone.clear_tokens();
        assert!(!client.is_authenticated());
    }
}
