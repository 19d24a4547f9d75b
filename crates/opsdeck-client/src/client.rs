//! The typed REST client.

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use opsdeck_core::types::{
    Client, ClientPatch, FinanceEntry, FinanceEntryPatch, FinanceReport, FinanceSummary,
    MemberPatch, NewClient, NewFinanceEntry, NewMember, NewProject, NewTask, Overview, Project,
    ProjectPatch, Task, TaskPatch, TeamMember,
};
use opsdeck_core::ApiConfig;
use opsdeck_session::Session;

use crate::error::{Error, Result};

/// Error body shape used by the server for rejected requests.
#[derive(Debug, Default, Deserialize)]
struct ServerMessage {
    #[serde(default)]
    message: Option<String>,
}

/// Async client for the remote dashboard API.
///
/// One operation per (entity-type, verb). Every request attaches the
/// session's bearer token when one is present; create operations validate
/// their payload before anything goes on the wire. Cheap to clone — clones
/// share the connection pool and the session.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
    session: Session,
}

impl ApiClient {
    /// Create a client against the given API, authenticating via `session`.
    pub fn new(config: &ApiConfig, session: Session) -> Self {
        Self {
            http: reqwest::Client::new(),
            config: config.clone(),
            session,
        }
    }

    // ------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        self.get("/api/projects").await
    }

    pub async fn create_project(&self, payload: &NewProject) -> Result<Project> {
        payload.validate()?;
        self.post("/api/projects", payload).await
    }

    pub async fn update_project(&self, id: &str, patch: &ProjectPatch) -> Result<Project> {
        patch.validate()?;
        self.put(&format!("/api/projects/{id}"), patch).await
    }

    pub async fn delete_project(&self, id: &str) -> Result<()> {
        self.delete(&format!("/api/projects/{id}")).await
    }

    // ------------------------------------------------------------------
    // Clients
    // ------------------------------------------------------------------

    pub async fn list_clients(&self) -> Result<Vec<Client>> {
        self.get("/api/clients").await
    }

    pub async fn create_client(&self, payload: &NewClient) -> Result<Client> {
        payload.validate()?;
        self.post("/api/clients", payload).await
    }

    pub async fn update_client(&self, id: &str, patch: &ClientPatch) -> Result<Client> {
        patch.validate()?;
        self.put(&format!("/api/clients/{id}"), patch).await
    }

    pub async fn delete_client(&self, id: &str) -> Result<()> {
        self.delete(&format!("/api/clients/{id}")).await
    }

    // ------------------------------------------------------------------
    // Team
    // ------------------------------------------------------------------

    pub async fn list_team(&self) -> Result<Vec<TeamMember>> {
        self.get("/api/team").await
    }

    pub async fn create_member(&self, payload: &NewMember) -> Result<TeamMember> {
        payload.validate()?;
        self.post("/api/team", payload).await
    }

    pub async fn update_member(&self, id: &str, patch: &MemberPatch) -> Result<TeamMember> {
        patch.validate()?;
        self.put(&format!("/api/team/{id}"), patch).await
    }

    pub async fn delete_member(&self, id: &str) -> Result<()> {
        self.delete(&format!("/api/team/{id}")).await
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.get("/api/tasks").await
    }

    pub async fn create_task(&self, payload: &NewTask) -> Result<Task> {
        payload.validate()?;
        self.post("/api/tasks", payload).await
    }

    pub async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task> {
        patch.validate()?;
        self.put(&format!("/api/tasks/{id}"), patch).await
    }

    pub async fn delete_task(&self, id: &str) -> Result<()> {
        self.delete(&format!("/api/tasks/{id}")).await
    }

    // ------------------------------------------------------------------
    // Finance
    // ------------------------------------------------------------------

    /// The raw finance report: per-project totals plus the entry list.
    pub async fn finance_report(&self) -> Result<FinanceReport> {
        self.get("/api/finance").await
    }

    /// The reshaped per-project summaries ([`FinanceReport::summaries`]).
    pub async fn finance_summary(&self) -> Result<Vec<FinanceSummary>> {
        Ok(self.finance_report().await?.summaries())
    }

    pub async fn create_finance_entry(&self, payload: &NewFinanceEntry) -> Result<FinanceEntry> {
        payload.validate()?;
        self.post("/api/finance", payload).await
    }

    pub async fn update_finance_entry(
        &self,
        id: &str,
        patch: &FinanceEntryPatch,
    ) -> Result<FinanceEntry> {
        patch.validate()?;
        self.put(&format!("/api/finance/{id}"), patch).await
    }

    pub async fn delete_finance_entry(&self, id: &str) -> Result<()> {
        self.delete(&format!("/api/finance/{id}")).await
    }

    // ------------------------------------------------------------------
    // Reports
    // ------------------------------------------------------------------

    pub async fn overview(&self) -> Result<Overview> {
        self.get("/api/reports/overview").await
    }

    // ------------------------------------------------------------------
    // Request plumbing
    // ------------------------------------------------------------------

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self.http.request(method, self.config.url(path));
        if let Some(token) = self.session.bearer_token() {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .request(Method::GET, path)
            .send()
            .await
            .map_err(Error::Network)?;
        Self::decode(response).await
    }

    async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self
            .request(Method::POST, path)
            .json(body)
            .send()
            .await
            .map_err(Error::Network)?;
        Self::decode(response).await
    }

    async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self
            .request(Method::PUT, path)
            .json(body)
            .send()
            .await
            .map_err(Error::Network)?;
        Self::decode(response).await
    }

    /// DELETE succeeds on any 2xx; a 204 or empty body is the normal case
    /// and the body is never decoded.
    async fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .request(Method::DELETE, path)
            .send()
            .await
            .map_err(Error::Network)?;
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        Ok(())
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        response.json().await.map_err(Error::Decode)
    }

    /// Build the error for a non-success response: the server's `message`
    /// field when the body has one, else the raw body text, else the
    /// status' canonical reason.
    async fn rejection(response: Response) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ServerMessage>(&body)
            .ok()
            .and_then(|m| m.message)
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| canonical_reason(status));
        log::debug!("Request rejected: HTTP {status}: {message}");
        Error::Status { status, message }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url())
            .finish()
    }
}

fn canonical_reason(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_reason_known_status() {
        assert_eq!(canonical_reason(StatusCode::NOT_FOUND), "Not Found");
    }

    #[test]
    fn test_server_message_decodes_partial_body() {
        let parsed: ServerMessage = serde_json::from_str(r#"{"message": "nope"}"#).unwrap();
        assert_eq!(parsed.message.as_deref(), Some("nope"));

        let parsed: ServerMessage = serde_json::from_str("{}").unwrap();
        assert!(parsed.message.is_none());
    }

    #[test]
    fn test_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApiClient>();
    }
}
