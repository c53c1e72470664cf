use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;

use kevlify_backup::backup::BackupPayload;
use kevlify_otp::otp::{Account, AccountDraft, Category};

use super::types::*;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP client for the accounts/categories/backup REST API.
///
/// Authentication is session-based: the cookie store holds the session
/// cookie and replays it on every request. Establishing the session is
/// handled elsewhere.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    // ── Constructors ────────────────────────────────────────────────

    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                ClientError::new(
                    ClientErrorKind::Http,
                    format!("Failed to create HTTP client: {}", e),
                )
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    // ── URL builder ─────────────────────────────────────────────────

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── Generic execute ─────────────────────────────────────────────

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let resp = builder.send().await.map_err(ClientError::from)?;

        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await.map_err(ClientError::from)?;
            serde_json::from_str::<T>(&body).map_err(|e| {
                ClientError::new(
                    ClientErrorKind::Decode,
                    format!(
                        "Failed to parse response: {} — body: {}",
                        e,
                        body_snippet(&body)
                    ),
                )
                .with_status(status.as_u16())
            })
        } else {
            Err(Self::api_error(status.as_u16(), resp.text().await.ok()))
        }
    }

    async fn execute_no_body(&self, builder: RequestBuilder) -> Result<(), ClientError> {
        let resp = builder.send().await.map_err(ClientError::from)?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::api_error(status.as_u16(), resp.text().await.ok()))
        }
    }

    /// Build an `Api` error from a non-2xx response, preferring the
    /// server's `{ "error": "..." }` message when the body carries one.
    fn api_error(status: u16, body: Option<String>) -> ClientError {
        let body = body.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| format!("Request failed with status {}", status));
        log::warn!("API request failed: {} (status {})", message, status);
        ClientError::new(ClientErrorKind::Api, message).with_status(status)
    }

    // ── Accounts ────────────────────────────────────────────────────

    /// GET /accounts
    pub async fn list_accounts(&self) -> Result<Vec<Account>, ClientError> {
        let envelope: AccountsEnvelope = self.execute(self.client.get(self.url("/accounts"))).await?;
        Ok(envelope.accounts)
    }

    /// POST /accounts
    pub async fn create_account(&self, draft: &AccountDraft) -> Result<Account, ClientError> {
        let req = self.client.post(self.url("/accounts")).json(draft);
        let envelope: AccountEnvelope = self.execute(req).await?;
        Ok(envelope.account)
    }

    /// PUT /accounts/{id}
    pub async fn update_account(&self, id: i64, draft: &AccountDraft) -> Result<Account, ClientError> {
        let req = self
            .client
            .put(self.url(&format!("/accounts/{}", id)))
            .json(draft);
        let envelope: AccountEnvelope = self.execute(req).await?;
        Ok(envelope.account)
    }

    /// DELETE /accounts/{id}
    pub async fn delete_account(&self, id: i64) -> Result<(), ClientError> {
        self.execute_no_body(self.client.delete(self.url(&format!("/accounts/{}", id))))
            .await
    }

    // ── Categories ──────────────────────────────────────────────────

    /// GET /categories
    pub async fn list_categories(&self) -> Result<Vec<Category>, ClientError> {
        let envelope: CategoriesEnvelope =
            self.execute(self.client.get(self.url("/categories"))).await?;
        Ok(envelope.categories)
    }

    /// POST /categories
    pub async fn create_category(&self, name: &str) -> Result<Category, ClientError> {
        let req = self
            .client
            .post(self.url("/categories"))
            .json(&json!({ "name": name }));
        let envelope: CategoryEnvelope = self.execute(req).await?;
        Ok(envelope.category)
    }

    /// PUT /categories/{id}
    pub async fn update_category(&self, id: &str, name: &str) -> Result<Category, ClientError> {
        let req = self
            .client
            .put(self.url(&format!("/categories/{}", id)))
            .json(&json!({ "name": name }));
        let envelope: CategoryEnvelope = self.execute(req).await?;
        Ok(envelope.category)
    }

    /// DELETE /categories/{id}
    pub async fn delete_category(&self, id: &str) -> Result<(), ClientError> {
        self.execute_no_body(self.client.delete(self.url(&format!("/categories/{}", id))))
            .await
    }

    // ── Backup ──────────────────────────────────────────────────────

    /// GET /backup/export — full plaintext backup of the session's data.
    pub async fn export_backup(&self) -> Result<BackupPayload, ClientError> {
        self.execute(self.client.get(self.url("/backup/export"))).await
    }

    /// POST /backup/import — merge or replace server data from a backup.
    pub async fn import_backup(
        &self,
        backup: &BackupPayload,
        replace_existing: bool,
    ) -> Result<ImportOutcome, ClientError> {
        let req = self.client.post(self.url("/backup/import")).json(&ImportRequest {
            backup,
            replace_existing,
        });
        self.execute(req).await
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// First 200 characters of a response body, for error messages.
/// Truncates on character boundaries so multibyte bodies stay intact.
fn body_snippet(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}
