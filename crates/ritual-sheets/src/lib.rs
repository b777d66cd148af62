pub mod auth;

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub use auth::ServiceAccountKey;
use auth::{Token, fetch_token};

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// A cached token stops being trusted this long before it expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("bad service account key: {0}")]
    Key(String),
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("sheets api error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("not a Google Sheets link")]
    BadLink,
    #[error("jwt: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Append-only Google Sheets client authenticated as a service account.
/// Users share their spreadsheet with the account's email; the bot mirrors
/// outcome rows into it.
pub struct SheetsClient {
    http: Client,
    key: ServiceAccountKey,
    token: RwLock<Option<Token>>,
}

impl SheetsClient {
    pub fn new(key: ServiceAccountKey) -> Result<Self, SheetsError> {
        let http = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            key,
            token: RwLock::new(None),
        })
    }

    /// The address users must share their spreadsheet with.
    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Append one row after the existing data on the first sheet.
    pub async fn append_row(&self, sheet_ref: &str, columns: &[String]) -> Result<(), SheetsError> {
        let id = spreadsheet_id(sheet_ref).ok_or(SheetsError::BadLink)?;
        let bearer = self.bearer().await?;
        let url = format!("{}/{}/values/A1:append?valueInputOption=USER_ENTERED", API_BASE, id);

        let resp = self
            .http
            .post(url)
            .bearer_auth(bearer)
            .json(&serde_json::json!({ "values": [columns] }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Api { status, body });
        }
        Ok(())
    }

    /// Check whether the service account can reach the spreadsheet. Runs
    /// right after a user shares a link; the answer goes back to the user,
    /// so failures are logged rather than propagated.
    pub async fn check_access(&self, sheet_ref: &str) -> bool {
        let Some(id) = spreadsheet_id(sheet_ref) else {
            return false;
        };
        let bearer = match self.bearer().await {
            Ok(b) => b,
            Err(e) => {
                warn!("Sheets token refresh failed: {}", e);
                return false;
            }
        };

        let url = format!("{}/{}?fields=spreadsheetId", API_BASE, id);
        match self.http.get(url).bearer_auth(bearer).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                debug!("Sheets access check for {} returned {}", id, resp.status());
                false
            }
            Err(e) => {
                warn!("Sheets access check failed: {}", e);
                false
            }
        }
    }

    async fn bearer(&self) -> Result<String, SheetsError> {
        {
            let guard = self.token.read().await;
            if let Some(token) = guard.as_ref() {
                if token.expires_at - chrono::Duration::seconds(EXPIRY_MARGIN_SECS) > Utc::now() {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let fresh = fetch_token(&self.http, &self.key).await?;
        let access = fresh.access_token.clone();
        *self.token.write().await = Some(fresh);
        Ok(access)
    }
}

/// Extracts the spreadsheet id from a shared Google Sheets URL. A bare id
/// is accepted as-is.
pub fn spreadsheet_id(sheet_ref: &str) -> Option<&str> {
    let sheet_ref = sheet_ref.trim();
    let rest = match sheet_ref.split_once("/spreadsheets/d/") {
        Some((_, rest)) => rest,
        None if !sheet_ref.is_empty() && !sheet_ref.contains('/') => return Some(sheet_ref),
        None => return None,
    };

    match rest.split(['/', '?', '#']).next() {
        Some(id) if !id.is_empty() => Some(id),
        _ => None,
    }
}
