//! API client for the hosted appointment database.
//!
//! Speaks the PostgREST dialect: equality filters and ordering are query
//! parameters, writes are scoped with `id=eq.N`. Authentication goes through
//! the companion `/auth/v1` endpoint and yields a bearer token.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use reqwest::{header, Client};
use serde::Deserialize;

use crate::auth::SessionData;
use crate::models::{Cita, CitaFilter, CitaStatus};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Table holding the appointment records
const CITAS_TABLE: &str = "citas";

/// Data API prefix (PostgREST)
const REST_PATH: &str = "/rest/v1";

/// Auth API prefix
const AUTH_PATH: &str = "/auth/v1";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Token lifetime in seconds
    expires_in: i64,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Client for the appointment database.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client against the given project URL.
    /// No request timeout is configured; a hung call hangs its caller.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Drop the bearer token, falling back to the project API key
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert("apikey", header::HeaderValue::from_str(&self.api_key)?);
        // The API key doubles as the bearer credential until an admin signs in
        let bearer = self.token.as_deref().unwrap_or(&self.api_key);
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", bearer))?,
        );
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Query parameters for a filtered load: all columns, ascending date
    /// order, equality filters applied conjunctively when present.
    fn citas_query(filter: &CitaFilter) -> Vec<(String, String)> {
        let mut params = vec![
            ("select".to_string(), "*".to_string()),
            ("order".to_string(), "fecha.asc".to_string()),
        ];
        if let Some(ref date) = filter.date {
            params.push(("fecha".to_string(), format!("eq.{}", date)));
        }
        if let Some(status) = filter.status {
            params.push(("estado".to_string(), format!("eq.{}", status.as_param())));
        }
        params
    }

    // ===== Appointment table =====

    /// Fetch all appointments matching the filter, sorted by date ascending
    pub async fn fetch_citas(&self, filter: &CitaFilter) -> Result<Vec<Cita>> {
        let url = format!("{}{}/{}", self.base_url, REST_PATH, CITAS_TABLE);

        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .query(&Self::citas_query(filter))
            .send()
            .await
            .context("Failed to fetch appointments")?;

        let response = Self::check_response(response).await?;

        response
            .json()
            .await
            .context("Failed to parse appointments response")
    }

    /// Set the status of a single appointment
    pub async fn update_status(&self, id: i64, status: CitaStatus) -> Result<()> {
        let url = format!("{}{}/{}", self.base_url, REST_PATH, CITAS_TABLE);

        let response = self
            .client
            .patch(&url)
            .headers(self.auth_headers()?)
            .header("Prefer", "return=minimal")
            .query(&[("id", format!("eq.{}", id))])
            .json(&serde_json::json!({ "estado": status.as_param() }))
            .send()
            .await
            .context("Failed to send status update")?;

        Self::check_response(response).await?;
        Ok(())
    }

    /// Delete a single appointment
    pub async fn delete_cita(&self, id: i64) -> Result<()> {
        let url = format!("{}{}/{}", self.base_url, REST_PATH, CITAS_TABLE);

        let response = self
            .client
            .delete(&url)
            .headers(self.auth_headers()?)
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await
            .context("Failed to send delete request")?;

        Self::check_response(response).await?;
        Ok(())
    }

    // ===== Auth =====

    /// Sign in with email and password, returning session data
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionData> {
        let url = format!("{}{}/token", self.base_url, AUTH_PATH);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .context("Failed to send sign-in request")?;

        let response = Self::check_response(response).await?;

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse sign-in response")?;

        Ok(SessionData {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            user_id: token.user.id,
            email: token.user.email.unwrap_or_else(|| email.to_string()),
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }

    /// Invalidate the current session on the server.
    /// The caller clears local session state regardless of the outcome.
    pub async fn sign_out(&self) -> Result<()> {
        let url = format!("{}{}/logout", self.base_url, AUTH_PATH);

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .context("Failed to send sign-out request")?;

        Self::check_response(response).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_without_filters() {
        let params = ApiClient::citas_query(&CitaFilter::default());
        assert_eq!(
            params,
            vec![
                ("select".to_string(), "*".to_string()),
                ("order".to_string(), "fecha.asc".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_with_date_filter() {
        let filter = CitaFilter {
            date: Some("2026-03-01".to_string()),
            status: None,
        };
        let params = ApiClient::citas_query(&filter);
        assert!(params.contains(&("fecha".to_string(), "eq.2026-03-01".to_string())));
        assert!(!params.iter().any(|(k, _)| k == "estado"));
    }

    #[test]
    fn test_query_filters_are_conjunctive() {
        let filter = CitaFilter {
            date: Some("2026-03-01".to_string()),
            status: Some(CitaStatus::Confirmed),
        };
        let params = ApiClient::citas_query(&filter);
        assert!(params.contains(&("fecha".to_string(), "eq.2026-03-01".to_string())));
        assert!(params.contains(&("estado".to_string(), "eq.confirmada".to_string())));
        // Ordering is always requested, filters or not
        assert!(params.contains(&("order".to_string(), "fecha.asc".to_string())));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("https://db.example.co/", "key").unwrap();
        assert_eq!(client.base_url, "https://db.example.co");
    }
}
