//! Creem API client implementation.

use std::time::Duration;

use reqwest::Client;

use super::types::{
    CheckoutSessionResponse, CreateCheckoutRequest, PortalRequest, PortalResponse,
};

/// Error type for Creem operations.
#[derive(Debug, thiserror::Error)]
pub enum CreemError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned an error status.
    #[error("Creem API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        message: String,
    },
}

/// Creem API client for checkout sessions and customer-portal links.
#[derive(Debug, Clone)]
pub struct CreemClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl CreemClient {
    /// Create a new Creem client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Create a hosted checkout session.
    ///
    /// `metadata` is echoed back verbatim on the `checkout.completed`
    /// webhook; the caller must embed `user_id` (and `credits` for credit
    /// products) there so the reconciler can correlate the purchase.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx response.
    pub async fn create_checkout(
        &self,
        request: &CreateCheckoutRequest,
    ) -> Result<CheckoutSessionResponse, CreemError> {
        let response = self
            .client
            .post(format!("{}/v1/checkouts", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Get a hosted customer-portal link for an existing provider customer.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx response.
    pub async fn customer_portal(&self, customer_id: &str) -> Result<PortalResponse, CreemError> {
        let response = self
            .client
            .post(format!("{}/v1/customers/billing", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&PortalRequest {
                customer_id: customer_id.to_string(),
            })
            .send()
            .await?;

        Self::handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, CreemError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CreemError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}
