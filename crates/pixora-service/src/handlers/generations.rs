//! Generation handlers: the metering gateway around the paid upstream call.
//!
//! The protocol is pay-before-work, refund-on-failure:
//!
//! 1. debit the configured cost - an insufficient balance ends the request
//!    before any upstream traffic;
//! 2. optionally enhance the prompt (best effort, failure falls back to the
//!    original);
//! 3. call the upstream under its bounded timeout and validate the result;
//! 4. on success, record a succeeded generation; on any definitive failure,
//!    credit the cost back and record a failed generation.
//!
//! A refund that cannot be committed is escalated separately from a normal
//! generation failure: the response must never claim credits were returned
//! unless the credit actually committed.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use pixora_core::{
    AspectRatio, Customer, GenerationId, GenerationRecord, GenerationStatus, ImageModel, Style,
};
use pixora_store::{DebitOutcome, Store};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Maximum accepted prompt length in characters.
const MAX_PROMPT_CHARS: usize = 2000;

/// Generation request.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// The prompt (1..=2000 characters after trimming).
    pub prompt: String,
    /// Output aspect ratio.
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    /// Style direction for enhancement.
    #[serde(default)]
    pub style: Style,
    /// Upstream model.
    #[serde(default)]
    pub model: ImageModel,
    /// Whether to run prompt enhancement (default: true).
    #[serde(default = "default_enhance")]
    pub enhance: bool,
}

fn default_enhance() -> bool {
    true
}

/// Generation response.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    /// URL of the generated image.
    pub url: String,
    /// The enhanced prompt, when enhancement ran and succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_prompt: Option<String>,
    /// Whether the prompt sent upstream was enhanced.
    pub was_enhanced: bool,
}

/// Generate an image, metered against the credit ledger.
pub async fn create_generation(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let prompt = body.prompt.trim();
    if prompt.is_empty() {
        return Err(ApiError::BadRequest("Prompt must not be empty".into()));
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Prompt too long (max {MAX_PROMPT_CHARS} characters)"
        )));
    }

    let generator = state
        .generator
        .as_ref()
        .ok_or_else(|| ApiError::ExternalService("Image generation not configured".into()))?;

    let customer = resolve_customer(&state, &auth)?;
    let cost = state.config.pricing.credits_per_generation;

    // Pay before work: a conditional debit at the storage layer, so two
    // concurrent requests can never both spend the same credits.
    match state.store.debit_credits(
        &customer.id,
        cost,
        &format!("Image generation ({})", body.model),
    )? {
        DebitOutcome::Applied { new_balance, .. } => {
            tracing::debug!(
                customer_id = %customer.id,
                cost = %cost,
                new_balance = %new_balance,
                "Debited generation cost"
            );
        }
        DebitOutcome::InsufficientCredits { balance, required } => {
            return Err(ApiError::InsufficientCredits { balance, required });
        }
    }

    // Best-effort enhancement: failure never blocks the generation.
    let mut final_prompt = prompt.to_string();
    let mut was_enhanced = false;
    if body.enhance {
        match generator.enhance_prompt(prompt, body.style).await {
            Ok(enhanced) => {
                tracing::debug!(original = %prompt, enhanced = %enhanced, "Prompt enhanced");
                final_prompt = enhanced;
                was_enhanced = true;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Prompt enhancement failed, using original prompt");
            }
        }
    }

    let size = body.aspect_ratio.size();
    match generator
        .generate_image(body.model, &final_prompt, size)
        .await
    {
        Ok(url) => {
            let record = build_record(
                &customer,
                &body,
                prompt,
                was_enhanced.then(|| final_prompt.clone()),
                Some(url.clone()),
                GenerationStatus::Succeeded,
                cost,
            );
            state.store.put_generation(&record)?;

            tracing::info!(
                customer_id = %customer.id,
                generation_id = %record.id,
                model = %body.model,
                was_enhanced = %was_enhanced,
                "Generation succeeded"
            );

            Ok(Json(GenerateResponse {
                url,
                enhanced_prompt: was_enhanced.then_some(final_prompt),
                was_enhanced,
            }))
        }
        Err(upstream_err) => {
            tracing::warn!(
                customer_id = %customer.id,
                error = %upstream_err,
                "Upstream generation failed, refunding"
            );

            match state.store.credit_credits(
                &customer.id,
                cost,
                "Refund: image generation failed",
                None,
            ) {
                Ok(new_balance) => {
                    let record = build_record(
                        &customer,
                        &body,
                        prompt,
                        was_enhanced.then_some(final_prompt),
                        None,
                        GenerationStatus::Failed,
                        cost,
                    );
                    state.store.put_generation(&record)?;

                    tracing::info!(
                        customer_id = %customer.id,
                        refunded = %cost,
                        new_balance = %new_balance,
                        "Generation cost refunded"
                    );

                    Err(ApiError::GenerationFailed {
                        message: upstream_err.to_string(),
                        refunded: true,
                    })
                }
                Err(refund_err) => {
                    // Money is at stake: this is not a normal generation
                    // failure and must never be reported as refunded.
                    tracing::error!(
                        customer_id = %customer.id,
                        cost = %cost,
                        upstream_error = %upstream_err,
                        refund_error = %refund_err,
                        "Refund failed after generation failure - credits were NOT returned"
                    );
                    Err(ApiError::RefundFailed)
                }
            }
        }
    }
}

/// History query parameters.
#[derive(Debug, Deserialize)]
pub struct ListGenerationsQuery {
    /// Maximum number of records to return (default: 20, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

/// One generation record in the history response.
#[derive(Debug, Serialize)]
pub struct GenerationResponse {
    /// Record id.
    pub id: String,
    /// The original prompt.
    pub prompt: String,
    /// The enhanced prompt, when enhancement ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_prompt: Option<String>,
    /// Model used.
    pub model: ImageModel,
    /// Image URL (absent for failed generations).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Outcome.
    pub status: GenerationStatus,
    /// Credits debited for the attempt.
    pub credits_cost: i64,
    /// Timestamp (RFC 3339).
    pub created_at: String,
}

/// Generation history response.
#[derive(Debug, Serialize)]
pub struct ListGenerationsResponse {
    /// Records, newest first.
    pub generations: Vec<GenerationResponse>,
    /// Whether more records exist past this page.
    pub has_more: bool,
}

/// List generation history, newest first.
pub async fn list_generations(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListGenerationsQuery>,
) -> Result<Json<ListGenerationsResponse>, ApiError> {
    let Some(customer) = state.store.find_customer_by_user(&auth.user_id)? else {
        return Ok(Json(ListGenerationsResponse {
            generations: Vec::new(),
            has_more: false,
        }));
    };

    let limit = query.limit.min(100);
    let records = state
        .store
        .list_generations(&customer.id, limit + 1, query.offset)?;

    let has_more = records.len() > limit;
    let generations = records
        .into_iter()
        .take(limit)
        .map(|record| GenerationResponse {
            id: record.id.to_string(),
            prompt: record.prompt,
            enhanced_prompt: record.enhanced_prompt,
            model: record.model,
            image_url: record.image_url,
            status: record.status,
            credits_cost: record.credits_cost,
            created_at: record.created_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(ListGenerationsResponse {
        generations,
        has_more,
    }))
}

/// Find the caller's customer record, creating a zero-balance one on first
/// contact.
fn resolve_customer(state: &AppState, auth: &AuthUser) -> Result<Customer, ApiError> {
    if let Some(customer) = state.store.find_customer_by_user(&auth.user_id)? {
        return Ok(customer);
    }

    let customer = Customer::new(auth.user_id);
    state.store.put_customer(&customer)?;
    tracing::info!(
        user_id = %auth.user_id,
        customer_id = %customer.id,
        "Created customer on first generation request"
    );
    Ok(customer)
}

fn build_record(
    customer: &Customer,
    body: &GenerateRequest,
    prompt: &str,
    enhanced_prompt: Option<String>,
    image_url: Option<String>,
    status: GenerationStatus,
    cost: i64,
) -> GenerationRecord {
    GenerationRecord {
        id: GenerationId::generate(),
        customer_id: customer.id,
        prompt: prompt.to_string(),
        enhanced_prompt,
        model: body.model,
        image_url,
        status,
        credits_cost: cost,
        metadata: serde_json::json!({
            "style": body.style,
            "aspect_ratio": body.aspect_ratio,
            "size": body.aspect_ratio.size(),
            "provider": "zhipu",
        }),
        created_at: chrono::Utc::now(),
    }
}
