//! Inbound webhooks from the payment gateway and the room-hosting provider.
//! Both authenticate the raw body, so handlers take `Bytes` rather than JSON.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header},
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, info, warn};
use uuid::Uuid;

use pepperpot_types::api::WebhookAck;
use pepperpot_types::events::{PaymentEnvelope, PaymentEvent, RoomEvent, RoomWebhook};

use crate::error::ApiError;
use crate::state::{AppState, with_db};

type HmacSha256 = Hmac<Sha256>;

pub const PAYMENT_SIGNATURE_HEADER: &str = "payment-signature";
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    Malformed,
    Expired,
    Mismatch,
}

impl SignatureError {
    fn message(self) -> &'static str {
        match self {
            Self::Malformed => "Malformed signature header",
            Self::Expired => "Signature timestamp outside tolerance",
            Self::Mismatch => "Invalid signature",
        }
    }
}

/// Checks `t=<unix>,v1=<hex>` against HMAC-SHA256(secret, "<t>.<body>").
/// Any one of several `v1` entries may match.
pub fn verify_payment_signature(
    secret: &str,
    header: &str,
    body: &[u8],
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", t)) => timestamp = t.parse::<i64>().ok(),
            Some(("v1", sig)) => candidates.push(sig),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if candidates.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    for candidate in candidates {
        let Ok(expected) = hex::decode(candidate) else {
            continue;
        };
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }
    Err(SignatureError::Mismatch)
}

pub async fn payments(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let secret = state
        .settings
        .payment_webhook_secret
        .as_deref()
        .ok_or_else(|| ApiError::Unavailable("Payment webhook is not configured".into()))?;
    let signature = headers
        .get(PAYMENT_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::validation("Missing signature"))?;

    if let Err(e) = verify_payment_signature(secret, signature, &body, Utc::now().timestamp()) {
        warn!("Payment webhook rejected: {}", e.message());
        return Err(ApiError::validation(e.message()));
    }

    let envelope: PaymentEnvelope = serde_json::from_slice(&body)
        .map_err(|e| ApiError::validation(format!("Invalid payload: {e}")))?;
    let event_id = envelope.id.clone();
    let event = PaymentEvent::from_envelope(envelope)
        .map_err(|e| ApiError::validation(format!("Invalid payload: {e}")))?;

    match event {
        PaymentEvent::CheckoutCompleted(session) => {
            let user_id = session.metadata.get("user_id").cloned();
            let document_id = session.metadata.get("document_id").cloned();
            let (Some(user_id), Some(document_id)) = (user_id, document_id) else {
                warn!(event = %event_id, session = %session.id, "Checkout session missing metadata");
                return Err(ApiError::validation("Missing metadata"));
            };
            let amount = session.amount_total.unwrap_or(0);
            let payment_intent = session.payment_intent.clone();
            with_db(&state, move |db| {
                db.upsert_completed_purchase(
                    &Uuid::new_v4().to_string(),
                    &user_id,
                    &document_id,
                    amount,
                    payment_intent.as_deref(),
                )
            })
            .await?;
            info!(event = %event_id, session = %session.id, "Purchase completed");
        }
        PaymentEvent::PaymentFailed(intent) => {
            let intent_id = intent.id.clone();
            let updated = with_db(&state, move |db| db.mark_purchase_failed(&intent_id)).await?;
            info!(event = %event_id, payment_intent = %intent.id, updated, "Payment failed");
        }
        PaymentEvent::Unhandled(kind) => {
            debug!(event = %event_id, kind = %kind, "Ignoring payment event");
        }
    }

    Ok(Json(WebhookAck { received: true }))
}

pub async fn rooms(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let credentials = state
        .room_credentials
        .clone()
        .ok_or_else(|| ApiError::Unavailable("Live streaming is not configured".into()))?;
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthenticated)?;
    if let Err(e) = credentials.verify_webhook(authorization, &body) {
        warn!("Room webhook rejected: {}", e);
        return Err(ApiError::Unauthenticated);
    }

    let hook: RoomWebhook = serde_json::from_slice(&body)
        .map_err(|e| ApiError::validation(format!("Invalid payload: {e}")))?;

    match RoomEvent::from(hook) {
        RoomEvent::RoomFinished { room_name } => {
            let room = room_name.clone();
            let ended = with_db(&state, move |db| db.end_live_session_by_room(&room, Utc::now())).await?;
            if ended {
                info!(room = %room_name, "Live session ended by room provider");
            }
        }
        RoomEvent::ParticipantJoined { room_name, identity } => {
            let room = room_name.clone();
            with_db(&state, move |db| db.participant_joined(&room)).await?;
            debug!(room = %room_name, identity = %identity, "Participant joined");
        }
        RoomEvent::ParticipantLeft { room_name, identity } => {
            let room = room_name.clone();
            with_db(&state, move |db| db.participant_left(&room)).await?;
            debug!(room = %room_name, identity = %identity, "Participant left");
        }
        RoomEvent::Unhandled(event) => {
            debug!(event = %event, "Ignoring room event");
        }
    }

    Ok(Json(WebhookAck { received: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, t: i64, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{t}.").as_bytes());
        mac.update(body);
        format!("t={t},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn payment_signature_checks() {
        let body = br#"{"id":"evt_1"}"#;
        let now = 1_700_000_000;
        let header = sign("whsec", now, body);

        assert_eq!(verify_payment_signature("whsec", &header, body, now + 10), Ok(()));
        assert_eq!(
            verify_payment_signature("other", &header, body, now),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_payment_signature("whsec", &header, b"tampered", now),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_payment_signature("whsec", &header, body, now + 301),
            Err(SignatureError::Expired)
        );
        assert_eq!(
            verify_payment_signature("whsec", "v1=abc", body, now),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn any_matching_v1_entry_is_accepted() {
        let body = b"{}";
        let now = 1_700_000_000;
        let good = sign("whsec", now, body);
        let header = format!("t={now},v1=deadbeef,{}", good.split(',').nth(1).unwrap());
        assert_eq!(verify_payment_signature("whsec", &header, body, now), Ok(()));
    }
}
