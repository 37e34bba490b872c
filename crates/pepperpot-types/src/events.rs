use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// -- Payment gateway --

/// Outer envelope of a payment gateway webhook. The `data.object` payload is
/// decoded separately once the event type is known.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEnvelope {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: PaymentEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub payment_intent: Option<String>,
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
}

/// Payment events this service acts on.
#[derive(Debug, Clone)]
pub enum PaymentEvent {
    CheckoutCompleted(CheckoutSession),
    PaymentFailed(PaymentIntent),
    Unhandled(String),
}

impl PaymentEvent {
    pub fn from_envelope(envelope: PaymentEnvelope) -> Result<Self, serde_json::Error> {
        match envelope.event_type.as_str() {
            "checkout.session.completed" => Ok(Self::CheckoutCompleted(serde_json::from_value(
                envelope.data.object,
            )?)),
            "payment_intent.payment_failed" => Ok(Self::PaymentFailed(serde_json::from_value(
                envelope.data.object,
            )?)),
            _ => Ok(Self::Unhandled(envelope.event_type)),
        }
    }
}

// -- Room hosting --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    pub name: String,
    #[serde(default)]
    pub sid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub identity: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Webhook body posted by the room-hosting provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomWebhook {
    pub event: String,
    #[serde(default)]
    pub room: Option<RoomInfo>,
    #[serde(default)]
    pub participant: Option<ParticipantInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    RoomFinished { room_name: String },
    ParticipantJoined { room_name: String, identity: String },
    ParticipantLeft { room_name: String, identity: String },
    Unhandled(String),
}

impl From<RoomWebhook> for RoomEvent {
    fn from(hook: RoomWebhook) -> Self {
        let room_name = hook.room.map(|r| r.name);
        let identity = hook.participant.map(|p| p.identity).unwrap_or_default();
        match (hook.event.as_str(), room_name) {
            ("room_finished", Some(room_name)) => Self::RoomFinished { room_name },
            ("participant_joined", Some(room_name)) => {
                Self::ParticipantJoined { room_name, identity }
            }
            ("participant_left", Some(room_name)) => Self::ParticipantLeft { room_name, identity },
            _ => Self::Unhandled(hook.event),
        }
    }
}
