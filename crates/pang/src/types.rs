use serde::{Deserialize, Serialize};

/// Name of the shared collection every client appends to.
pub const EVENTS_COLLECTION: &str = "pang_events";

pub const MAX_TEXT_CHARS: usize = 50;
pub const MAX_EMOJIS: usize = 20;
pub const PHOTO_BYTE_BUDGET: usize = 51_200;

pub const BATCH_TTL_MS: u64 = 5_000;
pub const EFFECT_DURATION_MS: u64 = 2_000;
pub const PHOTO_VISIBLE_MS: u64 = 7_000;
pub const PHOTO_FADE_MS: u64 = 500;
pub const PHOTO_SCRUB_MS: u64 = 5_000;
pub const PHOTO_COOLDOWN_MS: u64 = 10_000;
pub const NOTIFICATION_DISMISS_MS: u64 = 5_000;

pub const HISTORY_LIMIT: usize = 100;
pub const HISTORY_DAYS: i64 = 7;

pub const ANONYMOUS_SENDER: &str = "Anonymous Fairy";
pub const UNNAMED_SENDER: &str = "Anonymous";
pub const FALLBACK_OPERATOR_NAME: &str = "Colleague";

pub const DEFAULT_EMOJI_POOL: [&str; 8] = ["🎉", "🎊", "✨", "🍕", "🍩", "🎈", "🔥", "🥳"];

/// Encoded image bytes attached to an event. Travels as base64 on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoPayload(#[serde(with = "serde_base64")] Vec<u8>);

impl PhotoPayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One broadcast unit as committed by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CelebrationEvent {
    /// Store key. Not part of the stored value, filled in from the record key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub is_anonymous: bool,
    /// Store-assigned write time in unix milliseconds.
    pub timestamp: u64,
    #[serde(default)]
    pub emoji_sequence: Vec<String>,
    #[serde(default)]
    pub combo_count: u32,
    #[serde(default)]
    pub photo_payload: Option<PhotoPayload>,
}

impl CelebrationEvent {
    /// Parse a stored record. `None` (a tombstone) and values that do not
    /// carry the required fields are rejected.
    pub fn from_record(key: &str, value: Option<&serde_json::Value>) -> crate::Result<Self> {
        let value = value
            .filter(|v| !v.is_null())
            .ok_or_else(|| crate::Error::MalformedEvent(format!("{key}: empty record")))?;
        let mut event: CelebrationEvent = serde_json::from_value(value.clone())
            .map_err(|e| crate::Error::MalformedEvent(format!("{key}: {e}")))?;
        if key.is_empty() {
            return Err(crate::Error::MalformedEvent("record without key".to_string()));
        }
        event.id = key.to_string();
        Ok(event)
    }

    pub fn has_photo(&self) -> bool {
        self.photo_payload.is_some()
    }
}

/// An event as built by the sending surface, before the store assigns
/// `id` and `timestamp`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub text: String,
    pub sender: String,
    pub is_anonymous: bool,
    pub emoji_sequence: Vec<String>,
    pub combo_count: u32,
    pub photo_payload: Option<PhotoPayload>,
}

impl NewEvent {
    pub fn commit(self, id: impl Into<String>, timestamp: u64) -> CelebrationEvent {
        CelebrationEvent {
            id: id.into(),
            text: self.text,
            sender: self.sender,
            is_anonymous: self.is_anonymous,
            timestamp,
            emoji_sequence: self.emoji_sequence,
            combo_count: self.combo_count,
            photo_payload: self.photo_payload,
        }
    }
}

pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

mod serde_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}
