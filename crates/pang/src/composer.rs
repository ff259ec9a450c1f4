//! The sending surface: validates a draft, grades it, compresses any photo
//! and appends the result to the shared store.

use std::sync::{Arc, Mutex};

use crate::{
    combo_count, CelebrationEvent, Error, EventStore, MediaBudgeter, NewEvent, PhotoCooldown,
    Result, ANONYMOUS_SENDER, MAX_EMOJIS, MAX_TEXT_CHARS, UNNAMED_SENDER,
};

/// Persisted display nickname.
pub trait PreferenceStore: Send + Sync {
    fn nickname(&self) -> Option<String>;
    fn set_nickname(&self, nickname: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryPreferences {
    nickname: Mutex<Option<String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn nickname(&self) -> Option<String> {
        self.nickname.lock().unwrap().clone()
    }

    fn set_nickname(&self, nickname: &str) -> Result<()> {
        *self.nickname.lock().unwrap() = Some(nickname.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub text: String,
    pub emojis: Vec<String>,
    /// Raw image file bytes, any format the decoder understands.
    pub photo: Option<Vec<u8>>,
    pub anonymous: bool,
    /// Overrides the stored nickname for this send.
    pub nickname: Option<String>,
}

impl Draft {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// `Nickname(operator)`, or the fixed anonymous label.
pub fn sender_label(anonymous: bool, nickname: Option<&str>, operator: &str) -> String {
    if anonymous {
        return ANONYMOUS_SENDER.to_string();
    }
    let nickname = nickname
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(UNNAMED_SENDER);
    format!("{nickname}({operator})")
}

pub struct Composer {
    store: Arc<dyn EventStore>,
    preferences: Arc<dyn PreferenceStore>,
    budgeter: Arc<MediaBudgeter>,
    cooldown: PhotoCooldown,
    operator: String,
}

impl Composer {
    pub fn new(
        store: Arc<dyn EventStore>,
        preferences: Arc<dyn PreferenceStore>,
        operator: impl Into<String>,
    ) -> Self {
        Self {
            store,
            preferences,
            budgeter: Arc::new(MediaBudgeter::default()),
            cooldown: PhotoCooldown::default(),
            operator: operator.into(),
        }
    }

    pub fn with_budgeter(mut self, budgeter: MediaBudgeter) -> Self {
        self.budgeter = Arc::new(budgeter);
        self
    }

    pub fn with_cooldown(mut self, cooldown: PhotoCooldown) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn cooldown(&self) -> &PhotoCooldown {
        &self.cooldown
    }

    pub async fn publish(&mut self, draft: Draft) -> Result<CelebrationEvent> {
        let text = draft.text.trim().to_string();
        if text.is_empty() {
            return Err(Error::EmptyText);
        }
        let len = text.chars().count();
        if len > MAX_TEXT_CHARS {
            return Err(Error::TextTooLong {
                len,
                max: MAX_TEXT_CHARS,
            });
        }
        if draft.emojis.len() > MAX_EMOJIS {
            return Err(Error::TooManyEmojis {
                count: draft.emojis.len(),
                max: MAX_EMOJIS,
            });
        }

        let photo_payload = match draft.photo {
            Some(source) => {
                self.cooldown.check()?;
                let budgeter = self.budgeter.clone();
                let payload = tokio::task::spawn_blocking(move || budgeter.compress(&source))
                    .await
                    .map_err(|e| Error::Io(std::io::Error::other(e)))??;
                Some(payload)
            }
            None => None,
        };

        let nickname = draft.nickname.or_else(|| self.preferences.nickname());
        let sender = sender_label(draft.anonymous, nickname.as_deref(), &self.operator);
        let combo = combo_count(&draft.emojis);
        let with_photo = photo_payload.is_some();

        let event = self
            .store
            .append(NewEvent {
                text,
                sender,
                is_anonymous: draft.anonymous,
                emoji_sequence: draft.emojis,
                combo_count: combo,
                photo_payload,
            })
            .await?;
        tracing::info!(
            event_id = %event.id,
            combo,
            photo = with_photo,
            "celebration published"
        );

        if with_photo {
            self.cooldown.start();
        }
        if !draft.anonymous {
            if let Some(nickname) = nickname.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
                if let Err(e) = self.preferences.set_nickname(nickname) {
                    tracing::warn!(error = %e, "failed to save nickname");
                }
            }
        }
        Ok(event)
    }
}
