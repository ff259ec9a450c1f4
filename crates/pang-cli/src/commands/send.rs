use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use pang::{operator_name, serve_operator_name, Composer, Draft, EventStore, Grade};

use crate::config::{Config, SharedConfig};
use crate::output::Output;

pub struct SendArgs {
    pub text: String,
    pub emojis: Vec<String>,
    pub photo: Option<PathBuf>,
    pub anonymous: bool,
    pub nickname: Option<String>,
}

#[derive(Serialize)]
struct SendResult {
    id: String,
    timestamp: u64,
    sender: String,
    combo_count: u32,
    grade: Grade,
    photo_bytes: Option<usize>,
}

/// Publish one celebration to the shared store
pub async fn send(
    args: SendArgs,
    config: Config,
    store: Arc<dyn EventStore>,
    output: &Output,
) -> Result<()> {
    let photo = match &args.photo {
        Some(path) => Some(
            std::fs::read(path)
                .with_context(|| format!("Failed to read photo {}", path.display()))?,
        ),
        None => None,
    };

    let operator = serve_operator_name(operator_name()).operator_name().await;
    let cooldown = config.photo_cooldown();
    let preferences = Arc::new(SharedConfig::new(config));
    let mut composer =
        Composer::new(store, preferences.clone(), operator).with_cooldown(cooldown);

    let event = composer
        .publish(Draft {
            text: args.text,
            emojis: args.emojis,
            photo,
            anonymous: args.anonymous,
            nickname: args.nickname,
        })
        .await?;

    if event.has_photo() {
        preferences.record_photo_sent(event.timestamp)?;
    }

    let result = SendResult {
        id: event.id.clone(),
        timestamp: event.timestamp,
        sender: event.sender.clone(),
        combo_count: event.combo_count,
        grade: Grade::from_combo(event.combo_count),
        photo_bytes: event.photo_payload.as_ref().map(|p| p.len()),
    };
    output.success("send", result);
    Ok(())
}
