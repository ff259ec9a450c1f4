use anyhow::Result;
use serde::Serialize;

use pang::{operator_name, sender_label, serve_operator_name};

use crate::config::Config;
use crate::output::Output;

#[derive(Serialize)]
struct WhoamiResult {
    operator: String,
    nickname: Option<String>,
    sender: String,
}

#[derive(Serialize)]
struct NicknameResult {
    nickname: Option<String>,
}

/// Show how this machine signs its celebrations
pub async fn whoami(config: &Config, output: &Output) -> Result<()> {
    let operator = serve_operator_name(operator_name()).operator_name().await;
    let result = WhoamiResult {
        sender: sender_label(false, config.nickname.as_deref(), &operator),
        nickname: config.nickname.clone(),
        operator,
    };
    output.success("whoami", result);
    Ok(())
}

/// Show the nickname, or set it when a name is given
pub async fn nickname(name: Option<&str>, config: &Config, output: &Output) -> Result<()> {
    let mut config = config.clone();
    if let Some(name) = name {
        config.set_nickname(name)?;
    }
    output.success(
        "nickname",
        NicknameResult {
            nickname: config.nickname,
        },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Config) {
        let temp = TempDir::new().unwrap();
        let config = Config::load(temp.path()).unwrap();
        (temp, config)
    }

    #[tokio::test]
    async fn test_nickname_set_and_show() {
        let (temp, config) = setup();
        let output = Output::new(true);

        nickname(Some("Mina"), &config, &output).await.unwrap();
        let loaded = Config::load(temp.path()).unwrap();
        assert_eq!(loaded.nickname.as_deref(), Some("Mina"));

        nickname(None, &loaded, &output).await.unwrap();
        assert_eq!(
            Config::load(temp.path()).unwrap().nickname.as_deref(),
            Some("Mina")
        );
    }

    #[tokio::test]
    async fn test_whoami_without_nickname() {
        let (_temp, config) = setup();
        whoami(&config, &Output::new(true)).await.unwrap();
    }
}
