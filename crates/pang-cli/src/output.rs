use serde::Serialize;
use serde_json::Value;

/// Renders command results and the `listen` stream, either as one JSON
/// object per line or as short human-readable lines.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Final result of a one-shot command
    pub fn success<T: Serialize>(&self, command: &str, data: T) {
        println!("{}", self.render_success(command, &data));
    }

    pub fn success_message(&self, command: &str, message: &str) {
        self.success(command, serde_json::json!({ "message": message }));
    }

    /// Retryable failures (store unreachable, transient write errors) get a hint.
    pub fn error(&self, message: &str, retryable: bool) {
        eprintln!("{}", self.render_error(message, retryable));
    }

    /// One line of the `listen` stream
    pub fn event<T: Serialize>(&self, kind: &str, data: T) {
        println!("{}", self.render_event(kind, &data));
    }

    pub fn status(&self, kind: &str, message: &str) {
        self.event(kind, serde_json::json!({ "message": message }));
    }

    fn render_success<T: Serialize>(&self, command: &str, data: &T) -> String {
        let data = serde_json::to_value(data).unwrap_or(Value::Null);
        if self.json {
            let reply = Reply {
                status: "ok",
                command,
                data: Some(data),
                error: None,
                retryable: false,
            };
            return serde_json::to_string(&reply).unwrap_or_default();
        }
        match message_of(&data) {
            Some(message) => message.to_string(),
            None => serde_json::to_string_pretty(&data).unwrap_or_default(),
        }
    }

    fn render_error(&self, message: &str, retryable: bool) -> String {
        if self.json {
            let reply = Reply {
                status: "error",
                command: "",
                data: None,
                error: Some(message),
                retryable,
            };
            serde_json::to_string(&reply).unwrap_or_default()
        } else if retryable {
            format!("Error: {message} (run the command again to retry)")
        } else {
            format!("Error: {message}")
        }
    }

    fn render_event<T: Serialize>(&self, kind: &str, data: &T) -> String {
        let data = serde_json::to_value(data).unwrap_or(Value::Null);
        if self.json {
            let mut line = serde_json::Map::new();
            line.insert("event".to_string(), Value::String(kind.to_string()));
            match data {
                Value::Object(fields) => line.extend(fields),
                Value::Null => {}
                other => {
                    line.insert("data".to_string(), other);
                }
            }
            return Value::Object(line).to_string();
        }

        if kind == "notification" {
            let title = data.get("title").and_then(Value::as_str).unwrap_or_default();
            let body = data.get("body").and_then(Value::as_str).unwrap_or_default();
            return format!("[notification] {title}: {body}");
        }
        match message_of(&data) {
            Some(message) => format!("[{kind}] {message}"),
            None => format!("[{kind}] {}", fields_line(&data)),
        }
    }
}

#[derive(Serialize)]
struct Reply<'a> {
    status: &'a str,
    command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    retryable: bool,
}

/// A payload that is nothing but `{"message": ...}`.
fn message_of(data: &Value) -> Option<&str> {
    let fields = data.as_object()?;
    if fields.len() != 1 {
        return None;
    }
    fields.get("message")?.as_str()
}

/// `key=value` pairs for flat objects, compact JSON for anything else.
fn fields_line(data: &Value) -> String {
    let Some(fields) = data.as_object() else {
        return data.to_string();
    };
    fields
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{key}={s}"),
            other => format!("{key}={other}"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
