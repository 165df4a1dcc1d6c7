use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, INDEX_COMMANDS, MULTI_PATH_COMMANDS, NO_ARG_COMMANDS, RAW_ARG_COMMANDS,
    SINGLE_PATH_COMMANDS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub text: Option<String>,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            text: None,
            command_args: BTreeMap::new(),
        }
    }

    fn with_arg(mut self, key: &str, value: Value) -> Self {
        self.command_args.insert(key.to_string(), value);
        self
    }

    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.command_args
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

/// Shell-style splitting so quoted paths with spaces survive; unbalanced
/// quotes fall back to whitespace splitting.
fn parse_path_args(arg: &str) -> Vec<String> {
    let parts = shell_words::split(arg)
        .unwrap_or_else(|_| arg.split_whitespace().map(str::to_string).collect());
    parts.into_iter().filter(|part| !part.is_empty()).collect()
}

/// A voice note is one file, so extra words rejoin into a single path.
fn parse_single_path_arg(arg: &str) -> String {
    parse_path_args(arg).join(" ")
}

/// Parses one chat line. Slash commands map to actions; any other text is
/// the free-text description and submits an analysis.
pub fn parse_intent(text: &str) -> Intent {
    let line = text.trim();
    if line.is_empty() {
        return Intent::new("noop", text);
    }

    let Some((command, arg)) = split_command(line) else {
        let mut intent = Intent::new("analyze", text);
        intent.text = Some(line.to_string());
        return intent;
    };

    if let Some(action) = find_action(&command, RAW_ARG_COMMANDS) {
        let key = match action {
            "set_profile" => "profile",
            "lookup" => "condition",
            "open_history" => "id",
            _ => "path",
        };
        return Intent::new(action, text).with_arg(key, Value::String(arg.to_string()));
    }
    if let Some(action) = find_action(&command, SINGLE_PATH_COMMANDS) {
        return Intent::new(action, text)
            .with_arg("path", Value::String(parse_single_path_arg(arg)));
    }
    if let Some(action) = find_action(&command, MULTI_PATH_COMMANDS) {
        let paths = parse_path_args(arg).into_iter().map(Value::String).collect();
        return Intent::new(action, text).with_arg("paths", Value::Array(paths));
    }
    if let Some(action) = find_action(&command, INDEX_COMMANDS) {
        let index = arg
            .parse::<u64>()
            .ok()
            .filter(|value| *value > 0)
            .map(|value| Value::Number(value.into()))
            .unwrap_or(Value::Null);
        return Intent::new(action, text).with_arg("index", index);
    }
    if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
        return Intent::new(action, text);
    }

    Intent::new("unknown", text)
        .with_arg("command", Value::String(command))
        .with_arg("arg", Value::String(arg.to_string()))
}

/// `/name rest` → lowercased name and trimmed rest. A lone `/` or a slash
/// followed by punctuation is ordinary text.
fn split_command(line: &str) -> Option<(String, &str)> {
    let tail = line.strip_prefix('/')?;
    let name_len = tail
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .count();
    if name_len == 0 {
        return None;
    }
    Some((tail[..name_len].to_ascii_lowercase(), tail[name_len..].trim()))
}
