//! Runnable test flows produced by flow generation.
//!
//! A flow is a named, ordered list of commands; each command serializes
//! as a single-key JSON object whose key is the operation name. The
//! first flow of a list is the shared setup; every other flow begins
//! with a `runFlow` command referencing it.

use serde::de::Error as DeError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Canonical name of the shared setup flow.
pub const SETUP_FLOW_NAME: &str = "setup";

/// File the setup flow is materialized as; `runFlow` commands reference it.
pub const SETUP_FLOW_FILE: &str = "00-setup.yaml";

/// One runnable test flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestFlow {
    /// Flow name. May arrive empty from the model; normalization
    /// assigns generated names.
    #[serde(default)]
    pub name: String,
    /// Target application id, when the runner needs one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    /// Target URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Ordered commands.
    #[serde(default)]
    pub commands: Vec<FlowCommand>,
}

impl TestFlow {
    /// Whether this flow's first command is a `runFlow` referencing the
    /// shared setup file.
    pub fn starts_with_setup_ref(&self) -> bool {
        self.commands.first().is_some_and(|cmd| {
            cmd.name == "runFlow"
                && cmd
                    .args
                    .as_str()
                    .map(|s| s == SETUP_FLOW_FILE)
                    .or_else(|| Some(cmd.args.get("file")?.as_str()? == SETUP_FLOW_FILE))
                    .unwrap_or(false)
        })
    }
}

/// A single flow command: an operation name plus its parameters.
///
/// Wire form is a single-key object, `{"tapOn": {"point": "50%,60%"}}`.
/// Parameterless commands carry `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowCommand {
    /// Operation name.
    pub name: String,
    /// Operation parameters.
    pub args: serde_json::Value,
}

impl FlowCommand {
    /// Create a command.
    pub fn new(name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// The `runFlow` command every non-setup flow starts with.
    pub fn run_setup() -> Self {
        Self::new("runFlow", serde_json::Value::String(SETUP_FLOW_FILE.into()))
    }
}

impl Serialize for FlowCommand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.args)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for FlowCommand {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            // Bare command name, e.g. `- back` in YAML.
            serde_json::Value::String(name) => Ok(FlowCommand {
                name,
                args: serde_json::Value::Null,
            }),
            serde_json::Value::Object(map) if map.len() == 1 => {
                match map.into_iter().next() {
                    Some((name, args)) => Ok(FlowCommand { name, args }),
                    None => Err(D::Error::custom("empty command object")),
                }
            }
            other => Err(D::Error::custom(format!(
                "expected a command name or single-key object, got: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_serializes_as_single_key_object() {
        let cmd = FlowCommand::new("tapOn", json!({"point": "50%,60%"}));
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json, json!({"tapOn": {"point": "50%,60%"}}));
    }

    #[test]
    fn command_parses_from_bare_string() {
        let cmd: FlowCommand = serde_json::from_value(json!("back")).unwrap();
        assert_eq!(cmd.name, "back");
        assert!(cmd.args.is_null());
    }

    #[test]
    fn command_rejects_multi_key_object() {
        let result: Result<FlowCommand, _> =
            serde_json::from_value(json!({"tapOn": {}, "back": null}));
        assert!(result.is_err());
    }

    #[test]
    fn setup_reference_detection() {
        let flow = TestFlow {
            name: "score increments".into(),
            app_id: None,
            url: Some("https://example.com/game".into()),
            tags: None,
            commands: vec![
                FlowCommand::run_setup(),
                FlowCommand::new("tapOn", json!({"text": "Play"})),
            ],
        };
        assert!(flow.starts_with_setup_ref());

        let bare = TestFlow {
            commands: vec![FlowCommand::new("tapOn", json!({"text": "Play"}))],
            ..flow
        };
        assert!(!bare.starts_with_setup_ref());
    }

    #[test]
    fn setup_reference_accepts_file_object_form() {
        let flow = TestFlow {
            name: "bonus round".into(),
            app_id: None,
            url: None,
            tags: None,
            commands: vec![FlowCommand::new("runFlow", json!({"file": SETUP_FLOW_FILE}))],
        };
        assert!(flow.starts_with_setup_ref());
    }

    #[test]
    fn flow_roundtrip() {
        let flow = TestFlow {
            name: "setup".into(),
            app_id: None,
            url: Some("https://example.com/game".into()),
            tags: Some(vec!["smoke".into()]),
            commands: vec![FlowCommand::new(
                "launchApp",
                json!({"url": "https://example.com/game"}),
            )],
        };
        let text = serde_json::to_string(&flow).unwrap();
        let back: TestFlow = serde_json::from_str(&text).unwrap();
        assert_eq!(flow, back);
    }
}
