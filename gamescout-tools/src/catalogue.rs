//! The tool catalogue offered to the model.

use gamescout_types::ToolSchema;

/// Tool name constants, used by the dispatcher and the scheduler.
pub mod names {
    /// Capture the current frame.
    pub const SCREENSHOT: &str = "screenshot";
    /// Click at coordinates.
    pub const CLICK: &str = "click";
    /// Type text, optionally clicking first.
    pub const TYPE_TEXT: &str = "type_text";
    /// Scroll the page.
    pub const SCROLL: &str = "scroll";
    /// Evaluate a JavaScript expression.
    pub const EVALUATE_JS: &str = "evaluate_js";
    /// Sleep or wait for an element.
    pub const WAIT: &str = "wait";
    /// Read title, URL, and visible text.
    pub const GET_PAGE_INFO: &str = "get_page_info";
    /// Read recent console output.
    pub const CONSOLE_LOGS: &str = "console_logs";
    /// Navigate to a URL.
    pub const NAVIGATE: &str = "navigate";
    /// Ask the budget governor for more steps.
    pub const REQUEST_MORE_STEPS: &str = "request_more_steps";
    /// Ask the budget governor for more time.
    pub const REQUEST_MORE_TIME: &str = "request_more_time";
}

/// Build the tool catalogue.
///
/// The budget tools are offered only when the corresponding adaptive
/// extension is enabled; against a fixed budget the model never sees
/// them.
pub fn tool_schemas(adaptive_steps: bool, adaptive_time: bool) -> Vec<ToolSchema> {
    let mut schemas = vec![
        ToolSchema {
            name: names::SCREENSHOT.into(),
            description: "Capture a screenshot of the current game state.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolSchema {
            name: names::CLICK.into(),
            description: "Click at viewport coordinates. A screenshot of the result is returned automatically.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "x": {"type": "integer", "description": "X coordinate in pixels"},
                    "y": {"type": "integer", "description": "Y coordinate in pixels"}
                },
                "required": ["x", "y"]
            }),
        },
        ToolSchema {
            name: names::TYPE_TEXT.into(),
            description: "Type text into the focused element, optionally clicking coordinates first.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "text": {"type": "string", "description": "Text to type"},
                    "x": {"type": "integer", "description": "Optional X coordinate to click first"},
                    "y": {"type": "integer", "description": "Optional Y coordinate to click first"}
                },
                "required": ["text"]
            }),
        },
        ToolSchema {
            name: names::SCROLL.into(),
            description: "Scroll the page in a direction.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "direction": {"type": "string", "enum": ["up", "down", "left", "right"]},
                    "amount": {"type": "integer", "description": "Pixels to scroll (default 300)"}
                },
                "required": ["direction"]
            }),
        },
        ToolSchema {
            name: names::EVALUATE_JS.into(),
            description: "Evaluate a JavaScript expression in the page and return the stringified result.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "expression": {"type": "string", "description": "Expression to evaluate"}
                },
                "required": ["expression"]
            }),
        },
        ToolSchema {
            name: names::WAIT.into(),
            description: "Sleep for up to 10 seconds, or wait up to 5 seconds for a selector to become visible.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "milliseconds": {"type": "integer", "description": "Milliseconds to sleep (max 10000)"},
                    "selector": {"type": "string", "description": "CSS selector to wait for"}
                }
            }),
        },
        ToolSchema {
            name: names::GET_PAGE_INFO.into(),
            description: "Read the page title, URL, and visible text.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolSchema {
            name: names::CONSOLE_LOGS.into(),
            description: "Read recent browser console output.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolSchema {
            name: names::NAVIGATE.into(),
            description: "Navigate the page to a URL.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "Absolute URL to open"}
                },
                "required": ["url"]
            }),
        },
    ];

    if adaptive_steps {
        schemas.push(ToolSchema {
            name: names::REQUEST_MORE_STEPS.into(),
            description: "Request additional exploration steps when the remaining budget is too small to finish.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "reason": {"type": "string", "description": "Why more steps are needed"},
                    "additional_steps": {"type": "integer", "description": "How many more steps to request (ask for at least 5)"}
                },
                "required": ["reason", "additional_steps"]
            }),
        });
    }
    if adaptive_time {
        schemas.push(ToolSchema {
            name: names::REQUEST_MORE_TIME.into(),
            description: "Request additional exploration time when the remaining budget is too small to finish.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "reason": {"type": "string", "description": "Why more time is needed"},
                    "additional_minutes": {"type": "integer", "description": "How many more minutes to request"}
                },
                "required": ["reason", "additional_minutes"]
            }),
        });
    }

    schemas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_budget_hides_budget_tools() {
        let schemas = tool_schemas(false, false);
        assert_eq!(schemas.len(), 9);
        assert!(
            !schemas
                .iter()
                .any(|s| s.name == names::REQUEST_MORE_STEPS || s.name == names::REQUEST_MORE_TIME)
        );
    }

    #[test]
    fn adaptive_flags_add_budget_tools() {
        let schemas = tool_schemas(true, true);
        assert_eq!(schemas.len(), 11);
        let names_list: Vec<&str> = schemas.iter().map(|s| s.name.as_str()).collect();
        assert!(names_list.contains(&names::REQUEST_MORE_STEPS));
        assert!(names_list.contains(&names::REQUEST_MORE_TIME));
    }

    #[test]
    fn every_schema_is_an_object_schema() {
        for schema in tool_schemas(true, true) {
            assert_eq!(schema.input_schema["type"], "object", "{}", schema.name);
        }
    }
}
