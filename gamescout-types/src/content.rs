//! Conversation content types.
//!
//! These carry the exact wire-level tags model providers expect:
//! `text`, `image`, `tool_use`, `tool_result`. Providers serialize them
//! as-is; nothing in the core ever decodes an image payload.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human user (and the channel tool results travel on).
    User,
    /// The model.
    Assistant,
}

/// Source for image content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    /// Base64-encoded image data.
    Base64 {
        /// The base64-encoded bytes.
        data: String,
    },
}

/// A single content block within a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// Image content. The payload stays an opaque encoded handle.
    Image {
        /// The image source.
        source: ImageSource,
        /// MIME type of the image.
        media_type: String,
    },
    /// A tool invocation request from the model.
    ToolUse {
        /// Unique identifier for this call.
        id: String,
        /// Name of the tool to invoke.
        name: String,
        /// JSON input arguments.
        input: serde_json::Value,
    },
    /// Result of a tool invocation.
    ToolResult {
        /// References the `id` of the corresponding tool_use block.
        tool_use_id: String,
        /// The result content.
        content: ToolResultContent,
        /// Whether the tool execution errored.
        #[serde(default)]
        is_error: bool,
    },
}

/// Content of a tool_result block: a bare string, or an ordered sequence
/// of text/image items (the two-element `[text, image]` form that carries
/// a screenshot back to the model).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    /// Plain string content.
    Text(String),
    /// Structured items.
    Items(Vec<ResultItem>),
}

/// An item inside a structured tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResultItem {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// An image.
    Image {
        /// The image source.
        source: ImageSource,
        /// MIME type of the image.
        media_type: String,
    },
}

/// A message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message author.
    pub role: Role,
    /// The ordered content blocks of this message.
    pub content: Vec<ContentBlock>,
}

/// A captured screenshot: base64-encoded bytes plus, once persisted,
/// the file it was written to.
///
/// Handles are created by the tool dispatcher and transferred into the
/// conversation and step log. Pruning replaces the conversation copy
/// only; the step log keeps its reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotHandle {
    /// MIME type, e.g. `image/jpeg`.
    pub media_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
    /// Where the screenshot was persisted, if anywhere.
    pub path: Option<PathBuf>,
}

impl ScreenshotHandle {
    /// Create a handle from already-encoded bytes.
    pub fn new(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            data: data.into(),
            path: None,
        }
    }

    /// Filename extension matching the media type.
    pub fn extension(&self) -> &'static str {
        match self.media_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }

    /// Render this handle as a standalone image block.
    pub fn to_image_block(&self) -> ContentBlock {
        ContentBlock::Image {
            source: ImageSource::Base64 {
                data: self.data.clone(),
            },
            media_type: self.media_type.clone(),
        }
    }

    /// Render this handle as a tool-result item.
    pub fn to_result_item(&self) -> ResultItem {
        ResultItem::Image {
            source: ImageSource::Base64 {
                data: self.data.clone(),
            },
            media_type: self.media_type.clone(),
        }
    }
}

impl ContentBlock {
    /// Create a text block.
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// Build a plain-text tool result referencing `tool_use_id`.
    pub fn tool_result(tool_use_id: impl Into<String>, text: impl Into<String>) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: ToolResultContent::Text(text.into()),
            is_error: false,
        }
    }

    /// Build an error tool result referencing `tool_use_id`.
    pub fn tool_error(tool_use_id: impl Into<String>, text: impl Into<String>) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: ToolResultContent::Text(text.into()),
            is_error: true,
        }
    }

    /// Build the two-element `[text, image]` tool result that carries a
    /// screenshot back to the model.
    pub fn tool_result_with_image(
        tool_use_id: impl Into<String>,
        text: impl Into<String>,
        screenshot: &ScreenshotHandle,
    ) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: ToolResultContent::Items(vec![
                ResultItem::Text { text: text.into() },
                screenshot.to_result_item(),
            ]),
            is_error: false,
        }
    }
}

impl Message {
    /// Create a user message.
    pub fn user(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// Create a user message holding a single text block.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![ContentBlock::text(text)])
    }

    /// Concatenated text of all text blocks in this message.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
