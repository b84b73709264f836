//! The sliding image window.
//!
//! Screenshots dominate conversation weight. Pruning replaces stale
//! image blocks in place with a text placeholder, newest first, so block
//! count and ordering never change and tool_use/tool_result pairing
//! stays intact. Rebuilding the conversation instead would cost O(n²)
//! in image bytes over a session.

use gamescout_types::{ContentBlock, Message, ResultItem, ToolResultContent};

/// Placeholder text substituted for pruned images.
pub const IMAGE_PRUNED_PLACEHOLDER: &str = "[image removed - older than context window]";

/// Images kept in the live conversation during exploration.
pub const EXPLORATION_IMAGE_WINDOW: usize = 4;

/// Keep only the `keep` most recent image blocks; replace every older
/// one with a text placeholder. `keep = 0` strips all images, which is
/// how the conversation is prepared for synthesis.
pub fn prune_images(messages: &mut [Message], keep: usize) {
    let mut seen = 0usize;
    for message in messages.iter_mut().rev() {
        for block in message.content.iter_mut().rev() {
            match block {
                ContentBlock::Image { .. } => {
                    seen += 1;
                    if seen > keep {
                        *block = ContentBlock::text(IMAGE_PRUNED_PLACEHOLDER);
                    }
                }
                ContentBlock::ToolResult { content, .. } => {
                    if let ToolResultContent::Items(items) = content {
                        for item in items.iter_mut().rev() {
                            if matches!(item, ResultItem::Image { .. }) {
                                seen += 1;
                                if seen > keep {
                                    *item = ResultItem::Text {
                                        text: IMAGE_PRUNED_PLACEHOLDER.into(),
                                    };
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

/// Count surviving image blocks across the conversation.
pub fn count_images(messages: &[Message]) -> usize {
    messages
        .iter()
        .flat_map(|m| &m.content)
        .map(|block| match block {
            ContentBlock::Image { .. } => 1,
            ContentBlock::ToolResult {
                content: ToolResultContent::Items(items),
                ..
            } => items
                .iter()
                .filter(|item| matches!(item, ResultItem::Image { .. }))
                .count(),
            _ => 0,
        })
        .sum()
}
