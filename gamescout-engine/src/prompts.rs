//! Prompt text for the exploration phase.

use crate::scheduler::COMPLETION_SENTINEL;
use gamescout_types::PageMeta;

/// System prompt for the exploration loop.
pub fn exploration_system_prompt(max_steps: u32) -> String {
    format!(
        "You are a QA engineer exploring an unknown web-based game in a real browser. \
         Your job is to understand what the game is, how it is played, and where it \
         might break, by interacting with it through the tools you are given.\n\n\
         Work methodically:\n\
         - Start with a screenshot to see the current state.\n\
         - Read the page info and console output early; they often reveal the engine \
         and obvious errors.\n\
         - Interact with everything that looks interactive: buttons, menus, the play \
         area itself.\n\
         - Use evaluate_js to inspect game state that is not visible on screen.\n\
         - After each action, study the returned screenshot before deciding what to \
         do next.\n\n\
         You have a budget of about {max_steps} steps. Spend them on breadth first \
         (find every screen and mechanic), then depth (edge cases, invalid input, \
         rapid clicking).\n\n\
         When you have seen enough to describe the game's mechanics, UI, user flows, \
         and edge cases, write {COMPLETION_SENTINEL} in a plain text message and stop \
         calling tools."
    )
}

/// Opening user message carrying the target and page metadata.
pub fn initial_user_message(url: &str, meta: &PageMeta) -> String {
    let mut message = format!("Explore the game at {url}.");
    if !meta.title.is_empty() {
        message.push_str(&format!(" The page title is {:?}.", meta.title));
    }
    if let Some(framework) = &meta.framework {
        message.push_str(&format!(
            " It appears to be built with {framework}; use that knowledge when \
             inspecting game state."
        ));
    }
    message.push_str(" Begin with a screenshot.");
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_names_the_sentinel_and_budget() {
        let prompt = exploration_system_prompt(25);
        assert!(prompt.contains("EXPLORATION_COMPLETE"));
        assert!(prompt.contains("about 25 steps"));
    }

    #[test]
    fn initial_message_includes_metadata_when_present() {
        let meta = PageMeta {
            title: "Orbit Drop".into(),
            url: String::new(),
            framework: Some("phaser".into()),
        };
        let message = initial_user_message("https://example.com/game", &meta);
        assert!(message.contains("https://example.com/game"));
        assert!(message.contains("Orbit Drop"));
        assert!(message.contains("phaser"));

        let bare = initial_user_message("https://example.com/game", &PageMeta::default());
        assert!(!bare.contains("page title"));
    }
}
