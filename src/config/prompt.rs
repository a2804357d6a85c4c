pub const CHAT_SYSTEM_INSTRUCTION: &str =
    "You are GameGhost, a helpful and witty AI gaming companion. You help players beat difficult games like Undertale by providing strategies and analysis.";

pub const CHAT_FALLBACK_REPLY: &str = "I'm processing the visual stream...";

pub const CONNECTED_MESSAGE: &str =
    "I'm connected! I can see your screen now. Let's conquer this game together.";
pub const LEARNING_ENGAGED_MESSAGE: &str = "Neural Agent Engaged. Automated learning active.";
pub const LEARNING_SUSPENDED_MESSAGE: &str = "Neural Agent Suspended.";

pub fn analysis_prompt(game_context: &str) -> String {
    format!(
        "You are an expert AI gamer. Analyze this screenshot of a game (Current context: {}).\n\
         1. What have you learned about the current situation?\n\
         2. What is the single best next input action (e.g., 'Move Left', 'Press X', 'Talk to NPC')?\n\
         3. Provide a quick pro coaching tip.\n\
         Return only JSON.",
        game_context
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_prompt_embeds_context() {
        let prompt = analysis_prompt("Hollow Knight, Mantis Lords");
        assert!(prompt.contains("(Current context: Hollow Knight, Mantis Lords)"));
        assert!(prompt.ends_with("Return only JSON."));
    }
}
