//! Plain chat agent for `@chatgpt`.

use super::traits::Agent;

/// Answers from the model's own knowledge, without passages or functions.
pub struct ChatAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl ChatAgent {
    /// Creates a chat agent.
    #[must_use]
    pub const fn new(model: String, max_tokens: u32, system_prompt: String) -> Self {
        Self {
            model,
            max_tokens,
            system_prompt,
        }
    }
}

impl Agent for ChatAgent {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.5
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_properties() {
        let agent = ChatAgent::new("gpt-35-turbo".to_string(), 1024, "Be helpful.".to_string());
        assert_eq!(agent.name(), "chat");
        assert_eq!(agent.system_prompt(), "Be helpful.");
        assert!((agent.temperature() - 0.5).abs() < f32::EPSILON);
        assert!(agent.tools().is_empty());
    }
}
