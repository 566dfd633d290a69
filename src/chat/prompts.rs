//! Action tags and their system prompts.
//!
//! Every chat turn carries an action tag; the tag selects the system prompt
//! sent upstream. The `custom` tag is the only one that requires a free-text
//! instruction from the user.

use crate::error::ApiError;

pub struct ActionPrompt {
    pub action: &'static str,
    pub system_prompt: &'static str,
}

pub const ACTIONS: &[ActionPrompt] = &[
    ActionPrompt {
        action: "analyze",
        system_prompt: "You are a code analysis expert. Analyze the given code, identify \
            potential issues, and suggest improvements. Focus on code structure, efficiency, \
            and best practices.",
    },
    ActionPrompt {
        action: "debug",
        system_prompt: "You are a debugging expert. Examine the code for any errors, identify \
            the root causes of issues, and suggest fixes. If you find a potential bug, make \
            sure it's an actual bug and not something harmless. Do not return the same code \
            as the user, or very similar code.",
    },
    ActionPrompt {
        action: "optimize",
        system_prompt: "You are a code optimization specialist. Analyze the given code and \
            suggest optimizations to improve performance, reduce complexity, and enhance \
            efficiency. Explain the benefits of each optimization.",
    },
    ActionPrompt {
        action: "secure",
        system_prompt: "You are a cybersecurity expert. Analyze the code for potential \
            security vulnerabilities, suggest fixes, and explain best practices for writing \
            secure code. Only respond if something is code-related.",
    },
    ActionPrompt {
        action: "document",
        system_prompt: "You are a technical documentation expert. Generate clear, concise, \
            and comprehensive documentation for the given code. Include function \
            descriptions, parameter explanations, and usage examples.",
    },
    ActionPrompt {
        action: "custom",
        system_prompt: "You are a versatile coding assistant. Follow the user's custom \
            instruction precisely, but only if it's coding related.",
    },
];

pub fn system_prompt_for(action: &str) -> Option<&'static str> {
    ACTIONS
        .iter()
        .find(|entry| entry.action == action)
        .map(|entry| entry.system_prompt)
}

/// Reject turns whose action tag is unknown, or a `custom` turn without an
/// instruction. Runs before any upstream call.
pub fn validate(action: &str, instruction: Option<&str>) -> Result<(), ApiError> {
    if system_prompt_for(action).is_none() {
        return Err(ApiError::bad_request(format!("Unknown action '{}'", action)));
    }
    if action == "custom" && instruction.map(str::trim).unwrap_or("").is_empty() {
        return Err(ApiError::bad_request(
            "The custom action requires an instruction",
        ));
    }
    Ok(())
}

/// Compose the system message for a turn. An explicit override replaces the
/// action table's prompt but the language/action framing is always appended.
pub fn build_system_prompt(
    override_prompt: Option<&str>,
    action: &str,
    language: &str,
    instruction: Option<&str>,
) -> String {
    let base = override_prompt
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .or_else(|| system_prompt_for(action))
        .unwrap_or_default();

    let mut prompt = format!(
        "{} You are a coding assistant specialized in {}. The user's current action is: {}.",
        base,
        language,
        action.to_uppercase()
    );

    if let Some(instruction) = instruction.map(str::trim).filter(|i| !i.is_empty()) {
        prompt.push_str(&format!(" Custom instruction: {}", instruction));
    }

    prompt
}
