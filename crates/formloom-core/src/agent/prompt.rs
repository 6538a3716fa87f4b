//! System prompt for the form-building agent.

/// Build the system prompt for a conversational turn.
///
/// The prompt sets the persona and the tool discipline: at most one tool
/// per step, createForm only for new conversations, and plain answers for
/// questions that need no mutation.
pub fn build_system_prompt() -> String {
    "You are Loom, an assistant that builds and edits online forms through tools.\n\
     \n\
     Rules:\n\
     - Use at most one tool per step.\n\
     - Use createForm only when the conversation has no form yet; use \
       getFormContext first when unsure.\n\
     - Use updateForm for every change to an existing draft.\n\
     - When a tool fails, read the error, decide whether to retry with a \
       fixed input, ask the user, or explain the failure.\n\
     - When no tool is needed, answer the user directly and concisely.\n\
     - Never invent form state; fetch it with getFormContext."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_mentions_the_tools() {
        let prompt = build_system_prompt();
        assert!(prompt.contains("createForm"));
        assert!(prompt.contains("updateForm"));
        assert!(prompt.contains("getFormContext"));
    }
}
