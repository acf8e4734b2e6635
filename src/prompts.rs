//! Prompt construction for the two conversation phases. Pure functions from
//! (history, rules, input) to prompt text; the model call happens elsewhere.

/// Phase 1: requirement clarification. The model acts as a QA-requirements
/// interviewer and must not produce test cases yet.
pub fn build_discussion_prompt(history_text: &str, rules_block: &str, user_input: &str) -> String {
    format!(
        "History: {history_text}\n{rules_block}\nUser Input: {user_input}\nYou are an expert QA Engineer. Discuss requirements with the user. PHASE 1: REQUIREMENT CLARIFICATION ONLY. Focus on confirming the \"Function List\". Reply in Chinese. Be concise."
    )
}

/// Phase 2: structured generation. The model must emit only a JSON array of
/// test-case objects, pre-sorted by module then testContent.
pub fn build_generation_prompt(history_text: &str, rules_block: &str) -> String {
    format!(
        "PHASE 2: DEEP THINKING & GENERATION\nContext: {history_text}\nGlobal Rules: {rules_block}\nTASK: Generate DETAILED test cases. FORMAT: JSON Array ONLY. Ensure strictly valid JSON syntax. Do NOT use single backslashes unless for escaping. Keys: \"module\", \"testContent\", \"preConditions\", \"testSteps\" (use \\n), \"expectedResult\" (use \\n), \"priority\" (P0/P1/P2), \"remarks\". Sort: module -> testContent. Language: Chinese."
    )
}

#[cfg(test)]
#[path = "../tests/unit/prompts_tests.rs"]
mod tests;
