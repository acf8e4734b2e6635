use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// One generated test case. Produced only as part of a full replacement list;
/// there is no persistent identity. Missing fields parse as empty strings and
/// the priority is preserved exactly as the model emitted it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TestCase {
    pub module: String,
    pub test_content: String,
    pub pre_conditions: String,
    pub test_steps: String,
    pub expected_result: String,
    pub priority: String,
    pub remarks: String,
}

/// Model output that could not be recovered as a JSON array of test cases,
/// even after the repair pass.
#[derive(Debug)]
pub struct MalformedOutputError {
    pub parse_error: String,
    pub payload: String,
}

impl fmt::Display for MalformedOutputError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "model output is not a valid test-case array: {}", self.parse_error)
    }
}

impl std::error::Error for MalformedOutputError {}

/// Whether the repair pass was needed. The UI words its success toast
/// differently when the payload had to be patched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    Clean,
    Repaired,
}

fn stray_backslash_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\\([^/\\bfnrtu"]|$)"#).expect("stray backslash pattern is valid")
    })
}

/// Doubles every backslash that does not start a recognized JSON escape
/// sequence. Models often emit Windows paths or regex-like fragments with
/// bare backslashes inside string fields; one deterministic pass recovers
/// those without looping.
fn repair_stray_backslashes(text: &str) -> String {
    stray_backslash_pattern()
        .replace_all(text, "\\\\$1")
        .into_owned()
}

fn clean_raw(raw: &str) -> String {
    raw.replace("```json", "")
        .replace("```", "")
        .trim()
        .replace("\\'", "'")
}

/// Parses raw model output into the test-case list: strip code fences, trim,
/// undo erroneously-escaped single quotes, strict parse, and on failure one
/// repair pass before giving up.
pub fn parse_test_cases(raw: &str) -> Result<(Vec<TestCase>, RecoveryOutcome), MalformedOutputError> {
    let cleaned = clean_raw(raw);
    match serde_json::from_str::<Vec<TestCase>>(&cleaned) {
        Ok(cases) => Ok((cases, RecoveryOutcome::Clean)),
        Err(first_error) => {
            let repaired = repair_stray_backslashes(&cleaned);
            match serde_json::from_str::<Vec<TestCase>>(&repaired) {
                Ok(cases) => Ok((cases, RecoveryOutcome::Repaired)),
                Err(_) => Err(MalformedOutputError {
                    parse_error: first_error.to_string(),
                    payload: cleaned,
                }),
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/recovery_tests.rs"]
mod tests;
