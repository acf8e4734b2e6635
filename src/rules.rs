use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user-authored, independently toggleable instruction snippet ("card").
/// Active cards are concatenated into every prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextRule {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "isActive", default)]
    pub is_active: bool,
    /// Epoch milliseconds. Ordering key only; not enforced unique.
    #[serde(rename = "createdAt", default)]
    pub created_at: i64,
}

impl ContextRule {
    pub fn new(title: String, content: String, is_active: bool, created_at: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            content,
            is_active,
            created_at,
        }
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Rules seeded on first run, mirroring the shipped defaults.
pub fn default_rules() -> Vec<ContextRule> {
    let base = now_millis();
    vec![
        ContextRule::new(
            "Excel 格式化与合并规范".to_string(),
            [
                "在生成测试用例时，请严格遵循以下格式规范：",
                "1. 【结构层级】：JSON 必须包含 \"module\" (功能模块) 字段。同一模块的用例必须连续排列，以便后续进行单元格合并展示。",
                "2. 【多点换行】：测试步骤和预期结果包含多点时，必须使用 \"\\n\" 换行，严禁写成一段。",
                "3. 【优先级标准】：严格使用 P0 (核心)、P1 (重要)、P2 (一般) 标识。",
            ]
            .join("\n"),
            true,
            base,
        ),
        ContextRule::new(
            "通用边界值规则".to_string(),
            [
                "在设计数值型或长度限制的输入框测试用例时，必须包含：",
                "- 最小值-1",
                "- 最小值",
                "- 最大值",
                "- 最大值+1",
                "- 空值",
                "- 非数字/特殊字符",
                "- 超长字符",
            ]
            .join("\n"),
            false,
            base + 1,
        ),
        ContextRule::new(
            "移动端异常场景".to_string(),
            [
                "涉及移动端功能时，需补充以下场景：",
                "- 弱网/断网状态下的表现",
                "- 飞行模式切换",
                "- 应用后台切换/杀进程",
                "- 来电/短信中断",
                "- 低电量/省电模式提醒",
            ]
            .join("\n"),
            false,
            base + 2,
        ),
    ]
}

/// Active rules in stored order.
pub fn active_rules(rules: &[ContextRule]) -> Vec<&ContextRule> {
    rules.iter().filter(|rule| rule.is_active).collect()
}

/// Formats the active rules as the context block injected into every prompt.
/// Empty string when no rule is active.
pub fn render_context_block(rules: &[ContextRule]) -> String {
    let active = active_rules(rules);
    if active.is_empty() {
        return String::new();
    }
    let body = active
        .iter()
        .enumerate()
        .map(|(i, rule)| format!("{}. [{}]: {}", i + 1, rule.title, rule.content))
        .collect::<Vec<_>>()
        .join("\n");
    format!("\n--- ACTIVE GLOBAL CONTEXT RULES ---\n{body}\n-----------------------------------\n")
}

#[derive(Debug)]
pub enum ImportFormatError {
    NotJson(String),
    NotAnArray,
}

impl fmt::Display for ImportFormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ImportFormatError::NotJson(detail) => {
                write!(f, "import file is not valid JSON: {detail}")
            }
            ImportFormatError::NotAnArray => write!(f, "import file must be a JSON array"),
        }
    }
}

impl std::error::Error for ImportFormatError {}

#[derive(Debug, Deserialize)]
struct ImportedEntry {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(rename = "isActive", default)]
    is_active: bool,
}

/// Parses an import payload into fresh rules. Entries missing a title or
/// content are skipped rather than failing the whole import. Each imported
/// rule gets a fresh id and a monotonically increasing timestamp so the file
/// order is preserved.
pub fn parse_import(text: &str) -> Result<Vec<ContextRule>, ImportFormatError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|err| ImportFormatError::NotJson(err.to_string()))?;
    let entries = value.as_array().ok_or(ImportFormatError::NotAnArray)?;
    let base = now_millis();
    let mut imported = Vec::new();
    for entry in entries {
        let Ok(entry) = serde_json::from_value::<ImportedEntry>(entry.clone()) else {
            continue;
        };
        if entry.title.is_empty() || entry.content.is_empty() {
            continue;
        }
        let offset = imported.len() as i64;
        imported.push(ContextRule::new(
            entry.title,
            entry.content,
            entry.is_active,
            base + offset,
        ));
    }
    Ok(imported)
}

#[derive(Debug, Serialize)]
struct ExportedEntry<'a> {
    title: &'a str,
    content: &'a str,
    #[serde(rename = "isActive")]
    is_active: bool,
}

/// Serializes rules for export: ids and timestamps are dropped, only the
/// portable fields survive.
pub fn render_export(rules: &[ContextRule]) -> String {
    let entries: Vec<ExportedEntry> = rules
        .iter()
        .map(|rule| ExportedEntry {
            title: &rule.title,
            content: &rule.content,
            is_active: rule.is_active,
        })
        .collect();
    serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string())
}

/// Export filename: `caseforge_prompts_{ISO-date}.json`.
pub fn export_file_name() -> String {
    format!("caseforge_prompts_{}.json", Utc::now().format("%Y-%m-%d"))
}

#[cfg(test)]
#[path = "../tests/unit/rules_tests.rs"]
mod tests;
