use std::io;
use std::path::{Path, PathBuf};

use crate::fsutil::write_text_file;
use crate::recovery::TestCase;
use crate::rules::{self, ContextRule};
use crate::table::RowSpans;

const HEADER_CELLS: [&str; 7] = [
    "功能模块",
    "测试内容",
    "前提条件",
    "测试步骤",
    "期望结果",
    "优先级",
    "备注",
];

fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn multiline_cell(text: &str) -> String {
    html_escape(text).replace('\n', "<br>")
}

fn priority_style(priority: &str) -> &'static str {
    match priority {
        "P0" => "background-color: #fee2e2; color: #991b1b; font-weight: bold;",
        "P1" => "background-color: #ffedd5; color: #9a3412; font-weight: bold;",
        _ => "background-color: #dcfce7; color: #166534; font-weight: bold;",
    }
}

/// Builds the HTML `<table>` fragment placed on the clipboard for pasting
/// into spreadsheet software: inline styles, priority highlighting, and the
/// computed row spans (rows covered by a merge emit no cell).
pub fn build_table_html(cases: &[TestCase], spans: &RowSpans) -> String {
    let mut html = String::new();
    html.push_str(
        "<table border=\"1\" style=\"border-collapse: collapse; width: 100%; font-family: sans-serif;\">\n<thead>\n<tr style=\"background-color: #f3e8ff; color: #581c87;\">",
    );
    for header in HEADER_CELLS {
        html.push_str(&format!(
            "<th style=\"border: 1px solid #a8a29e; padding: 8px;\">{header}</th>"
        ));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");
    for (i, case) in cases.iter().enumerate() {
        html.push_str("<tr>");
        if spans.modules[i] > 0 {
            html.push_str(&format!(
                "<td rowspan=\"{}\" style=\"border: 1px solid #d6d3d1; padding: 8px; vertical-align: middle; background-color: #fafafa; font-weight: bold;\">{}</td>",
                spans.modules[i],
                html_escape(&case.module)
            ));
        }
        if spans.contents[i] > 0 {
            html.push_str(&format!(
                "<td rowspan=\"{}\" style=\"border: 1px solid #d6d3d1; padding: 8px; vertical-align: middle;\">{}</td>",
                spans.contents[i],
                html_escape(&case.test_content)
            ));
        }
        html.push_str(&format!(
            "<td style=\"border: 1px solid #d6d3d1; padding: 8px; vertical-align: top;\">{}</td>",
            multiline_cell(&case.pre_conditions)
        ));
        html.push_str(&format!(
            "<td style=\"border: 1px solid #d6d3d1; padding: 8px; vertical-align: top;\">{}</td>",
            multiline_cell(&case.test_steps)
        ));
        html.push_str(&format!(
            "<td style=\"border: 1px solid #d6d3d1; padding: 8px; vertical-align: top;\">{}</td>",
            multiline_cell(&case.expected_result)
        ));
        html.push_str(&format!(
            "<td style=\"border: 1px solid #d6d3d1; padding: 8px; vertical-align: top; text-align: center; {}\">{}</td>",
            priority_style(&case.priority),
            html_escape(&case.priority)
        ));
        html.push_str(&format!(
            "<td style=\"border: 1px solid #d6d3d1; padding: 8px; vertical-align: top;\">{}</td>",
            html_escape(&case.remarks)
        ));
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>");
    html
}

/// Tab-separated fallback for clipboard targets that reject HTML.
pub fn build_table_text(cases: &[TestCase]) -> String {
    let mut lines = vec![HEADER_CELLS.join("\t")];
    for case in cases {
        lines.push(
            [
                case.module.as_str(),
                case.test_content.as_str(),
                case.pre_conditions.as_str(),
                case.test_steps.as_str(),
                case.expected_result.as_str(),
                case.priority.as_str(),
                case.remarks.as_str(),
            ]
            .map(|field| field.replace('\n', " "))
            .join("\t"),
        );
    }
    lines.join("\n")
}

/// Places the grouped table on the system clipboard as HTML with a
/// plain-text fallback.
pub fn copy_table_to_clipboard(cases: &[TestCase], spans: &RowSpans) -> Result<(), String> {
    let html = build_table_html(cases, spans);
    let text = build_table_text(cases);
    let mut clipboard = arboard::Clipboard::new().map_err(|err| err.to_string())?;
    clipboard
        .set_html(html, Some(text))
        .map_err(|err| err.to_string())
}

/// Writes the rule library to `{dir}/caseforge_prompts_{ISO-date}.json` and
/// returns the written path.
pub fn export_rules_to_dir(rules: &[ContextRule], dir: &Path) -> io::Result<PathBuf> {
    let path = dir.join(rules::export_file_name());
    write_text_file(&path, &rules::render_export(rules))?;
    Ok(path)
}

#[cfg(test)]
#[path = "../tests/unit/export_tests.rs"]
mod tests;
