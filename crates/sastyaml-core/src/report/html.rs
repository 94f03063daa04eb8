use chrono::{DateTime, Local};

use super::ReportSummary;
use crate::analyzer::finding::Finding;
use crate::messages;

/// Render a self-contained HTML report for `summary`.
pub fn render_html(summary: &ReportSummary, generated_at: DateTime<Local>) -> String {
    let findings_html = if summary.is_empty() {
        format!(
            r#"<div class="empty">
                <h2>{}</h2>
            </div>"#,
            messages::NO_FINDINGS
        )
    } else {
        summary
            .findings
            .iter()
            .map(render_finding)
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="ru">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>
        body {{
            padding: 20px;
            font-family: var(--vscode-font-family, -apple-system, 'Segoe UI', sans-serif);
            background: var(--vscode-editor-background, #ffffff);
            color: var(--vscode-editor-foreground, #1e293b);
        }}

        .header {{
            text-align: center;
            margin-bottom: 30px;
            border-bottom: 1px solid var(--vscode-panel-border, #e2e8f0);
            padding-bottom: 20px;
        }}

        .stats {{
            display: grid;
            grid-template-columns: repeat(3, 1fr);
            gap: 15px;
            margin-bottom: 30px;
        }}

        .stat-card {{
            padding: 15px;
            border-radius: 5px;
            text-align: center;
        }}

        .stat-high {{ background: color-mix(in srgb, #dc3545 20%, transparent); border: 1px solid #dc3545; }}
        .stat-medium {{ background: color-mix(in srgb, #ffc107 20%, transparent); border: 1px solid #ffc107; }}
        .stat-low {{ background: color-mix(in srgb, #28a745 20%, transparent); border: 1px solid #28a745; }}

        .violation {{
            margin: 10px 0;
            padding: 15px;
            border-left: 4px solid #6c757d;
            border-radius: 4px;
            background: var(--vscode-editorWidget-background, #f8fafc);
        }}

        .violation.high {{ border-color: #dc3545; }}
        .violation.medium {{ border-color: #ffc107; }}
        .violation.low {{ border-color: #28a745; }}

        .rule-id {{
            font-family: monospace;
            background: var(--vscode-textCodeBlock-background, #e2e8f0);
            padding: 2px 6px;
            border-radius: 3px;
            margin-right: 10px;
        }}

        .empty {{
            text-align: center;
            padding: 40px;
        }}
    </style>
</head>
<body>
    <div class="header">
        <h1>🔍 Отчет</h1>
        <p>Файл: {document}</p>
        <p>Сгенерирован: {generated_at}</p>
    </div>

    <div class="stats">
        <div class="stat-card stat-high">
            <h3>🔴 High</h3>
            <h2>{high}</h2>
        </div>
        <div class="stat-card stat-medium">
            <h3>🟡 Medium</h3>
            <h2>{medium}</h2>
        </div>
        <div class="stat-card stat-low">
            <h3>🔵 Low</h3>
            <h2>{low}</h2>
        </div>
    </div>

    <h2>Нарушения (всего {total}):</h2>
    {findings_html}
</body>
</html>"#,
        title = escape_html(&messages::report_title(&base_name(&summary.document))),
        document = escape_html(&summary.document),
        generated_at = generated_at.format("%d.%m.%Y, %H:%M:%S"),
        high = summary.high,
        medium = summary.medium,
        low = summary.low,
        total = summary.total,
        findings_html = findings_html,
    )
}

fn render_finding(finding: &Finding) -> String {
    let mut context = String::new();
    if let Some(play) = finding.play.as_deref().filter(|p| !p.is_empty()) {
        context.push_str(&format!(
            "\n        <p><strong>Плейбук:</strong> {}</p>",
            escape_html(play)
        ));
    }
    if let Some(task) = finding.task.as_deref().filter(|t| !t.is_empty()) {
        context.push_str(&format!(
            "\n        <p><strong>Задача:</strong> {}</p>",
            escape_html(task)
        ));
    }

    format!(
        r#"<div class="violation {class}">
        <div>
            <span class="rule-id">{rule_id}</span>
            <strong>{severity}</strong>
        </div>
        <p>{message}</p>{context}
    </div>"#,
        class = escape_html(&finding.severity.css_class()),
        rule_id = escape_html(&finding.rule_id),
        severity = escape_html(finding.severity.label()),
        message = escape_html(&finding.message),
        context = context,
    )
}

fn base_name(document: &str) -> String {
    std::path::Path::new(document)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| document.to_string())
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
