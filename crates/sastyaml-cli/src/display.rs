use colored::*;
use sastyaml_core::report::RuleTally;
use sastyaml_core::{DiagnosticSeverity, DocumentDiagnostic, Finding, ReportSummary, Severity};

/// Print diagnostics as `path:line:col severity [code] message`, one per line.
pub fn print_diagnostics(document: &str, diagnostics: &[DocumentDiagnostic]) {
    if diagnostics.is_empty() {
        println!(" {} {}", "OK".green().bold(), document);
        return;
    }

    for diagnostic in diagnostics {
        println!("{}", format_diagnostic(document, diagnostic));
    }
}

/// One diagnostic line. Line and column are shown 1-based.
pub fn format_diagnostic(document: &str, diagnostic: &DocumentDiagnostic) -> String {
    let location = format!(
        "{}:{}:{}",
        document,
        diagnostic.range.start.line + 1,
        diagnostic.range.start.character + 1
    );
    let severity = match diagnostic.severity {
        DiagnosticSeverity::Error => diagnostic.severity.label().red().bold(),
        DiagnosticSeverity::Warning => diagnostic.severity.label().yellow().bold(),
        DiagnosticSeverity::Information => diagnostic.severity.label().blue().bold(),
        DiagnosticSeverity::Hint => diagnostic.severity.label().dimmed(),
    };
    format!("{} {} {}", location.bold(), severity, diagnostic.message)
}

pub fn print_status(text: &str) {
    println!(" {}", text.dimmed());
}

pub fn print_information(text: &str) {
    println!(" {} {}", "OK".green().bold(), text);
}

pub fn print_warning(text: &str) {
    println!(" {} {}", "!".yellow().bold(), text);
}

pub fn print_error(text: &str) {
    eprintln!(" {} {}", "ERROR".red().bold(), text);
}

/// Print the report summary in the terminal, grouped by severity.
pub fn print_text_report(summary: &ReportSummary) {
    println!();
    println!(
        "{}",
        format!(
            " SAST YAML v{} | {}",
            env!("CARGO_PKG_VERSION"),
            summary.document
        )
        .bold()
    );
    println!();

    if summary.is_empty() {
        println!(" {} Нарушений не обнаружено!", "OK".green().bold());
    } else {
        for (severity, count) in [
            (Severity::High, summary.high),
            (Severity::Medium, summary.medium),
            (Severity::Low, summary.low),
        ] {
            if count == 0 {
                continue;
            }
            println!(" {} ({})", severity_tag(&severity), count);
            for finding in summary.findings.iter().filter(|f| f.severity == severity) {
                print_finding(finding);
            }
            println!();
        }

        let other: Vec<&Finding> = summary
            .findings
            .iter()
            .filter(|f| matches!(f.severity, Severity::Other(_)))
            .collect();
        if !other.is_empty() {
            println!(" {} ({})", " OTHER ".dimmed(), other.len());
            for finding in other {
                print_finding(finding);
            }
            println!();
        }
    }

    println!(" {}", "=".repeat(60).dimmed());
    if !summary.by_rule.is_empty() {
        println!(" {}", "Rules".bold().underline());
        for tally in &summary.by_rule {
            print_tally(tally);
        }
    }
    println!(" Всего нарушений: {}", summary.total.to_string().bold());
    println!();
}

fn severity_tag(severity: &Severity) -> String {
    let label = format!(" {} ", severity.label());
    match severity {
        Severity::High => label.on_red().white().bold().to_string(),
        Severity::Medium => label.on_yellow().black().bold().to_string(),
        Severity::Low => label.on_blue().white().bold().to_string(),
        Severity::Other(_) => label.dimmed().to_string(),
    }
}

fn print_finding(finding: &Finding) {
    println!("   {} {}: {}", "|".dimmed(), finding.rule_id.bold(), finding.message);
    if let Some(play) = finding.play.as_deref().filter(|p| !p.is_empty()) {
        println!("   {}   Плейбук: {}", "|".dimmed(), play.cyan());
    }
    if let Some(task) = finding.task.as_deref().filter(|t| !t.is_empty()) {
        println!("   {}   Задача: {}", "|".dimmed(), task.cyan());
    }
}

fn print_tally(tally: &RuleTally) {
    println!(
        " {} {} x{} {}",
        "|-".dimmed(),
        tally.rule_id.bold(),
        tally.count,
        tally.description.dimmed()
    );
}
