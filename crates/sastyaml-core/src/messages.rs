//! User-facing phrasing of analysis outcomes.
//!
//! Messages are in Russian; counts follow Russian grammatical number
//! (one / few / many), chosen from the last one and two digits.

use crate::analyzer::finding::AnalysisResult;

/// The three grammatical-number forms of a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluralForms {
    pub one: &'static str,
    pub few: &'static str,
    pub many: &'static str,
}

pub const VIOLATION: PluralForms = PluralForms {
    one: "нарушение",
    few: "нарушения",
    many: "нарушений",
};

pub const CRITICAL: PluralForms = PluralForms {
    one: "критическое",
    few: "критических",
    many: "критических",
};

pub const STATUS_ANALYZING: &str = "🔍 Анализ безопасности плейбука";
pub const NO_FINDINGS: &str = "Нарушений безопасности не обнаружено";
pub const NOTHING_TO_ANALYZE: &str = "Нет открытых плейбуков для анализа";
pub const SHOW_REPORT_ACTION: &str = "Показать отчёт";

/// Pick the form of a word that agrees with `count`.
pub fn plural_form(count: usize, forms: PluralForms) -> &'static str {
    let last = count % 10;
    let last_two = count % 100;

    if last == 1 && last_two != 11 {
        forms.one
    } else if (2..=4).contains(&last) && !(10..20).contains(&last_two) {
        forms.few
    } else {
        forms.many
    }
}

/// `"<count> <word>"` with the word in the agreeing form.
pub fn count_phrase(count: usize, forms: PluralForms) -> String {
    format!("{} {}", count, plural_form(count, forms))
}

/// Summary shown after an interactive analysis that found something.
pub fn findings_summary(result: &AnalysisResult, base_name: &str) -> String {
    format!(
        "Найдено {} безопасности ({}) в файле {}",
        count_phrase(result.len(), VIOLATION),
        count_phrase(result.high_count(), CRITICAL),
        base_name
    )
}

pub fn analysis_failed(error: &dyn std::fmt::Display) -> String {
    format!("Ошибка в результате SAST-анализе: {error}")
}

pub fn report_title(base_name: &str) -> String {
    format!("Отчет - {base_name}")
}
