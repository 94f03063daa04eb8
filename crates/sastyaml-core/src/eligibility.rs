/// Returns true when `text` looks like a playbook: it declares `hosts:` and
/// at least one of `tasks:` or `roles:`.
///
/// This is a substring check only. Comments and quoted strings count.
pub fn is_playbook(text: &str) -> bool {
    text.contains("hosts:") && (text.contains("tasks:") || text.contains("roles:"))
}
