// src/utils/log.rs

//! Console formatting for the CLI.
//!
//! Lines go through the `log` facade so `env_logger` owns timestamps and
//! filtering; these helpers only shape the text.

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("[STEP {}/{}] {}", step_num, total, message);
}

/// Log a separator line
pub fn separator() {
    log::info!("{}", "─".repeat(60));
}

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    log::info!("    {}", message);
}

/// Format summary items as aligned `key: value` lines.
pub fn format_summary(title: &str, items: &[(&str, String)]) -> Vec<String> {
    let width = items.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let mut lines = vec![format!("[SUMMARY] {}", title)];
    lines.extend(
        items
            .iter()
            .map(|(key, value)| format!("    {:<width$} : {}", key, value, width = width)),
    );
    lines
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    for line in format_summary(title, items) {
        log::info!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_summary_aligns_keys() {
        let lines = format_summary(
            "Run",
            &[("found", "3".to_string()), ("created", "2".to_string())],
        );
        assert_eq!(lines[0], "[SUMMARY] Run");
        assert_eq!(lines[1], "    found   : 3");
        assert_eq!(lines[2], "    created : 2");
    }
}
