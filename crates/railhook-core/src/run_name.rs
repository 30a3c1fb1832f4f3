//! Run-name templating.

use chrono::Utc;

/// Replaced with the current UTC date and time.
pub const TEMPLATE_DATE: &str = "#{date}";
/// Replaced with the current unix timestamp in milliseconds.
pub const TEMPLATE_TIMESTAMP: &str = "#{timestamp}";
/// Replaced with the suite name, when one is available.
pub const TEMPLATE_SUITE: &str = "#{suite}";

/// Fill a run-name template's placeholders.
///
/// `#{suite}` is left untouched when no suite name is supplied, so the run
/// name still shows that resolution failed rather than silently collapsing.
pub fn format_run_name(template: &str, suite_name: Option<&str>) -> String {
    let now = Utc::now();

    let mut name = template.replace(
        TEMPLATE_DATE,
        &now.format("%Y/%m/%d %H:%M:%S UTC").to_string(),
    );
    name = name.replace(TEMPLATE_TIMESTAMP, &now.timestamp_millis().to_string());

    if let Some(suite) = suite_name {
        name = name.replace(TEMPLATE_SUITE, suite);
    }

    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn date_placeholder_is_replaced_with_utc_timestamp() {
        let name = format_run_name("Run #{date}", None);
        let pattern = Regex::new(r"^Run \d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2} UTC$").unwrap();
        assert!(pattern.is_match(&name), "unexpected name: {}", name);
    }

    #[test]
    fn timestamp_placeholder_is_numeric_millis() {
        let name = format_run_name("#{timestamp}", None);
        let millis: i64 = name.parse().expect("timestamp should be numeric");
        assert!(millis > 1_500_000_000_000);
    }

    #[test]
    fn suite_placeholder_uses_supplied_name() {
        assert_eq!(
            format_run_name("Run for #{suite}", Some("Checkout")),
            "Run for Checkout"
        );
    }

    #[test]
    fn suite_placeholder_is_kept_without_a_name() {
        assert_eq!(format_run_name("Run for #{suite}", None), "Run for #{suite}");
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        assert_eq!(format_run_name("Static name", Some("Checkout")), "Static name");
    }

    #[test]
    fn repeated_placeholders_are_all_replaced() {
        let name = format_run_name("#{suite} / #{suite}", Some("API"));
        assert_eq!(name, "API / API");
    }
}
