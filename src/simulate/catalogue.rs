use crate::db::Cve;
use chrono::{NaiveDate, TimeZone, Utc};

/// Markdown lab setup guide served by `/api/setup`.
pub const SETUP_GUIDE: &str = include_str!("setup_guide.md");

/// (id, description, severity, tags, published)
const SAMPLES: [(&str, &str, &str, &[&str], &str); 5] = [
    (
        "CVE-2024-1234",
        "Remote code execution vulnerability in Apache HTTP Server",
        "critical",
        &["rce", "apache", "web"],
        "2024-01-15",
    ),
    (
        "CVE-2024-5678",
        "SQL injection vulnerability in WordPress plugin",
        "high",
        &["sqli", "wordpress", "cms"],
        "2024-02-20",
    ),
    (
        "CVE-2024-9876",
        "Cross-site scripting (XSS) in popular JavaScript framework",
        "medium",
        &["xss", "javascript", "framework"],
        "2024-03-10",
    ),
    (
        "CVE-2024-4321",
        "Privilege escalation in Linux kernel",
        "high",
        &["privilege-escalation", "linux", "kernel"],
        "2024-01-28",
    ),
    (
        "CVE-2024-8765",
        "Buffer overflow in OpenSSL library",
        "critical",
        &["buffer-overflow", "openssl", "cryptography"],
        "2024-03-05",
    ),
];

/// Catalogue used to seed an empty `cves` collection.
#[must_use]
pub fn sample_cves() -> Vec<Cve> {
    SAMPLES
        .iter()
        .filter_map(|&(id, description, severity, tags, published)| {
            let date = NaiveDate::parse_from_str(published, "%Y-%m-%d").ok()?;
            Some(Cve {
                id: id.to_string(),
                description: description.to_string(),
                severity: severity.to_string(),
                tags: tags.iter().map(ToString::to_string).collect(),
                reference: format!("https://nvd.nist.gov/vuln/detail/{id}"),
                published_date: Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?),
            })
        })
        .collect()
}
