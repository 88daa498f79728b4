use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const EVIDENCE_PREVIEW_CHARS: usize = 50;

const FAILURE_STATUS_CODES: [u16; 3] = [400, 403, 500];
const SERVERS: [&str; 3] = ["Apache/2.4.41", "nginx/1.18.0", "IIS/10.0"];
const POWERED_BY: [&str; 3] = ["PHP/7.4.3", "ASP.NET", "Express"];
const DATABASES: [&str; 3] = ["MySQL", "PostgreSQL", "MSSQL"];

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PayloadType {
    Xss,
    Sqli,
    Csrf,
    Lfi,
    Rfi,
}

impl PayloadType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Xss => "xss",
            Self::Sqli => "sqli",
            Self::Csrf => "csrf",
            Self::Lfi => "lfi",
            Self::Rfi => "rfi",
        }
    }

    /// Probability that a simulated attempt of this type lands.
    #[must_use]
    pub const fn success_rate(self) -> f64 {
        match self {
            Self::Xss => 0.7,
            Self::Sqli => 0.6,
            Self::Csrf => 0.5,
            Self::Lfi => 0.4,
            Self::Rfi => 0.3,
        }
    }
}

impl std::fmt::Display for PayloadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeaders {
    #[serde(rename = "Content-Type")]
    pub content_type: String,
    #[serde(rename = "Server")]
    pub server: String,
    #[serde(rename = "X-Powered-By")]
    pub powered_by: String,
}

/// What the simulated target answered.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PayloadResponse {
    pub status_code: u16,
    pub response_time: String,
    pub content_length: u32,
    pub headers: ResponseHeaders,
    pub vulnerability_detected: bool,
    pub evidence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_type: Option<String>,
}

struct Outcome {
    evidence: String,
    risk_level: &'static str,
    recommendation: &'static str,
    database_type: Option<String>,
}

fn preview(payload: &str) -> String {
    payload.chars().take(EVIDENCE_PREVIEW_CHARS).collect()
}

fn success_outcome<R: Rng + ?Sized>(
    rng: &mut R,
    payload_type: PayloadType,
    payload: &str,
) -> Outcome {
    match payload_type {
        PayloadType::Xss => Outcome {
            evidence: format!("Script executed: {}...", preview(payload)),
            risk_level: "high",
            recommendation: "Implement input validation and output encoding",
            database_type: None,
        },
        PayloadType::Sqli => Outcome {
            evidence: "Database error revealed".to_string(),
            risk_level: "critical",
            recommendation: "Use parameterized queries",
            database_type: DATABASES.choose(rng).map(ToString::to_string),
        },
        PayloadType::Csrf => Outcome {
            evidence: "State-changing request accepted without an anti-CSRF token".to_string(),
            risk_level: "medium",
            recommendation: "Require anti-CSRF tokens and SameSite cookies",
            database_type: None,
        },
        PayloadType::Lfi => Outcome {
            evidence: "Local file contents disclosed in response".to_string(),
            risk_level: "high",
            recommendation: "Resolve file paths against an allow-list",
            database_type: None,
        },
        PayloadType::Rfi => Outcome {
            evidence: "Remote resource was fetched and included".to_string(),
            risk_level: "critical",
            recommendation: "Disable remote includes and validate URLs",
            database_type: None,
        },
    }
}

/// (evidence, protection)
const fn failure_outcome(payload_type: PayloadType) -> (&'static str, &'static str) {
    match payload_type {
        PayloadType::Xss => ("Script was filtered or encoded", "WAF or input filtering detected"),
        PayloadType::Sqli => (
            "No database errors detected",
            "Parameterized queries or WAF protection",
        ),
        PayloadType::Csrf => (
            "Request rejected: missing or invalid CSRF token",
            "Anti-CSRF token validation",
        ),
        PayloadType::Lfi => (
            "Path traversal sequences were stripped",
            "Input path normalization",
        ),
        PayloadType::Rfi => ("Remote include was blocked", "Remote file inclusion disabled"),
    }
}

/// Simulate firing `payload` at a target and describe the response.
pub fn generate_payload_response<R: Rng + ?Sized>(
    rng: &mut R,
    payload_type: PayloadType,
    payload: &str,
) -> PayloadResponse {
    let detected = rng.gen_bool(payload_type.success_rate());

    let status_code = if detected {
        200
    } else {
        FAILURE_STATUS_CODES.choose(rng).copied().unwrap_or(403)
    };

    let headers = ResponseHeaders {
        content_type: "text/html; charset=utf-8".to_string(),
        server: SERVERS.choose(rng).copied().unwrap_or(SERVERS[0]).to_string(),
        powered_by: POWERED_BY.choose(rng).copied().unwrap_or(POWERED_BY[0]).to_string(),
    };

    let mut response = PayloadResponse {
        status_code,
        response_time: format!("{:.2}s", rng.gen_range(0.1..3.0)),
        content_length: rng.gen_range(500..=5000),
        headers,
        vulnerability_detected: detected,
        evidence: String::new(),
        risk_level: None,
        recommendation: None,
        protection: None,
        database_type: None,
    };

    if detected {
        let outcome = success_outcome(rng, payload_type, payload);
        response.evidence = outcome.evidence;
        response.risk_level = Some(outcome.risk_level.to_string());
        response.recommendation = Some(outcome.recommendation.to_string());
        response.database_type = outcome.database_type;
    } else {
        let (evidence, protection) = failure_outcome(payload_type);
        response.evidence = evidence.to_string();
        response.protection = Some(protection.to_string());
    }

    response
}
