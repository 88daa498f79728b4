use chrono::{DateTime, Utc};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// (port, service, state, version)
const PORTS: [(u16, &str, &str, &str); 8] = [
    (22, "ssh", "open", "OpenSSH 8.2"),
    (80, "http", "open", "Apache 2.4.41"),
    (443, "https", "open", "Apache 2.4.41"),
    (3306, "mysql", "closed", ""),
    (8080, "http-proxy", "filtered", ""),
    (21, "ftp", "open", "vsftpd 3.0.3"),
    (25, "smtp", "open", "Postfix"),
    (53, "dns", "open", "ISC BIND 9.16"),
];

/// (name, version, accuracy)
const OPERATING_SYSTEMS: [(&str, &str, &str); 4] = [
    ("Linux", "Ubuntu 20.04", "95%"),
    ("Linux", "CentOS 8", "92%"),
    ("Windows", "Windows Server 2019", "88%"),
    ("Linux", "Debian 11", "90%"),
];

const PROTOCOL_VERSIONS: [&str; 3] = ["2.0", "1.1", "1.0"];

const MIN_PORTS: usize = 3;
const MAX_PORTS: usize = 6;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub port: u16,
    pub service: String,
    pub state: String,
    pub version: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OsInfo {
    pub name: String,
    pub version: String,
    pub accuracy: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub port: u16,
    pub service: String,
    pub product: String,
    pub extrainfo: String,
}

/// Nmap-style report for a single host.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub target: String,
    pub status: String,
    pub ports: Vec<PortInfo>,
    pub os_info: OsInfo,
    pub services: Vec<ServiceInfo>,
    pub scan_time: DateTime<Utc>,
    pub host_status: String,
    pub latency: String,
}

/// Build a plausible scan report for `target` without touching the network.
pub fn generate_scan<R: Rng + ?Sized>(rng: &mut R, target: &str) -> ScanResult {
    let count = rng.gen_range(MIN_PORTS..=MAX_PORTS);

    let ports: Vec<PortInfo> = PORTS
        .choose_multiple(rng, count)
        .map(|&(port, service, state, version)| PortInfo {
            port,
            service: service.to_string(),
            state: state.to_string(),
            version: version.to_string(),
        })
        .collect();

    let services = ports
        .iter()
        .filter(|p| p.state == "open")
        .map(|p| ServiceInfo {
            port: p.port,
            service: p.service.clone(),
            product: p.version.clone(),
            extrainfo: format!(
                "protocol {}",
                PROTOCOL_VERSIONS.choose(rng).copied().unwrap_or("1.0")
            ),
        })
        .collect();

    let (name, version, accuracy) = OPERATING_SYSTEMS
        .choose(rng)
        .copied()
        .unwrap_or(OPERATING_SYSTEMS[0]);

    ScanResult {
        target: target.to_string(),
        status: "completed".to_string(),
        ports,
        os_info: OsInfo {
            name: name.to_string(),
            version: version.to_string(),
            accuracy: accuracy.to_string(),
        },
        services,
        scan_time: Utc::now(),
        host_status: "up".to_string(),
        latency: format!("{:.2}ms", rng.gen_range(0.1..2.5)),
    }
}
