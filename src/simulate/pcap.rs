use chrono::{DateTime, Utc};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

const PROTOCOLS: [&str; 7] = ["TCP", "UDP", "HTTP", "HTTPS", "DNS", "ICMP", "ARP"];
const INTERFACES: [&str; 3] = ["eth0", "wlan0", "en0"];

const SAMPLE_PACKETS: [&str; 5] = [
    "14:23:45.123456 192.168.1.100.54321 > 192.168.1.1.80: Flags [S], seq 123456789",
    "14:23:45.125678 192.168.1.1.80 > 192.168.1.100.54321: Flags [S.], seq 987654321, ack 123456790",
    "14:23:45.126789 192.168.1.100.54321 > 192.168.1.1.80: Flags [.], ack 987654322",
    "14:23:45.130456 192.168.1.100.54321 > 192.168.1.1.80: Flags [P.], seq 123456790:123456890",
    "14:23:45.135789 192.168.1.1.80 > 192.168.1.100.54321: Flags [.], ack 123456890",
];

/// Summary of a capture that never happened.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PcapData {
    pub filename: String,
    pub size: u32,
    pub packets: u32,
    pub protocol_breakdown: BTreeMap<String, u32>,
    pub sample_data: String,
    pub duration: String,
    pub capture_interface: String,
}

/// Draw a per-protocol count for each protocol, then scale the draws so they
/// add up to at most `total`.
fn breakdown<R: Rng + ?Sized>(rng: &mut R, total: u32) -> BTreeMap<String, u32> {
    let draws: Vec<(&str, u64)> = PROTOCOLS
        .iter()
        .map(|&protocol| (protocol, u64::from(rng.gen_range(10..=total / 3))))
        .collect();

    let drawn: u64 = draws.iter().map(|(_, count)| count).sum();

    draws
        .into_iter()
        .map(|(protocol, count)| {
            let scaled = count * u64::from(total) / drawn.max(1);
            (protocol.to_string(), u32::try_from(scaled).unwrap_or(total))
        })
        .collect()
}

/// Fabricate capture statistics stamped with `now`.
pub fn generate_capture<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> PcapData {
    let packets = rng.gen_range(1000..=10_000);

    PcapData {
        filename: format!("capture_{}.pcap", now.format("%Y%m%d_%H%M%S")),
        size: rng.gen_range(1024..=1_048_576),
        packets,
        protocol_breakdown: breakdown(rng, packets),
        sample_data: SAMPLE_PACKETS.join("\n"),
        duration: format!("{}s", rng.gen_range(30..=3600)),
        capture_interface: INTERFACES
            .choose(rng)
            .copied()
            .unwrap_or(INTERFACES[0])
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::{rngs::StdRng, SeedableRng};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 14, 23, 45)
            .single()
            .unwrap_or_else(Utc::now)
    }

    #[test]
    fn protocol_counts_never_exceed_total() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let capture = generate_capture(&mut rng, fixed_now());
            assert!((1000..=10_000).contains(&capture.packets));
            assert_eq!(capture.protocol_breakdown.len(), PROTOCOLS.len());
            let sum: u32 = capture.protocol_breakdown.values().sum();
            assert!(sum <= capture.packets, "{sum} > {}", capture.packets);
        }
    }

    #[test]
    fn capture_metadata() {
        let mut rng = StdRng::seed_from_u64(11);
        let capture = generate_capture(&mut rng, fixed_now());
        assert_eq!(capture.filename, "capture_20240305_142345.pcap");
        assert!((1024..=1_048_576).contains(&capture.size));
        assert_eq!(capture.sample_data.lines().count(), 5);
        assert!(INTERFACES.contains(&capture.capture_interface.as_str()));

        let seconds: u32 = capture
            .duration
            .trim_end_matches('s')
            .parse()
            .unwrap_or_default();
        assert!((30..=3600).contains(&seconds));
    }
}
