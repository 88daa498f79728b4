//! Randomized stand-ins for real security tooling.
//!
//! Every generator takes the random source as an argument so callers decide
//! between `thread_rng` and a seeded generator.

pub mod catalogue;
pub mod nmap;
pub mod payload;
pub mod pcap;

pub use self::catalogue::{sample_cves, SETUP_GUIDE};
pub use self::nmap::{generate_scan, ScanResult};
pub use self::payload::{generate_payload_response, PayloadResponse, PayloadType};
pub use self::pcap::{generate_capture, PcapData};
