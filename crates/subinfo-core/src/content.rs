//! Node-list content sniffing.
//!
//! A subscription body is either a structured document (Clash-style YAML with a
//! `proxies` sequence) or a base64 blob of `scheme://...` lines.

use base64::prelude::*;
use serde::Deserialize;

use crate::region::RegionHistogram;

const STRUCTURED_TOKEN: &str = "proxies";
const NODE_URI_MARKER: &str = "://";

/// Node count plus a human-readable breakdown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeSummary {
    pub count: usize,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentKind {
    StructuredList { regions: RegionHistogram },
    GenericEncodedList { count: usize },
    Unrecognized,
}

impl ContentKind {
    pub fn summary(&self) -> Option<NodeSummary> {
        match self {
            ContentKind::StructuredList { regions } => Some(NodeSummary {
                count: regions.total(),
                detail: regions.to_string(),
            }),
            ContentKind::GenericEncodedList { count } => Some(NodeSummary {
                count: *count,
                detail: format!("{count} generic nodes"),
            }),
            ContentKind::Unrecognized => None,
        }
    }
}

#[derive(Deserialize)]
struct StructuredDocument {
    proxies: Vec<ProxyEntry>,
}

#[derive(Deserialize)]
struct ProxyEntry {
    #[serde(default)]
    name: String,
}

pub fn classify(body: &str) -> ContentKind {
    if body.contains(STRUCTURED_TOKEN) {
        if let Some(regions) = parse_structured(body) {
            return ContentKind::StructuredList { regions };
        }
    }

    match count_encoded_nodes(body) {
        Some(count) if count > 0 => ContentKind::GenericEncodedList { count },
        _ => ContentKind::Unrecognized,
    }
}

fn parse_structured(body: &str) -> Option<RegionHistogram> {
    let doc: StructuredDocument = serde_yaml::from_str(body).ok()?;
    Some(RegionHistogram::from_names(
        doc.proxies.iter().map(|p| p.name.as_str()),
    ))
}

fn count_encoded_nodes(body: &str) -> Option<usize> {
    let mut compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }
    let missing = compact.len() % 4;
    if missing != 0 {
        compact.push_str(&"=".repeat(4 - missing));
    }

    let decoded = BASE64_STANDARD
        .decode(compact.as_bytes())
        .or_else(|_| BASE64_URL_SAFE.decode(compact.as_bytes()))
        .ok()?;
    let text = String::from_utf8(decoded).ok()?;

    Some(
        text.lines()
            .filter(|line| line.contains(NODE_URI_MARKER))
            .count(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_list_builds_region_histogram() {
        let body = "port: 7890\nproxies:\n  - name: HK-01\n    type: ss\n  - name: TW-02\n    type: vmess\n  - name: Unknown-03\n    type: trojan\n";
        let kind = classify(body);
        let summary = kind.summary().unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.detail, "Hong Kong:1 | Taiwan:1 | Other:1");
    }

    #[test]
    fn structured_list_accepts_flow_style_entries() {
        let body = "proxies:\n  - {name: \"🇯🇵 Tokyo\", type: ss, server: a.example}\n  - {name: jp-2, type: ss}\n";
        let summary = classify(body).summary().unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.detail, "Japan:2");
    }

    #[test]
    fn encoded_list_counts_uri_lines() {
        let plain = "ss://abc@host:1#HK\nvmess://xyz\nnot a node\ntrojan://pw@h:443\n";
        let body = BASE64_STANDARD.encode(plain);
        assert_eq!(classify(&body), ContentKind::GenericEncodedList { count: 3 });
        assert_eq!(
            classify(&body).summary().unwrap().detail,
            "3 generic nodes"
        );
    }

    #[test]
    fn encoded_list_tolerates_missing_padding_and_line_wraps() {
        let plain = "ss://a\nss://b";
        let encoded = BASE64_STANDARD.encode(plain);
        let trimmed = encoded.trim_end_matches('=');
        let wrapped = format!("{}\n{}", &trimmed[..4], &trimmed[4..]);
        assert_eq!(classify(&wrapped), ContentKind::GenericEncodedList { count: 2 });
    }

    #[test]
    fn encoded_list_without_uris_is_unrecognized() {
        let body = BASE64_STANDARD.encode("hello\nworld\n");
        assert_eq!(classify(&body), ContentKind::Unrecognized);
        assert!(classify(&body).summary().is_none());
    }

    #[test]
    fn garbage_is_unrecognized() {
        assert_eq!(classify("<html>403 Forbidden</html>"), ContentKind::Unrecognized);
        assert_eq!(classify(""), ContentKind::Unrecognized);
        assert_eq!(classify("proxies: [unterminated"), ContentKind::Unrecognized);
    }

    #[test]
    fn empty_structured_list_has_zero_nodes() {
        let kind = classify("proxies: []\n");
        assert_eq!(
            kind.summary(),
            Some(NodeSummary {
                count: 0,
                detail: String::new(),
            })
        );
    }

    #[test]
    fn encoded_blob_mentioning_proxies_falls_back_to_base64() {
        // Decodes to "ss://xa\n" followed by non-node text; the raw blob
        // happens to spell "proxies".
        let body = "c3M6Ly94YQrproxiesKg";
        assert!(body.contains(STRUCTURED_TOKEN));
        assert_eq!(classify(body), ContentKind::GenericEncodedList { count: 1 });
    }
}
