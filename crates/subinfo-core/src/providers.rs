//! Provider display names.
//!
//! The table is a newline-delimited `keyword=Display Name` list, loaded once at
//! startup and read-only afterwards. A URL resolves to the first entry whose
//! keyword is a substring of it.

use crate::http::SubscriptionTransport;

pub const UNKNOWN_PROVIDER: &str = "Unknown provider";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderTable {
    entries: Vec<(String, String)>,
}

impl ProviderTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Self {
        let mut table = Self::default();
        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((k, v)) = line.split_once('=') else {
                continue;
            };
            let key = k.trim();
            if key.is_empty() {
                continue;
            }
            table.insert(key, v.trim());
        }
        table
    }

    /// Insert or update; an existing keyword keeps its position.
    pub fn insert(&mut self, key: &str, name: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = name.to_string(),
            None => self.entries.push((key.to_string(), name.to_string())),
        }
    }

    pub fn resolve(&self, url: &str) -> &str {
        self.entries
            .iter()
            .find(|(k, _)| url.contains(k.as_str()))
            .map(|(_, v)| v.as_str())
            .unwrap_or(UNKNOWN_PROVIDER)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fetch and parse the remote table.
///
/// Never fails: any transport error degrades to an empty table with a warning,
/// so every provider resolves to [`UNKNOWN_PROVIDER`].
pub async fn load_remote(transport: &dyn SubscriptionTransport, url: &str) -> ProviderTable {
    match transport.fetch_body(url).await {
        Ok(body) => {
            let table = ProviderTable::parse(&body);
            tracing::info!(entries = table.len(), "loaded provider mappings");
            table
        }
        Err(e) => {
            tracing::warn!(%url, error = %e, "failed to load provider mappings; continuing without names");
            ProviderTable::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_comments_blank_and_invalid_lines() {
        let t = ProviderTable::parse(
            "# airport names\n\nnana=Nana Cloud\nnot a mapping\n=Empty Key\n  sub.example = Example  \n",
        );
        assert_eq!(t.len(), 2);
        assert_eq!(t.resolve("https://sub.example/api?token=1"), "Example");
        assert_eq!(t.resolve("https://nana.io/s/abc"), "Nana Cloud");
    }

    #[test]
    fn first_matching_entry_wins_in_insertion_order() {
        let t = ProviderTable::parse("example=First\nexample.com=Second\n");
        assert_eq!(t.resolve("https://example.com/sub"), "First");
    }

    #[test]
    fn duplicate_key_updates_name_but_keeps_position() {
        let t = ProviderTable::parse("aaa=One\nbbb=Two\naaa=Three\n");
        assert_eq!(t.len(), 2);
        assert_eq!(t.resolve("https://aaa.bbb/"), "Three");
    }

    #[test]
    fn unmatched_url_resolves_to_sentinel() {
        let t = ProviderTable::parse("foo=Foo");
        assert_eq!(t.resolve("https://bar.example/"), UNKNOWN_PROVIDER);
        assert_eq!(ProviderTable::empty().resolve("https://x/"), UNKNOWN_PROVIDER);
    }
}
