//! Subscription usage accounting.
//!
//! Providers report traffic through the `subscription-userinfo` response
//! header, e.g. `upload=100; download=200; total=1000; expire=1735689600`.

/// Response header carrying the usage counters.
pub const USAGE_HEADER: &str = "subscription-userinfo";

/// Traffic counters reported by a subscription provider.
///
/// `expire_epoch_seconds == 0` means the subscription never expires (or the
/// provider did not say).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UsageInfo {
    pub upload_bytes: u64,
    pub download_bytes: u64,
    pub total_bytes: u64,
    pub expire_epoch_seconds: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("invalid value for `{key}`: {value:?}")]
    InvalidNumber { key: String, value: String },
}

impl UsageInfo {
    /// Parse a usage header value.
    ///
    /// Keys are case-insensitive, unknown keys and segments without `=` are
    /// ignored, missing keys default to 0.
    pub fn parse_header(raw: &str) -> Result<Self, HeaderError> {
        let mut info = Self::default();

        for part in raw.split(';') {
            let Some((k, v)) = part.split_once('=') else {
                continue;
            };
            let key = k.trim().to_ascii_lowercase();
            let slot = match key.as_str() {
                "upload" => &mut info.upload_bytes,
                "download" => &mut info.download_bytes,
                "total" => &mut info.total_bytes,
                "expire" => &mut info.expire_epoch_seconds,
                _ => continue,
            };

            let value = v.trim();
            *slot = value
                .parse::<u64>()
                .map_err(|_| HeaderError::InvalidNumber {
                    key,
                    value: value.to_string(),
                })?;
        }

        Ok(info)
    }

    pub fn used_bytes(&self) -> u64 {
        self.upload_bytes.saturating_add(self.download_bytes)
    }

    pub fn remaining_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.used_bytes())
    }

    /// Percentage of quota used, rounded to two decimals.
    ///
    /// Not clamped: stale headers can report more usage than quota.
    pub fn percent_used(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        let pct = self.used_bytes() as f64 / self.total_bytes as f64 * 100.0;
        (pct * 100.0).round() / 100.0
    }
}
