/// Stream record and query types
///
/// Upstream payloads are frequently partially populated, so every field
/// except `id` defaults when absent. Validity is enforced by the accessor's
/// defensive filter, not by deserialization.
use serde::{Deserialize, Serialize};

/// One payment stream as reported by the upstream API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    #[serde(default)]
    pub id: String,

    /// Wallet receiving the stream
    #[serde(default)]
    pub recipient: String,

    /// Wallet funding the stream
    #[serde(default)]
    pub sender: String,

    /// Token mint being streamed
    #[serde(default)]
    pub mint: String,

    #[serde(default)]
    pub deposited_amount: u64,

    #[serde(default)]
    pub withdrawn_amount: u64,

    /// Unix timestamps (seconds)
    #[serde(default)]
    pub start_time: i64,

    #[serde(default)]
    pub end_time: i64,

    #[serde(default)]
    pub cancelable: bool,
}

impl StreamRecord {
    /// Amount still locked in the stream
    pub fn remaining_amount(&self) -> u64 {
        self.deposited_amount.saturating_sub(self.withdrawn_amount)
    }
}

/// One logical query kind; determines the cache key prefix and the upstream
/// filter parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamQuery {
    ByRecipient(String),
    ByMint(String),
}

impl StreamQuery {
    /// Cache key: query kind prefix + argument
    pub fn cache_key(&self) -> String {
        match self {
            StreamQuery::ByRecipient(wallet) => format!("recipient:{}", wallet),
            StreamQuery::ByMint(mint) => format!("mint:{}", mint),
        }
    }

    /// Upstream query parameter name
    pub fn param_name(&self) -> &'static str {
        match self {
            StreamQuery::ByRecipient(_) => "recipient",
            StreamQuery::ByMint(_) => "mint",
        }
    }

    /// Queried value
    pub fn param_value(&self) -> &str {
        match self {
            StreamQuery::ByRecipient(wallet) => wallet,
            StreamQuery::ByMint(mint) => mint,
        }
    }

    /// Short name for logs
    pub fn label(&self) -> &'static str {
        match self {
            StreamQuery::ByRecipient(_) => "streams_by_recipient",
            StreamQuery::ByMint(_) => "streams_by_mint",
        }
    }

    /// Exact-match check against the queried field.
    ///
    /// The upstream occasionally returns near-matches, so every record is
    /// re-checked before it is cached or returned.
    pub fn matches(&self, record: &StreamRecord) -> bool {
        match self {
            StreamQuery::ByRecipient(wallet) => record.recipient == *wallet,
            StreamQuery::ByMint(mint) => record.mint == *mint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_keys_are_kind_prefixed() {
        let by_recipient = StreamQuery::ByRecipient("walletX".to_string());
        let by_mint = StreamQuery::ByMint("walletX".to_string());
        assert_ne!(by_recipient.cache_key(), by_mint.cache_key());
    }

    #[test]
    fn partial_payload_deserializes_with_defaults() {
        let record: StreamRecord =
            serde_json::from_str(r#"{"id":"s1","recipient":"X"}"#).unwrap();
        assert_eq!(record.id, "s1");
        assert_eq!(record.mint, "");
        assert_eq!(record.deposited_amount, 0);
    }

    #[test]
    fn remaining_amount_saturates() {
        let record = StreamRecord {
            id: "s1".to_string(),
            deposited_amount: 5,
            withdrawn_amount: 9,
            ..serde_json::from_str("{}").unwrap()
        };
        assert_eq!(record.remaining_amount(), 0);
    }
}
