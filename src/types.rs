//! Core types for the pub/sub core.

use crate::error::PubSubError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A published document: ordered field name to value mapping.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Unique identifier for a subscription.
///
/// Rendered on the wire as 16 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

impl SubscriptionId {
    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_be_bytes())
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 8] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(SubscriptionId(u64::from_be_bytes(arr)))
    }
}

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.to_hex())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for SubscriptionId {
    type Err = PubSubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubscriptionId::from_hex(s).map_err(|_| PubSubError::InvalidSubscriptionId(s.to_string()))
    }
}

impl Serialize for SubscriptionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SubscriptionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Position of a publish within its channel.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Sequence(pub u64);

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seq({})", self.0)
    }
}

impl Sequence {
    pub fn next(self) -> Self {
        Sequence(self.0 + 1)
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time. Clocks before the epoch read as zero.
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0);
        Timestamp(micros)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// A document queued for one subscription.
#[derive(Clone, Debug)]
pub struct Message {
    /// Channel the document was published on.
    pub channel: Arc<str>,
    /// Channel-level publish sequence.
    pub sequence: Sequence,
    /// When the document was published.
    pub published_at: Timestamp,
    /// The (possibly projected) document. Shared when no projection applies.
    pub document: Arc<Document>,
}

/// Outcome of a single publish.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Sequence assigned on the channel, `None` if nobody was subscribed.
    pub sequence: Option<Sequence>,
    /// Subscriptions evaluated during fan-out.
    pub evaluated: usize,
    /// Queues the document was appended to.
    pub delivered: usize,
    /// Messages lost to the overflow policy during this publish.
    pub dropped: usize,
    /// Subscriptions closed by the `DropSubscriber` policy.
    pub closed: Vec<SubscriptionId>,
}

/// Read-only view of a registered subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionInfo {
    pub id: SubscriptionId,
    pub channel: String,
    pub has_filter: bool,
    pub has_projection: bool,
    /// Messages currently waiting to be polled.
    pub queued: usize,
    /// Messages evicted or refused by the overflow policy so far.
    pub dropped: u64,
    pub created: Timestamp,
}

/// Broker-wide counters.
#[derive(Clone, Debug, Default)]
pub struct PubSubStats {
    pub subscription_count: usize,
    pub channel_count: usize,
    pub queued_messages: usize,
}
