//! # Postbox
//!
//! An in-process publish/subscribe core: clients subscribe to named
//! channels, producers publish documents, consumers poll to drain what
//! has accumulated for them.
//!
//! ## Core Concepts
//!
//! - **Channels**: Named topics, created implicitly by the first subscriber
//! - **Filters**: Per-subscription predicates (`{count: {gt: 3}}`)
//! - **Projections**: Per-subscription field whitelists (`{count: 1}`)
//! - **Queues**: Bounded FIFOs drained atomically by `poll`
//!
//! ## Example
//!
//! ```ignore
//! use postbox::{PubSub, PubSubConfig};
//! use serde_json::json;
//!
//! let pubsub = PubSub::new(PubSubConfig::default())?;
//!
//! let all = pubsub.subscribe("A", None, None)?;
//! let big = pubsub.subscribe(
//!     "A",
//!     Some(&json!({"count": {"gt": 3}})),
//!     Some(&json!({"count": 1})),
//! )?;
//!
//! for i in 0..6 {
//!     pubsub.publish_value("A", json!({"body": "hello", "count": i}))?;
//! }
//!
//! let result = pubsub.poll(&[all, big])?;
//! assert_eq!(result.documents(all, "A").len(), 6);
//! assert_eq!(result.documents(big, "A").len(), 2);
//! ```

pub mod broker;
pub mod command;
pub mod config;
pub mod error;
pub mod filter;
pub mod poll;
pub mod projection;
pub mod publish;
pub mod queue;
pub mod reaper;
pub mod registry;
pub mod types;

// Re-exports
pub use broker::PubSub;
pub use command::{run_command, Command};
pub use config::{OverflowPolicy, PubSubConfig};
pub use error::{PubSubError, Result};
pub use filter::{CompareOp, Predicate};
pub use poll::PollResult;
pub use projection::Projection;
pub use queue::{MessageQueue, PushOutcome};
pub use reaper::ReaperHandle;
pub use registry::{ChannelDirectory, SubscriptionRegistry};
pub use types::*;
