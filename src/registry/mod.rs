//! Subscription registry and channel directory.
//!
//! The registry owns every live subscription (id -> record) and the
//! channel directory groups the same records by channel name. Both sit
//! behind one lock:
//! - subscribe/unsubscribe/reap take it exclusively
//! - publish and poll share it
//!
//! Each subscription's queue has its own mutex, so appends and drains on
//! different subscriptions never wait on each other.

mod directory;
mod manager;
mod subscription;

pub use directory::{ChannelDirectory, ChannelEntry};
pub use manager::{RegistryState, SubscriptionRegistry};
pub use subscription::Subscription;
