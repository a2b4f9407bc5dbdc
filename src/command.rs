//! JSON command documents.
//!
//! The command name is the first key of the document, the way the service
//! front end receives them:
//!
//! ```ignore
//! {subscribe: "A", filter: {count: {$gt: 3}}, projection: {count: 1}}
//! {publish: "A", message: {body: "hello", count: 4}}
//! {poll: ["000000000000000a", "000000000000000b"]}
//! {unsubscribe: "000000000000000a"}
//! ```
//!
//! Replies carry `ok: 1` on success and `ok: 0` with `errmsg` on failure.

use crate::broker::PubSub;
use crate::error::{PubSubError, Result};
use crate::poll::NOT_FOUND;
use crate::types::{Document, SubscriptionId};
use serde_json::{json, Map, Value};

/// A decoded command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Subscribe {
        channel: String,
        filter: Option<Value>,
        projection: Option<Value>,
    },
    Unsubscribe {
        ids: Vec<SubscriptionId>,
    },
    Publish {
        channel: String,
        message: Document,
    },
    Poll {
        ids: Vec<SubscriptionId>,
    },
}

impl Command {
    /// Decode a command document.
    pub fn parse(request: &Value) -> Result<Self> {
        let doc = request
            .as_object()
            .ok_or_else(|| PubSubError::InvalidCommand("command must be a document".to_string()))?;
        let (name, argument) = doc
            .iter()
            .next()
            .ok_or_else(|| PubSubError::InvalidCommand("empty command".to_string()))?;

        match name.as_str() {
            "subscribe" => Ok(Command::Subscribe {
                channel: channel_argument(name, argument)?,
                filter: doc.get("filter").cloned(),
                projection: doc.get("projection").cloned(),
            }),
            "unsubscribe" => Ok(Command::Unsubscribe {
                ids: id_list(name, argument)?,
            }),
            "publish" => {
                let channel = channel_argument(name, argument)?;
                let message = match doc.get("message") {
                    Some(Value::Object(message)) => message.clone(),
                    Some(_) => {
                        return Err(PubSubError::InvalidCommand(
                            "publish: message must be a document".to_string(),
                        ))
                    }
                    None => {
                        return Err(PubSubError::InvalidCommand(
                            "publish: missing message".to_string(),
                        ))
                    }
                };
                Ok(Command::Publish { channel, message })
            }
            "poll" => Ok(Command::Poll {
                ids: id_list(name, argument)?,
            }),
            other => Err(PubSubError::InvalidCommand(format!(
                "unknown command '{}'",
                other
            ))),
        }
    }

    /// Run against a broker and build the success reply.
    pub fn execute(self, pubsub: &PubSub) -> Result<Value> {
        match self {
            Command::Subscribe {
                channel,
                filter,
                projection,
            } => {
                let id = pubsub.subscribe(&channel, filter.as_ref(), projection.as_ref())?;
                Ok(json!({"ok": 1, "subscriptionId": id.to_hex()}))
            }
            Command::Unsubscribe { ids } => {
                let mut errors = Map::new();
                for id in ids {
                    match pubsub.unsubscribe(id) {
                        Ok(()) => {}
                        Err(PubSubError::SubscriptionNotFound(_)) => {
                            errors.insert(id.to_hex(), Value::String(NOT_FOUND.to_string()));
                        }
                        Err(e) => return Err(e),
                    }
                }
                let mut reply = Map::new();
                reply.insert("ok".to_string(), json!(1));
                if !errors.is_empty() {
                    reply.insert("errors".to_string(), Value::Object(errors));
                }
                Ok(Value::Object(reply))
            }
            Command::Publish { channel, message } => {
                pubsub.publish(&channel, message)?;
                Ok(json!({"ok": 1}))
            }
            Command::Poll { ids } => {
                let result = pubsub.poll(&ids)?;
                let mut reply = match result.to_json() {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                reply.insert("ok".to_string(), json!(1));
                Ok(Value::Object(reply))
            }
        }
    }
}

/// Parse and execute, folding failures into an `ok: 0` reply.
pub fn run_command(pubsub: &PubSub, request: &Value) -> Value {
    match Command::parse(request).and_then(|command| command.execute(pubsub)) {
        Ok(reply) => reply,
        Err(e) => json!({"ok": 0, "errmsg": e.to_string()}),
    }
}

fn channel_argument(command: &str, argument: &Value) -> Result<String> {
    match argument {
        Value::String(channel) if !channel.is_empty() => Ok(channel.clone()),
        _ => Err(PubSubError::InvalidCommand(format!(
            "{}: channel must be a non-empty string",
            command
        ))),
    }
}

fn id_list(command: &str, argument: &Value) -> Result<Vec<SubscriptionId>> {
    let parse = |value: &Value| -> Result<SubscriptionId> {
        value
            .as_str()
            .ok_or_else(|| {
                PubSubError::InvalidCommand(format!(
                    "{}: subscription ids must be strings",
                    command
                ))
            })?
            .parse()
    };

    match argument {
        Value::Array(values) => values.iter().map(parse).collect(),
        single => Ok(vec![parse(single)?]),
    }
}
