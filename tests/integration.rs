//! Integration tests for the pub/sub broker.

use postbox::{run_command, Document, PubSub, PubSubConfig, SubscriptionId};
use serde_json::{json, Value};

fn test_broker() -> PubSub {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    PubSub::new(PubSubConfig::unbounded()).unwrap()
}

fn publish_counts(pubsub: &PubSub, channel: &str, n: i64) {
    for i in 0..n {
        pubsub
            .publish_value(channel, json!({"body": "hello", "count": i}))
            .unwrap();
    }
}

fn counts(docs: &[&Document]) -> Vec<i64> {
    docs.iter().map(|d| d["count"].as_i64().unwrap()).collect()
}

// --- Delivery Scenarios ---

#[test]
fn test_plain_and_filtered_subscribers() {
    let pubsub = test_broker();

    let plain = pubsub.subscribe("A", None, None).unwrap();
    let filtered = pubsub
        .subscribe("A", Some(&json!({"count": {"gt": 3}})), None)
        .unwrap();

    publish_counts(&pubsub, "A", 6);

    let result = pubsub.poll(&[plain, filtered]).unwrap();
    assert_eq!(counts(&result.documents(plain, "A")), vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(counts(&result.documents(filtered, "A")), vec![4, 5]);
}

#[test]
fn test_projection_strips_other_fields() {
    let pubsub = test_broker();

    let plain = pubsub.subscribe("A", None, None).unwrap();
    let projected = pubsub
        .subscribe("A", None, Some(&json!({"count": 1})))
        .unwrap();

    publish_counts(&pubsub, "A", 6);

    let result = pubsub.poll(&[plain, projected]).unwrap();
    assert_eq!(counts(&result.documents(plain, "A")), vec![0, 1, 2, 3, 4, 5]);

    let docs = result.documents(projected, "A");
    assert_eq!(counts(&docs), vec![0, 1, 2, 3, 4, 5]);
    for doc in docs {
        assert!(doc.get("body").is_none());
        assert_eq!(doc.len(), 1);
    }

    // The unprojected subscriber still sees the body
    assert_eq!(result.documents(plain, "A")[0]["body"], json!("hello"));
}

#[test]
fn test_filter_then_projection() {
    let pubsub = test_broker();

    let plain = pubsub.subscribe("A", None, None).unwrap();
    let both = pubsub
        .subscribe(
            "A",
            Some(&json!({"count": {"$gt": 3}})),
            Some(&json!({"count": 1})),
        )
        .unwrap();

    publish_counts(&pubsub, "A", 6);

    let result = pubsub.poll(&[plain, both]).unwrap();
    assert_eq!(counts(&result.documents(plain, "A")).len(), 6);

    let docs = result.documents(both, "A");
    assert_eq!(counts(&docs), vec![4, 5]);
    assert!(docs.iter().all(|d| d.get("body").is_none()));
}

#[test]
fn test_second_poll_returns_nothing() {
    let pubsub = test_broker();
    let id = pubsub.subscribe("A", None, None).unwrap();
    publish_counts(&pubsub, "A", 3);

    assert_eq!(pubsub.poll(&[id]).unwrap().message_count(), 3);

    let again = pubsub.poll(&[id]).unwrap();
    assert!(again.documents(id, "A").is_empty());
    assert!(again.errors.is_empty());
}

#[test]
fn test_fan_out_is_independent_per_subscription() {
    let pubsub = test_broker();

    let low = pubsub
        .subscribe("A", Some(&json!({"count": {"lte": 1}})), None)
        .unwrap();
    let exact = pubsub
        .subscribe("A", Some(&json!({"count": 2})), Some(&json!({"body": 1})))
        .unwrap();
    let not_three = pubsub
        .subscribe("A", Some(&json!({"count": {"ne": 3}})), Some(&json!({"count": 1})))
        .unwrap();
    let other_channel = pubsub.subscribe("B", None, None).unwrap();

    publish_counts(&pubsub, "A", 5);

    let result = pubsub.poll(&[low, exact, not_three, other_channel]).unwrap();
    assert_eq!(counts(&result.documents(low, "A")), vec![0, 1]);

    let exact_docs = result.documents(exact, "A");
    assert_eq!(exact_docs.len(), 1);
    assert_eq!(Value::Object(exact_docs[0].clone()), json!({"body": "hello"}));

    assert_eq!(counts(&result.documents(not_three, "A")), vec![0, 1, 2, 4]);
    assert!(!result.messages.contains_key(&other_channel));
}

#[test]
fn test_large_integer_against_float_bound() {
    let pubsub = test_broker();
    let id = pubsub
        .subscribe("A", Some(&json!({"n": {"gt": 9_007_199_254_740_992.0}})), None)
        .unwrap();

    pubsub.publish_value("A", json!({"n": 9_007_199_254_740_992u64})).unwrap();
    pubsub.publish_value("A", json!({"n": 9_007_199_254_740_993u64})).unwrap();

    let result = pubsub.poll(&[id]).unwrap();
    let docs = result.documents(id, "A");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["n"], json!(9_007_199_254_740_993u64));
}

#[test]
fn test_dotted_filter_reaches_into_arrays() {
    let pubsub = test_broker();
    let id = pubsub
        .subscribe("A", Some(&json!({"items.qty": {"gte": 5}})), None)
        .unwrap();

    pubsub.publish_value("A", json!({"items": [{"qty": 1}, {"qty": 7}]})).unwrap();
    pubsub.publish_value("A", json!({"items": [{"qty": 2}]})).unwrap();

    assert_eq!(pubsub.poll(&[id]).unwrap().message_count(), 1);
}

#[test]
fn test_channels_are_isolated() {
    let pubsub = test_broker();
    let a = pubsub.subscribe("A", None, None).unwrap();
    let b = pubsub.subscribe("B", None, None).unwrap();

    pubsub.publish_value("A", json!({"to": "a"})).unwrap();
    pubsub.publish_value("B", json!({"to": "b"})).unwrap();
    pubsub.publish_value("C", json!({"to": "nobody"})).unwrap();

    let result = pubsub.poll(&[a, b]).unwrap();
    assert_eq!(result.documents(a, "A")[0]["to"], json!("a"));
    assert_eq!(result.documents(b, "B")[0]["to"], json!("b"));
    assert!(result.documents(a, "B").is_empty());
    assert_eq!(pubsub.channels(), vec!["A", "B"]);
}

#[test]
fn test_late_subscriber_misses_earlier_messages() {
    let pubsub = test_broker();
    let early = pubsub.subscribe("A", None, None).unwrap();
    publish_counts(&pubsub, "A", 2);

    let late = pubsub.subscribe("A", None, None).unwrap();
    pubsub.publish_value("A", json!({"count": 99})).unwrap();

    let result = pubsub.poll(&[early, late]).unwrap();
    assert_eq!(counts(&result.documents(early, "A")), vec![0, 1, 99]);
    assert_eq!(counts(&result.documents(late, "A")), vec![99]);
}

#[test]
fn test_sequences_are_per_channel() {
    let pubsub = test_broker();
    let id = pubsub.subscribe("A", None, None).unwrap();
    pubsub.subscribe("B", None, None).unwrap();

    let first = pubsub.publish_value("A", json!({})).unwrap();
    pubsub.publish_value("B", json!({})).unwrap();
    let second = pubsub.publish_value("A", json!({})).unwrap();

    assert_eq!(first.sequence.unwrap().0, 1);
    assert_eq!(second.sequence.unwrap().0, 2);

    let result = pubsub.poll(&[id]).unwrap();
    let seqs: Vec<u64> = result.messages[&id]["A"]
        .iter()
        .map(|m| m.sequence.0)
        .collect();
    assert_eq!(seqs, vec![1, 2]);
}

#[test]
fn test_channel_recreated_after_last_unsubscribe() {
    let pubsub = test_broker();
    let first = pubsub.subscribe("A", None, None).unwrap();
    pubsub.unsubscribe(first).unwrap();
    assert_eq!(pubsub.channel_count(), 0);

    // Nobody is listening: no sequence assigned
    let receipt = pubsub.publish_value("A", json!({"n": 1})).unwrap();
    assert!(receipt.sequence.is_none());

    let second = pubsub.subscribe("A", None, None).unwrap();
    assert_ne!(first, second);
    pubsub.publish_value("A", json!({"n": 2})).unwrap();
    let result = pubsub.poll(&[second]).unwrap();
    assert_eq!(result.documents(second, "A").len(), 1);
}

// --- Command Surface ---

#[test]
fn test_command_workflow() {
    let pubsub = test_broker();

    let regular = run_command(&pubsub, &json!({"subscribe": "A"}))["subscriptionId"]
        .as_str()
        .unwrap()
        .to_string();
    let filtered = run_command(
        &pubsub,
        &json!({"subscribe": "A", "filter": {"count": {"$gt": 3}}, "projection": {"count": 1}}),
    )["subscriptionId"]
        .as_str()
        .unwrap()
        .to_string();

    for i in 0..6 {
        let reply = run_command(
            &pubsub,
            &json!({"publish": "A", "message": {"body": "hello", "count": i}}),
        );
        assert_eq!(reply["ok"], json!(1));
    }

    let reply = run_command(&pubsub, &json!({"poll": [regular.clone(), filtered.clone()]}));
    let regular_docs = reply["messages"][regular.as_str()]["A"].as_array().unwrap();
    for (i, doc) in regular_docs.iter().enumerate() {
        assert_eq!(doc["count"], json!(i));
    }
    assert_eq!(regular_docs.len(), 6);

    let filtered_docs = reply["messages"][filtered.as_str()]["A"].as_array().unwrap();
    assert_eq!(filtered_docs, &vec![json!({"count": 4}), json!({"count": 5})]);

    let id: SubscriptionId = regular.parse().unwrap();
    assert!(pubsub.subscription_info(id).is_some());
}
