//! Property-based tests for the real-time channel event codec.
//!
//! Uses proptest to verify:
//! 1. Any JSON payload survives the `sendMsg` encode → decode round-trip
//!    unchanged (the relay must forward payloads verbatim).
//! 2. Any JSON payload survives the `receiveMsg` round-trip unchanged.
//! 3. Any user id string survives the `addUser` round-trip.
//! 4. Arbitrary input never causes a panic in decode (returns `Err` gracefully).

use leaseline_proto::event::{
    ClientEvent, DirectMessage, ServerEvent, decode_client, decode_server, encode_client,
    encode_server,
};
use proptest::prelude::*;
use serde_json::Value;

// --- Arbitrary implementations for protocol types ---

/// Strategy for generating arbitrary JSON values.
///
/// Numbers are restricted to integers: JSON text has no exact float
/// representation, and the relay contract is about value identity, not
/// float formatting.
fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        "[^\\x00]{0,32}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::hash_map("[a-z]{1,8}", inner, 0..8)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

/// Strategy for generating user ids as the auth layer might issue them.
fn arb_user_id() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,24}"
}

proptest! {
    #[test]
    fn send_msg_round_trips_any_payload(to in arb_user_id(), payload in arb_json()) {
        let event = ClientEvent::SendMsg(DirectMessage {
            to,
            message: payload,
        });
        let text = encode_client(&event).unwrap();
        let decoded = decode_client(&text).unwrap();
        prop_assert_eq!(decoded, event);
    }

    #[test]
    fn receive_msg_round_trips_any_payload(payload in arb_json()) {
        let event = ServerEvent::ReceiveMsg(payload);
        let text = encode_server(&event).unwrap();
        let decoded = decode_server(&text).unwrap();
        prop_assert_eq!(decoded, event);
    }

    #[test]
    fn add_user_round_trips_any_user_id(user_id in "[^\\x00]{0,64}") {
        let event = ClientEvent::AddUser(user_id);
        let text = encode_client(&event).unwrap();
        let decoded = decode_client(&text).unwrap();
        prop_assert_eq!(decoded, event);
    }

    #[test]
    fn decode_never_panics(input in ".*") {
        // Result is irrelevant; decoding must not panic on any input.
        let _ = decode_client(&input);
        let _ = decode_server(&input);
    }
}
