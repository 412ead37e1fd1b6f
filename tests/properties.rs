//! Property tests for message classification: field presence alone decides
//! the message kind, for any id and method name.

use proptest::prelude::*;
use serde_json::json;

use mcp_loopback::protocol::{JsonRpcMessage, JSONRPC_VERSION};

proptest! {
    #[test]
    fn id_and_method_always_classify_as_request(
        id in 1..u64::MAX,
        method in "[a-z]{1,12}(/[a-z]{1,12})?"
    ) {
        let val = json!({"jsonrpc": JSONRPC_VERSION, "id": id, "method": method, "params": {}});
        let msg: JsonRpcMessage = serde_json::from_value(val).unwrap();
        match msg {
            JsonRpcMessage::Request(req) => {
                prop_assert_eq!(req.id, id);
                prop_assert_eq!(req.method, method);
            }
            other => prop_assert!(false, "expected Request, got {:?}", other),
        }
    }

    #[test]
    fn method_without_id_always_classifies_as_notification(
        method in "[a-z]{1,12}(/[a-z]{1,12})?"
    ) {
        let val = json!({"jsonrpc": JSONRPC_VERSION, "method": method});
        let msg: JsonRpcMessage = serde_json::from_value(val).unwrap();
        prop_assert!(msg.is_notification());
        prop_assert_eq!(msg.id(), None);
    }

    #[test]
    fn id_and_result_always_classify_as_response(
        id in 1..u64::MAX,
        payload in "\\PC{0,24}"
    ) {
        let val = json!({"jsonrpc": JSONRPC_VERSION, "id": id, "result": {"data": payload}});
        let msg: JsonRpcMessage = serde_json::from_value(val).unwrap();
        match msg {
            JsonRpcMessage::Response(resp) => {
                prop_assert_eq!(resp.id, id);
                prop_assert_eq!(&resp.result["data"], &json!(payload));
            }
            other => prop_assert!(false, "expected Response, got {:?}", other),
        }
    }

    #[test]
    fn id_and_error_always_classify_as_error(
        id in 1..u64::MAX,
        code in -32768i32..0,
        message in "\\PC{0,24}"
    ) {
        let val = json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": id,
            "error": {"code": code, "message": message}
        });
        let msg: JsonRpcMessage = serde_json::from_value(val).unwrap();
        match msg {
            JsonRpcMessage::Error(err) => {
                prop_assert_eq!(err.id, id);
                prop_assert_eq!(err.error.code, code);
            }
            other => prop_assert!(false, "expected Error, got {:?}", other),
        }
    }

    #[test]
    fn constructed_messages_survive_a_wire_round_trip(
        id in 1..u64::MAX,
        method in "[a-z]{1,12}/[a-z]{1,12}",
        text in "\\PC{0,32}"
    ) {
        for msg in [
            JsonRpcMessage::request(id, method.clone(), json!({"text": text})),
            JsonRpcMessage::response(id, json!({"text": text})),
            JsonRpcMessage::error(id, -32603, text.clone()),
            JsonRpcMessage::notification(method.clone(), json!({"text": text})),
        ] {
            let wire = serde_json::to_string(&msg).unwrap();
            let back: JsonRpcMessage = serde_json::from_str(&wire).unwrap();
            prop_assert_eq!(back, msg);
        }
    }
}
