// mcp-schema/tests/classification_invariants.rs
// ============================================================================
// Property coverage for the envelope discrimination rule.
// ============================================================================

use mcp_schema::Envelope;
use proptest::prelude::*;

proptest! {
    /// Any id+method combination classifies as a request, whatever extra
    /// params payload rides along.
    #[test]
    fn id_and_method_is_always_a_request(id in "[a-z0-9-]{1,12}", method in "[a-z/]{1,20}") {
        let bytes = format!(
            r#"{{"jsonrpc":"2.0","id":"{id}","method":"{method}","params":{{"n":1}}}}"#
        );
        let envelope = mcp_schema::envelope::decode(bytes.as_bytes()).unwrap();
        prop_assert!(matches!(envelope, Envelope::Request(_)));
    }

    /// A method with no id is always a notification, never a request.
    #[test]
    fn method_without_id_is_always_a_notification(method in "[a-z/]{1,20}") {
        let bytes = format!(r#"{{"jsonrpc":"2.0","method":"{method}"}}"#);
        let envelope = mcp_schema::envelope::decode(bytes.as_bytes()).unwrap();
        prop_assert!(matches!(envelope, Envelope::Notification(_)));
    }

    /// An id with a result (and no method) is always a response, and the
    /// id round-trips unchanged.
    #[test]
    fn id_and_result_is_always_a_response(id in 0i64..1_000_000) {
        let bytes = format!(r#"{{"jsonrpc":"2.0","id":{id},"result":{{}}}}"#);
        let envelope = mcp_schema::envelope::decode(bytes.as_bytes()).unwrap();
        match envelope {
            Envelope::Response(resp) => {
                prop_assert_eq!(resp.id, mcp_schema::RequestId::Int(id));
                prop_assert!(resp.error.is_none());
            }
            other => prop_assert!(false, "expected response, got {other:?}"),
        }
    }
}
