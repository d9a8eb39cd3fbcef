use crate::common::{fixture, fixture_with_config};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use yadap::config::SessionConfig;
use yadap::dap::protocol::Message;
use yadap::dap::session::handlers::Reply;
use yadap::error::Error;

#[tokio::test]
async fn test_evaluate_round_trip() {
    let fx = fixture();
    let rsp = fx.conn.dap().request("evaluate", json!({"expr": "1+1"}));

    let sent = fx.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        serde_json::to_value(&sent[0]).unwrap(),
        json!({"seq": 1, "type": "request", "command": "evaluate", "arguments": {"expr": "1+1"}})
    );

    fx.transport
        .inject_response(2, 1, true, Some(json!({"result": 2})));
    assert_eq!(rsp.await.unwrap(), json!({"result": 2}));
    assert_eq!(fx.conn.pending_requests(), 0);
}

#[tokio::test]
async fn test_null_arguments_sent_as_empty_object() {
    let fx = fixture();
    let _rsp = fx.conn.dap().request("threads", Value::Null);

    let Message::Request(req) = &fx.transport.sent()[0] else {
        panic!("request expected");
    };
    assert_eq!(req.arguments, json!({}));
}

#[tokio::test]
async fn test_responses_out_of_order() {
    let fx = fixture();
    let dap = fx.conn.dap();
    let first = dap.request("evaluate", json!({"expr": "a"}));
    let second = dap.request("evaluate", json!({"expr": "b"}));
    let third = dap.request("evaluate", json!({"expr": "c"}));

    fx.transport.inject_response(10, 3, true, Some(json!("c")));
    fx.transport.inject_response(11, 1, true, Some(json!("a")));
    fx.transport.inject_response(12, 2, true, Some(json!("b")));

    assert_eq!(second.await.unwrap(), json!("b"));
    assert_eq!(third.await.unwrap(), json!("c"));
    assert_eq!(first.await.unwrap(), json!("a"));
}

#[tokio::test]
async fn test_failed_response() {
    struct TestCase {
        body: Option<Value>,
        message: Option<&'static str>,
        expected: &'static str,
    }

    let cases = vec![
        TestCase {
            body: Some(json!({"error": {"id": 1, "format": "bad expression"}})),
            message: Some("ignored"),
            expected: "bad expression",
        },
        TestCase {
            body: None,
            message: Some("cancelled"),
            expected: "cancelled",
        },
        TestCase {
            body: None,
            message: None,
            expected: "Unknown error",
        },
    ];

    for tc in cases {
        let fx = fixture();
        let rsp = fx.conn.dap().request("evaluate", json!({"expr": "?"}));
        fx.transport.inject(Message::Response(yadap::dap::protocol::Response {
            seq: 2,
            request_seq: 1,
            command: "evaluate".to_string(),
            success: false,
            message: tc.message.map(ToString::to_string),
            body: tc.body,
        }));

        let err = rsp.await.unwrap_err();
        assert!(
            matches!(err, Error::RequestFailed(ref text) if text == tc.expected),
            "unexpected error: {err:?}"
        );
    }
}

#[tokio::test]
async fn test_response_without_body_resolves_null() {
    let fx = fixture();
    let rsp = fx.conn.dap().request("pause", json!({"threadId": 1}));
    fx.transport.inject_response(2, 1, true, None);
    assert_eq!(rsp.await.unwrap(), Value::Null);
}

#[tokio::test]
async fn test_stray_response_ignored() {
    let fx = fixture();
    let rsp = fx.conn.dap().request("threads", json!({}));

    fx.transport.inject_response(5, 42, true, Some(json!({})));
    assert_eq!(fx.conn.pending_requests(), 1);

    fx.transport.inject_response(6, 1, true, Some(json!({"threads": []})));
    fx.transport.inject_response(7, 1, true, Some(json!({"threads": [1]})));
    assert_eq!(rsp.await.unwrap(), json!({"threads": []}));
}

#[tokio::test]
async fn test_sequence_numbers_shared_by_all_kinds() {
    let fx = fixture();
    let dap = fx.conn.dap();
    dap.on("threads", |_| async { Ok(Reply::Body(json!({"threads": []}))) });

    let _r1 = dap.request("evaluate", json!({}));
    dap.event("stopped", json!({"reason": "step"})).unwrap();
    fx.transport.inject_request(100, "threads", json!({}));
    fx.transport.response_to(100).await;
    let _r2 = dap.request("evaluate", json!({}));

    let seqs: Vec<i64> = fx.transport.sent().iter().map(Message::seq).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sends_keep_wire_order() {
    let fx = fixture();
    let dap = Arc::new(fx.conn.dap());

    let mut tasks = vec![];
    for worker in 0..8 {
        let dap = dap.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..25 {
                if (worker + i) % 2 == 0 {
                    let _rsp = dap.request("evaluate", json!({"expr": i}));
                } else {
                    dap.event("output", json!({"output": "x"})).unwrap();
                }
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let seqs: Vec<i64> = fx.transport.sent().iter().map(Message::seq).collect();
    assert_eq!(seqs.len(), 200);
    assert!(seqs.windows(2).all(|w| w[0] < w[1]), "{seqs:?}");
    assert_eq!(seqs.first(), Some(&1));
}

#[tokio::test]
async fn test_stop_rejects_pending_requests() {
    let fx = fixture();
    let dap = fx.conn.dap();
    let rsp = dap.request("evaluate", json!({"expr": "1"}));

    fx.conn.stop();
    assert!(fx.transport.is_closed());
    assert!(fx.conn.is_closed());
    assert!(matches!(rsp.await, Err(Error::ConnectionClosed)));

    assert!(matches!(
        dap.request("evaluate", json!({})).await,
        Err(Error::ConnectionClosed)
    ));
    assert!(matches!(
        dap.event("output", json!({})),
        Err(Error::ConnectionClosed)
    ));
    // nothing is sent after stop
    assert_eq!(fx.transport.sent().len(), 1);
}

#[tokio::test]
async fn test_peer_disconnect_rejects_pending_requests() {
    let fx = fixture();
    let rsp = fx.conn.dap().request("evaluate", json!({"expr": "1"}));

    fx.transport.disconnect();
    tokio::time::timeout(Duration::from_secs(1), fx.conn.closed())
        .await
        .unwrap();
    assert!(matches!(rsp.await, Err(Error::ConnectionClosed)));
}

#[tokio::test]
async fn test_pending_requests_kept_if_configured() {
    let fx = fixture_with_config(SessionConfig {
        fail_pending_on_close: false,
        ..Default::default()
    });
    let rsp = fx.conn.dap().request("evaluate", json!({"expr": "1"}));

    fx.conn.stop();
    assert_eq!(fx.conn.pending_requests(), 1);
    assert!(tokio::time::timeout(Duration::from_millis(50), rsp)
        .await
        .is_err());
}
