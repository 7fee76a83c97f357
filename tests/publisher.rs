// tests/publisher.rs

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::FutureExt;
use tokio::time::{timeout, Duration};

use logbus::{
    // ---
    create_memory_connection_with_wire,
    memory_wire,
    Error,
    IdentityContext,
    LogMessage,
    MemoryWire,
    Publisher,
    PublisherBuilder,
    DRIVER_NAME,
};

async fn publisher_on(wire: Arc<MemoryWire>, tenant: &str, service: &str, source: &str) -> Publisher {
    // ---
    let connection = create_memory_connection_with_wire("memory://test", wire)
        .await
        .expect("failed to create memory connection");

    Publisher::new(connection, IdentityContext::new(tenant, service, source))
}

fn frames(parts: &[&str]) -> Vec<Bytes> {
    parts.iter().map(|p| Bytes::copy_from_slice(p.as_bytes())).collect()
}

#[tokio::test]
async fn publish_emits_three_frames_for_both_streams() {
    // ---
    // Arrange
    // ---
    let wire = MemoryWire::new();
    let publisher = publisher_on(wire.clone(), "acme", "web", "c0ffee").await;

    // ---
    // Act
    // ---
    publisher.publish(b"out line", false).await.expect("stdout publish failed");
    publisher.publish(b"err line", true).await.expect("stderr publish failed");

    // ---
    // Assert
    // ---
    assert_eq!(
        wire.messages().await,
        vec![
            frames(&["acme", "web", "c0ffee: out line"]),
            frames(&["acme", "web", "c0ffee: err line"]),
        ]
    );
}

#[tokio::test]
async fn log_maps_captured_lines_onto_publish() {
    // ---
    let wire = MemoryWire::new();
    let publisher = publisher_on(wire.clone(), "t", "s", "id").await;

    publisher.log(&LogMessage::stdout("a")).await.unwrap();
    publisher.log(&LogMessage::stderr("b")).await.unwrap();

    assert_eq!(
        wire.messages().await,
        vec![frames(&["t", "s", "id: a"]), frames(&["t", "s", "id: b"])]
    );
}

#[tokio::test]
async fn payload_bytes_are_forwarded_verbatim() {
    // ---
    let wire = MemoryWire::new();
    let publisher = publisher_on(wire.clone(), "t", "s", "id").await;

    publisher.publish(&[0xff, 0x00, 0xfe], false).await.unwrap();
    publisher.publish(b"", false).await.unwrap();

    let messages = wire.messages().await;
    assert_eq!(&messages[0][2][..], &[b'i', b'd', b':', b' ', 0xff, 0x00, 0xfe][..]);
    assert_eq!(&messages[1][2][..], b"id: ");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_publishes_never_interleave() {
    // ---
    // Arrange
    // ---
    const TASKS: usize = 8;
    const LINES: usize = 50;

    let wire = MemoryWire::new();
    let publisher = Arc::new(publisher_on(wire.clone(), "acme", "web", "src").await);

    // ---
    // Act
    // ---
    let mut handles = Vec::new();
    for task in 0..TASKS {
        let publisher = publisher.clone();
        handles.push(tokio::spawn(async move {
            for line in 0..LINES {
                let payload = format!("task-{task} line-{line}");
                publisher
                    .publish(payload.as_bytes(), task % 2 == 1)
                    .await
                    .expect("publish failed");
            }
        }));
    }
    for handle in handles {
        handle.await.expect("publisher task panicked");
    }

    // ---
    // Assert
    // ---
    let messages = wire.messages().await;
    assert_eq!(messages.len(), TASKS * LINES);

    let mut seen = HashSet::new();
    for message in &messages {
        assert_eq!(message.len(), 3, "message is not a complete 3-frame group");
        assert_eq!(message[0], "acme");
        assert_eq!(message[1], "web");
        let payload = std::str::from_utf8(&message[2]).expect("payload frame is not utf-8");
        let line = payload.strip_prefix("src: ").expect("payload frame lacks source prefix");
        assert!(seen.insert(line.to_string()), "duplicate line {line}");
    }

    // Per-task order is preserved.
    for task in 0..TASKS {
        let prefix = format!("src: task-{task} ");
        let order: Vec<usize> = messages
            .iter()
            .filter_map(|m| std::str::from_utf8(&m[2]).ok()?.strip_prefix(&prefix).map(str::to_owned))
            .map(|rest| rest.trim_start_matches("line-").parse().unwrap())
            .collect();
        assert_eq!(order, (0..LINES).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn close_twice_releases_connection_once() {
    // ---
    let wire = MemoryWire::new();
    let publisher = publisher_on(wire.clone(), "t", "s", "id").await;

    publisher.close().await.expect("first close failed");
    publisher.close().await.expect("second close failed");

    assert_eq!(wire.close_count(), 1);
    assert!(publisher.is_closed().await);
}

#[tokio::test]
async fn close_error_still_releases_connection() {
    // ---
    let wire = MemoryWire::new();
    let publisher = publisher_on(wire.clone(), "t", "s", "id").await;

    wire.fail_next_closes(1);
    let err = publisher.close().await.expect_err("close should report failure");
    assert!(err.is_connection());

    publisher.close().await.expect("second close should be a no-op");
    assert_eq!(wire.close_count(), 1);
}

#[tokio::test]
async fn publish_after_close_fails_with_connection_error() {
    // ---
    let wire = MemoryWire::new();
    let publisher = publisher_on(wire.clone(), "t", "s", "id").await;

    publisher.close().await.unwrap();

    let err = publisher.publish(b"late", false).await.expect_err("publish after close");
    assert!(matches!(err, Error::ConnectionClosed));
    assert!(err.is_connection());
    assert!(wire.messages().await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_waits_for_in_flight_publishes() {
    // ---
    let wire = MemoryWire::new();
    let publisher = Arc::new(publisher_on(wire.clone(), "t", "s", "id").await);

    let writer = {
        let publisher = publisher.clone();
        tokio::spawn(async move {
            let mut delivered = 0usize;
            for i in 0..200 {
                match publisher.publish(format!("{i}").as_bytes(), false).await {
                    Ok(()) => delivered += 1,
                    Err(Error::ConnectionClosed) => break,
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }
            delivered
        })
    };

    tokio::task::yield_now().await;
    publisher.close().await.unwrap();
    let delivered = writer.await.unwrap();

    // Every publish that reported success is on the wire in full.
    let messages = wire.messages().await;
    assert_eq!(messages.len(), delivered);
    assert!(messages.iter().all(|m| m.len() == 3));
    assert_eq!(wire.close_count(), 1);
}

#[tokio::test]
async fn cancelled_publish_leaves_no_partial_message() {
    // ---
    // Arrange
    // ---
    let wire = MemoryWire::new();
    let publisher = publisher_on(wire.clone(), "t", "s", "id").await;

    // ---
    // Act
    // ---
    // One poll stages the tenant frame and then yields; dropping the future
    // abandons the message part-way.
    let abandoned = publisher.publish(b"abandoned", false).now_or_never();
    assert!(abandoned.is_none(), "publish finished in a single poll");

    publisher.publish(b"next", false).await.unwrap();

    // ---
    // Assert
    // ---
    assert_eq!(wire.messages().await, vec![frames(&["t", "s", "id: next"])]);
}

#[tokio::test]
async fn transport_error_leaves_publisher_usable() {
    // ---
    let wire = MemoryWire::new();
    let publisher = publisher_on(wire.clone(), "t", "s", "id").await;

    wire.fail_next_sends(1);
    let err = publisher.publish(b"lost", false).await.expect_err("injected failure");
    assert!(matches!(err, Error::Transport(_)));

    publisher.publish(b"kept", false).await.expect("publisher should recover");
    assert_eq!(wire.messages().await, vec![frames(&["t", "s", "id: kept"])]);
}

#[tokio::test]
async fn full_wire_fails_fast_instead_of_blocking() {
    // ---
    let wire = MemoryWire::bounded(1);
    let publisher = publisher_on(wire.clone(), "t", "s", "id").await;

    publisher.publish(b"first", false).await.unwrap();

    let err = timeout(Duration::from_secs(1), publisher.publish(b"second", false))
        .await
        .expect("publish blocked on a full wire")
        .expect_err("publish should fail on a full wire");
    assert!(matches!(err, Error::WouldBlock));

    wire.drain().await;
    publisher.publish(b"third", false).await.unwrap();
    assert_eq!(wire.messages().await, vec![frames(&["t", "s", "id: third"])]);
}

#[tokio::test]
async fn name_is_the_driver_identifier() {
    // ---
    let publisher = publisher_on(MemoryWire::new(), "t", "s", "id").await;
    assert_eq!(publisher.name(), DRIVER_NAME);
    assert_eq!(publisher.name(), "zmq_logger");
}

#[tokio::test]
async fn builder_derives_identity_and_connects_by_endpoint() {
    // ---
    let publisher = PublisherBuilder::new()
        .endpoint("memory://builder-identity")
        .source_id("abc123")
        .environment(["TENANT_ID=acme", "SERVICE_ID=web", "FOO"])
        .build()
        .await
        .expect("build failed");

    publisher.publish(b"hello", false).await.unwrap();

    assert_eq!(publisher.identity().tenant_id(), "acme");
    assert_eq!(publisher.identity().service_id(), "web");
    assert_eq!(
        memory_wire("builder-identity").messages().await,
        vec![frames(&["acme", "web", "abc123: hello"])]
    );
}

#[tokio::test]
async fn builder_defaults_identity() {
    // ---
    let publisher = PublisherBuilder::new()
        .endpoint("memory://builder-defaults")
        .environment(["FOO", "PATH=/bin"])
        .build()
        .await
        .unwrap();

    assert_eq!(publisher.identity().tenant_id(), "default");
    assert_eq!(publisher.identity().service_id(), "default");
    assert_eq!(publisher.identity().source_id().as_str().len(), 12);
}

#[tokio::test]
async fn builder_rejects_bad_options_before_connecting() {
    // ---
    let wire = MemoryWire::new();

    let connection = create_memory_connection_with_wire("memory://unused", wire.clone())
        .await
        .unwrap();
    let err = PublisherBuilder::new()
        .log_opt("unknownKey", "x")
        .connection(connection)
        .build()
        .await
        .expect_err("unknown option accepted");
    assert!(err.is_configuration());
    assert!(err.to_string().contains("unknownKey"));

    let err = PublisherBuilder::new()
        .endpoint("")
        .build()
        .await
        .expect_err("empty endpoint accepted");
    assert!(matches!(err, Error::MissingOption { option: "endpointAddress", .. }));
}

#[tokio::test]
async fn builder_rejects_unsupported_scheme() {
    // ---
    let err = PublisherBuilder::new()
        .endpoint("carrier-pigeon://coop")
        .build()
        .await
        .expect_err("unsupported scheme accepted");
    assert!(matches!(err, Error::UnsupportedEndpoint(_)));
}
