use std::time::Duration;
use tokio::sync::oneshot;
use tracing_test::traced_test;

use crate::error::{ComponentError, RenderError};

use super::controller::StreamController;
use super::sink::MemorySink;
use super::types::{RegionId, StreamStatus};

fn controller() -> (StreamController, MemorySink) {
    let sink = MemorySink::new();
    (StreamController::new(sink.clone()), sink)
}

fn ready() -> impl std::future::Future<Output = Result<(), RenderError>> + Send + 'static {
    async { Ok(()) }
}

fn gated_by(
    receiver: oneshot::Receiver<()>,
) -> impl std::future::Future<Output = Result<(), RenderError>> + Send + 'static {
    async move {
        receiver.await.map_err(|e| RenderError::TaskAborted(e.to_string()))?;
        Ok(())
    }
}

async fn wait_for(sink: &MemorySink, needle: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !sink.contents().contains(needle) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("chunk never arrived");
}

#[test]
fn test_writes_without_region_go_straight_to_sink() {
    let (controller, sink) = controller();

    controller.open_tag("div", "", None).unwrap();
    controller.write("Hello world!", None).unwrap();
    controller.close_tag("div", None).unwrap();

    assert_eq!(sink.chunks(), vec!["<div>", "Hello world!", "</div>"]);
}

#[tokio::test]
async fn test_region_writes_are_deferred_until_gate_settles() {
    let (controller, sink) = controller();

    controller.open_tag("div", r#" id="S:1""#, None).unwrap();
    controller.write("Loading...", None).unwrap();
    controller.close_tag("div", None).unwrap();

    let region = controller.allocate_region();
    controller.register_gate(region, ready()).unwrap();

    controller.open_tag("div", "", None).unwrap();
    controller.write("Another", None).unwrap();
    controller.write("Success!", Some(region)).unwrap();
    controller.close_tag("div", None).unwrap();

    controller.await_all_gates().await.unwrap();

    assert_eq!(
        sink.chunks(),
        vec![
            r#"<div id="S:1">"#,
            "Loading...",
            "</div>",
            "<div>",
            "Another",
            "</div>",
            r#"<template id="U:1">Success!</template><script id="R:1">u$('1')</script>"#,
        ]
    );
}

#[tokio::test]
async fn test_multiple_regions_settled_together_flush_latest_first() {
    let (controller, sink) = controller();

    let first = controller.allocate_region();
    controller.register_gate(first, ready()).unwrap();
    let second = controller.allocate_region();
    controller.register_gate(second, ready()).unwrap();

    controller.open_tag("div", r#" id="S:1""#, None).unwrap();
    controller.write("Loading...", None).unwrap();
    controller.close_tag("div", None).unwrap();

    controller.open_tag("div", r#" id="S:2""#, None).unwrap();
    controller.write("Loading...", None).unwrap();
    controller.close_tag("div", None).unwrap();

    controller.open_tag("h1", "", None).unwrap();
    controller.write("Hello world", None).unwrap();

    controller.open_tag("div", "", Some(second)).unwrap();
    controller.write("Success U2!", Some(second)).unwrap();
    controller.close_tag("div", Some(second)).unwrap();

    controller.close_tag("h1", None).unwrap();
    controller.write("Success U1!", Some(first)).unwrap();

    controller.await_all_gates().await.unwrap();

    assert_eq!(
        sink.chunks(),
        vec![
            r#"<div id="S:1">"#,
            "Loading...",
            "</div>",
            r#"<div id="S:2">"#,
            "Loading...",
            "</div>",
            "<h1>",
            "Hello world",
            "</h1>",
            r#"<template id="U:2"><div>Success U2!</div></template><script id="R:2">u$('2')</script>"#,
            r#"<template id="U:1">Success U1!</template><script id="R:1">u$('1')</script>"#,
        ]
    );
}

#[tokio::test]
async fn test_nested_fallbacks_and_regions() {
    let (controller, sink) = controller();

    let first = controller.allocate_region();
    controller.register_gate(first, ready()).unwrap();
    let nested = controller.allocate_region();
    controller.register_gate(nested, ready()).unwrap();

    controller.open_tag("div", r#" id="S:1""#, None).unwrap();
    controller.write("Loading S1...", None).unwrap();
    controller.open_tag("div", r#" id="S:2""#, None).unwrap();
    controller.write("Loading S2...", None).unwrap();
    controller.close_tag("div", None).unwrap();
    controller.close_tag("div", None).unwrap();
    controller.open_tag("h1", "", None).unwrap();
    controller.write("Hello world", None).unwrap();
    controller.write("Success U2!", Some(nested)).unwrap();
    controller.close_tag("h1", None).unwrap();
    controller.write("Success U1!", Some(first)).unwrap();

    controller.await_all_gates().await.unwrap();

    assert_eq!(
        sink.chunks(),
        vec![
            r#"<div id="S:1">"#,
            "Loading S1...",
            r#"<div id="S:2">"#,
            "Loading S2...",
            "</div>",
            "</div>",
            "<h1>",
            "Hello world",
            "</h1>",
            r#"<template id="U:2">Success U2!</template><script id="R:2">u$('2')</script>"#,
            r#"<template id="U:1">Success U1!</template><script id="R:1">u$('1')</script>"#,
        ]
    );
}

#[tokio::test]
async fn test_region_with_text_only_content() {
    let (controller, sink) = controller();
    let region = controller.allocate_region();
    controller.register_gate(region, ready()).unwrap();

    controller.open_tag("div", r#" id="S:1""#, None).unwrap();
    controller.write("Loading...", None).unwrap();
    controller.close_tag("div", None).unwrap();

    for part in ["This ", "is ", "a ", "test"] {
        controller.write(part, Some(region)).unwrap();
    }

    controller.await_all_gates().await.unwrap();

    assert_eq!(
        sink.chunks(),
        vec![
            r#"<div id="S:1">"#,
            "Loading...",
            "</div>",
            r#"<template id="U:1">This is a test</template><script id="R:1">u$('1')</script>"#,
        ]
    );
}

#[tokio::test]
async fn test_flush_order_follows_settlement_order() {
    let (controller, sink) = controller();
    let (first_tx, first_rx) = oneshot::channel();
    let (second_tx, second_rx) = oneshot::channel();

    let first = controller.allocate_region();
    controller.register_gate(first, gated_by(first_rx)).unwrap();
    let second = controller.allocate_region();
    controller.register_gate(second, gated_by(second_rx)).unwrap();

    controller.write("one", Some(first)).unwrap();
    controller.write("two", Some(second)).unwrap();

    let waiter = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.await_all_gates().await })
    };

    first_tx.send(()).unwrap();
    wait_for(&sink, "U:1").await;
    assert!(!sink.contents().contains("U:2"));

    second_tx.send(()).unwrap();
    waiter.await.unwrap().unwrap();

    let chunks = sink.chunks();
    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].starts_with(r#"<template id="U:1">one</template>"#));
    assert!(chunks[1].starts_with(r#"<template id="U:2">two</template>"#));
}

#[tokio::test]
async fn test_spawned_gates_settled_before_waiting_flush_in_completion_order() {
    let (controller, sink) = controller();
    let (first_tx, first_rx) = oneshot::channel();
    let (second_tx, second_rx) = oneshot::channel();

    let first = controller.allocate_region();
    controller.spawn_gate(first, gated_by(first_rx)).unwrap();
    let second = controller.allocate_region();
    controller.spawn_gate(second, gated_by(second_rx)).unwrap();

    controller.write("First!", Some(first)).unwrap();
    controller.write("Second!", Some(second)).unwrap();

    first_tx.send(()).unwrap();
    tokio::task::yield_now().await;
    second_tx.send(()).unwrap();
    tokio::task::yield_now().await;

    controller.await_all_gates().await.unwrap();

    assert_eq!(
        sink.chunks(),
        vec![
            r#"<template id="U:1">First!</template><script id="R:1">u$('1')</script>"#,
            r#"<template id="U:2">Second!</template><script id="R:2">u$('2')</script>"#,
        ]
    );
}

#[tokio::test]
async fn test_gates_registered_while_waiting_are_awaited() {
    let (controller, sink) = controller();
    let outer = controller.allocate_region();

    let inner_controller = controller.clone();
    controller
        .register_gate(outer, async move {
            let inner = inner_controller.allocate_region();
            inner_controller.open_tag("div", &format!(r#" id="{}""#, inner.fallback_id()), Some(outer))?;
            inner_controller.write("Loading inner...", Some(outer))?;
            inner_controller.close_tag("div", Some(outer))?;

            let writer = inner_controller.clone();
            inner_controller.register_gate(inner, async move {
                tokio::task::yield_now().await;
                writer.write("Inner ready", Some(inner))
            })?;
            Ok(())
        })
        .unwrap();

    controller.await_all_gates().await.unwrap();
    controller.close().unwrap();

    assert_eq!(
        sink.chunks(),
        vec![
            r#"<template id="U:1"><div id="S:2">Loading inner...</div></template><script id="R:1">u$('1')</script>"#,
            r#"<template id="U:2">Inner ready</template><script id="R:2">u$('2')</script>"#,
        ]
    );
    assert!(sink.is_closed());
}

#[tokio::test]
async fn test_failed_gate_errors_the_stream() {
    let (controller, sink) = controller();
    let region = controller.allocate_region();
    let failure = RenderError::component("Feed", ComponentError::new("offline"));
    let expected = failure.clone();

    controller.write("<p>shell</p>", None).unwrap();
    controller.write("never shown", Some(region)).unwrap();
    controller.register_gate(region, async move { Err(failure) }).unwrap();

    let result = controller.await_all_gates().await;

    assert_eq!(result, Err(RenderError::region(region, expected.clone())));
    assert_eq!(sink.chunks(), vec!["<p>shell</p>"]);
    assert_eq!(sink.failure().map(|e| e.root_cause().clone()), Some(expected));
    assert_eq!(controller.status(), StreamStatus::Errored);
    assert_eq!(controller.write("late", None), Err(RenderError::StreamClosed));
    assert_eq!(controller.close(), Err(RenderError::StreamClosed));
}

#[tokio::test]
async fn test_only_first_failure_reaches_sink() {
    let (controller, sink) = controller();

    controller.fail(RenderError::PendingRegions(2));
    controller.fail(RenderError::StreamClosed);

    assert_eq!(sink.failure(), Some(RenderError::PendingRegions(2)));
    assert_eq!(controller.await_all_gates().await, Err(RenderError::StreamClosed));
}

#[tokio::test]
async fn test_writes_to_flushed_region_are_rejected() {
    let (controller, _sink) = controller();
    let region = controller.allocate_region();
    controller.register_gate(region, ready()).unwrap();
    controller.await_all_gates().await.unwrap();

    assert_eq!(controller.write("late", Some(region)), Err(RenderError::RegionFlushed(region)));
    assert_eq!(
        controller.register_gate(region, ready()),
        Err(RenderError::RegionFlushed(region))
    );
}

#[test]
fn test_region_bookkeeping_errors() {
    let (controller, _sink) = controller();
    let unknown = RegionId::new(7);
    assert_eq!(controller.write("x", Some(unknown)), Err(RenderError::UnknownRegion(unknown)));

    let region = controller.allocate_region();
    controller.register_gate(region, ready()).unwrap();
    assert_eq!(
        controller.register_gate(region, ready()),
        Err(RenderError::GateAlreadyRegistered(region))
    );
}

#[tokio::test]
async fn test_close_requires_settled_regions() {
    let (controller, sink) = controller();
    let region = controller.allocate_region();
    controller.register_gate(region, ready()).unwrap();

    assert_eq!(controller.close(), Err(RenderError::PendingRegions(1)));
    assert!(!sink.is_closed());

    controller.await_all_gates().await.unwrap();
    controller.close().unwrap();
    assert!(sink.is_closed());
    assert_eq!(controller.status(), StreamStatus::Closed);
}

#[test]
#[should_panic(expected = "does not match innermost open tag <span>")]
fn test_mismatched_close_tag_panics() {
    let (controller, _sink) = controller();
    controller.open_tag("div", "", None).unwrap();
    controller.open_tag("span", "", None).unwrap();
    let _ = controller.close_tag("div", None);
}

#[test]
#[should_panic(expected = "unclosed tags")]
fn test_close_with_open_root_tags_panics() {
    let (controller, _sink) = controller();
    controller.open_tag("html", "", None).unwrap();
    let _ = controller.close();
}

#[tokio::test]
async fn test_custom_upgrade_function_and_stats() {
    let sink = MemorySink::new();
    let controller = StreamController::with_upgrade_function(sink.clone(), "__resolve");

    let region = controller.allocate_region();
    controller.register_gate(region, ready()).unwrap();
    controller.write("ok", Some(region)).unwrap();
    controller.write("shell", None).unwrap();
    controller.await_all_gates().await.unwrap();

    assert_eq!(
        sink.chunks()[1],
        r#"<template id="U:1">ok</template><script id="R:1">__resolve('1')</script>"#
    );

    let stats = controller.stats();
    assert_eq!(stats.regions_allocated, 1);
    assert_eq!(stats.regions_flushed, 1);
    assert_eq!(stats.chunks_emitted, 2);
    assert_eq!(stats.bytes_emitted, sink.contents().len());
    assert_eq!(controller.pending_regions(), 0);
}

#[tokio::test]
#[traced_test]
async fn test_region_lifecycle_is_logged() {
    let (controller, _sink) = controller();
    let region = controller.allocate_region();
    controller.register_gate(region, ready()).unwrap();
    controller.await_all_gates().await.unwrap();

    assert!(logs_contain("allocated suspense region"));
    assert!(logs_contain("registered suspense gate"));
    assert!(logs_contain("flushed suspense region"));
}
