//! Stream-driven conversation tests: chunked backend responses run the full
//! multiplexer → orchestrator → office pipeline, including teardown on
//! stream failure.

use futures_util::stream;
use officellm::{
    ConversationSession, MovementState, OfficeConfig, Orchestrator, PositioningBackend,
    space::SharedOfficeSpace,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const DANA_DESK: (f32, f32) = (272.0, 272.0);

fn office() -> SharedOfficeSpace {
    let space = SharedOfficeSpace::new(OfficeConfig::default());
    space.install_grid(320.0, 320.0).unwrap();
    space.wall_perimeter(16.0);
    space.add_agent("gary", 48.0, 48.0);
    space.add_agent("dana", DANA_DESK.0, DANA_DESK.1);
    space
}

fn orchestrator_for(space: &SharedOfficeSpace) -> Arc<Orchestrator> {
    Arc::new(Orchestrator::new(
        Arc::new(space.clone()),
        Arc::new(space.clone()),
        Arc::new(space.clone()),
        OfficeConfig::default(),
    ))
}

fn start_marker(caller: &str, target: &str, query: &str, depth: usize) -> String {
    let payload = json!({
        "toolEvent": {
            "type": "tool_call_start",
            "callerAgentId": caller,
            "targetAgentId": target,
            "query": query,
            "depth": depth,
        }
    });
    format!("\n__TOOL_EVENT__{}__END_TOOL_EVENT__\n", payload)
}

fn end_marker(caller: &str, target: &str, response: &str, depth: usize) -> String {
    let payload = json!({
        "toolEvent": {
            "type": "tool_call_end",
            "callerAgentId": caller,
            "targetAgentId": target,
            "response": response,
            "depth": depth,
        }
    });
    format!("\n__TOOL_EVENT__{}__END_TOOL_EVENT__\n", payload)
}

fn chunks(parts: Vec<String>) -> impl futures_util::Stream<Item = Result<String, String>> + Unpin {
    stream::iter(parts.into_iter().map(Ok).collect::<Vec<_>>())
}

#[tokio::test(start_paused = true)]
async fn test_stream_runs_consultation_and_rebuilds_transcript() {
    let space = office();
    let orchestrator = orchestrator_for(&space);
    let ticker = space.spawn_ticker(Duration::from_millis(50));

    let start = start_marker("gary", "dana", "What were the Q3 numbers?", 0);
    let end = end_marker("gary", "dana", "Q3 revenue was up 4%", 0);

    // Split the wire text awkwardly, including through a sentinel.
    let (start_a, start_b) = start.split_at(9);
    let mut session = ConversationSession::new(Arc::clone(&orchestrator));
    let transcript = session
        .run_stream(chunks(vec![
            "Let me check with Dana.".to_string(),
            start_a.to_string(),
            start_b.to_string(),
            end.to_string(),
            "Dana says revenue was up 4% in Q3.".to_string(),
        ]))
        .await
        .unwrap();

    assert_eq!(
        transcript,
        "Let me check with Dana.Dana says revenue was up 4% in Q3."
    );

    // The consultation ran to completion: dana is back at her desk and all
    // bookkeeping is swept.
    let dana = space.agent_position("dana").unwrap();
    assert_eq!((dana.x, dana.y), DANA_DESK);
    assert_eq!(space.agent_state("dana"), Some(MovementState::Working));
    assert!(orchestrator.frames().is_empty());
    assert!(space.bubbles().is_empty());

    ticker.abort();
}

#[tokio::test(start_paused = true)]
async fn test_stream_error_apologizes_and_tears_down() {
    let space = office();
    let orchestrator = orchestrator_for(&space);
    let ticker = space.spawn_ticker(Duration::from_millis(50));

    let start = start_marker("gary", "dana", "quick question", 0);
    let items: Vec<Result<String, String>> = vec![
        Ok("Hold on.".to_string()),
        Ok(start),
        Err("connection reset".to_string()),
    ];

    let mut session = ConversationSession::new(Arc::clone(&orchestrator));
    let err = session.run_stream(stream::iter(items)).await.unwrap_err();
    assert_eq!(err, "connection reset");

    // The apology is in the transcript; the consultation infrastructure is
    // fully reset even though no tool_call_end ever arrived.
    assert!(session.transcript().starts_with("Hold on."));
    assert!(session.transcript().contains("lost my train of thought"));
    assert!(orchestrator.frames().is_empty());
    assert!(space.bubbles().is_empty());

    // Dana was mid-consultation at gary's desk; the teardown walks her home.
    tokio::time::sleep(Duration::from_secs(10)).await;
    let dana = space.agent_position("dana").unwrap();
    assert_eq!((dana.x, dana.y), DANA_DESK);
    assert_eq!(space.agent_state("dana"), Some(MovementState::Working));

    ticker.abort();
}

#[tokio::test(start_paused = true)]
async fn test_unmatched_events_do_not_disturb_the_transcript() {
    let space = office();
    let orchestrator = orchestrator_for(&space);
    let ticker = space.spawn_ticker(Duration::from_millis(50));

    // A start for someone who doesn't work here, and an end with no start.
    let bogus_start = start_marker("gary", "mallory", "hi?", 0);
    let orphan_end = end_marker("gary", "dana", "never asked", 0);

    let mut session = ConversationSession::new(Arc::clone(&orchestrator));
    let transcript = session
        .run_stream(chunks(vec![
            "Before.".to_string(),
            bogus_start,
            orphan_end,
            "After.".to_string(),
        ]))
        .await
        .unwrap();

    assert_eq!(transcript, "Before.After.");
    assert!(orchestrator.frames().is_empty());
    assert_eq!(space.agent_state("dana"), Some(MovementState::Working));

    ticker.abort();
}
