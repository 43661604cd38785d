//! Property-based tests for the turn state machine
//!
//! These tests verify key invariants hold across all possible event orders.

use super::transition::*;
use super::*;
use crate::continuation::ContinuationToken;
use crate::decoder::StreamEvent;
use crate::transcript::{Lifecycle, Stage, TranscriptEntry};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_refs() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("https://[a-z]{3,8}\\.com/[a-z0-9]{0,6}", 0..4)
}

fn arb_content() -> impl Strategy<Value = StreamEvent> {
    "[a-zA-Z0-9 .,!?]{0,12}".prop_map(|text| StreamEvent::Content { text })
}

/// Any non-terminal stream event
fn arb_body_event() -> impl Strategy<Value = StreamEvent> {
    prop_oneof![
        4 => arb_content(),
        1 => "[a-z0-9-]{4,12}".prop_map(|token| StreamEvent::Checkpoint {
            token: ContinuationToken::new(token)
        }),
        1 => "[a-z ]{1,20}".prop_map(|query| StreamEvent::SearchStart { query }),
        1 => arb_refs().prop_map(|refs| StreamEvent::SearchResults { refs }),
        1 => "[a-z ]{1,20}".prop_map(|message| StreamEvent::SearchError { message }),
    ]
}

fn arb_body() -> impl Strategy<Value = Vec<StreamEvent>> {
    proptest::collection::vec(arb_body_event(), 0..24)
}

fn arb_interruption() -> impl Strategy<Value = TurnEvent> {
    prop_oneof![
        "[a-z ]{1,20}".prop_map(|message| TurnEvent::TransportFailed { message }),
        Just(TurnEvent::ChannelClosed),
        Just(TurnEvent::Cancelled),
    ]
}

// ============================================================================
// Test Helpers
// ============================================================================

fn content_of(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::Content { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// Apply every event, returning each intermediate entry (including the start)
fn trace(events: Vec<TurnEvent>) -> Vec<TranscriptEntry> {
    let mut entries = vec![TranscriptEntry::assistant_placeholder()];
    for event in events {
        let current = entries.last().unwrap();
        let next = transition(current, event).unwrap().entry;
        entries.push(next);
    }
    entries
}

fn stages(entry: &TranscriptEntry) -> Vec<Stage> {
    entry
        .tool_activity
        .as_ref()
        .map(|activity| activity.stages.clone())
        .unwrap_or_default()
}

fn with_end(body: Vec<StreamEvent>) -> Vec<TurnEvent> {
    body.into_iter()
        .chain(std::iter::once(StreamEvent::End))
        .map(TurnEvent::Stream)
        .collect()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    // Invariant 1: Final text is the in-order concatenation of content fragments
    #[test]
    fn prop_text_is_concatenated_content(body in arb_body()) {
        let expected = content_of(&body);
        let entries = trace(with_end(body));
        let last = entries.last().unwrap();
        prop_assert_eq!(&last.text, &expected);
        prop_assert_eq!(last.lifecycle, Lifecycle::Complete);
    }

    // Invariant 2: Stages only grow, and every earlier stage list is a prefix
    #[test]
    fn prop_stages_never_lose_history(body in arb_body()) {
        let entries = trace(with_end(body));
        for pair in entries.windows(2) {
            let before = stages(&pair[0]);
            let after = stages(&pair[1]);
            prop_assert!(after.len() >= before.len());
            prop_assert_eq!(&after[..before.len()], &before[..]);
        }
    }

    // Invariant 3: No stage appears twice in a row
    #[test]
    fn prop_no_consecutive_duplicate_stages(body in arb_body()) {
        let entries = trace(with_end(body));
        let final_stages = stages(entries.last().unwrap());
        for pair in final_stages.windows(2) {
            prop_assert_ne!(pair[0], pair[1]);
        }
    }

    // Invariant 4: Text only grows while in flight
    #[test]
    fn prop_text_only_grows(body in arb_body()) {
        let entries = trace(with_end(body));
        for pair in entries.windows(2) {
            prop_assert!(pair[1].text.starts_with(&pair[0].text));
        }
    }

    // Invariant 5: Query is fixed once the first stage records it
    #[test]
    fn prop_query_fixed_once_set(body in arb_body()) {
        let entries = trace(with_end(body));
        let first = entries
            .iter()
            .find_map(|entry| entry.tool_activity.as_ref().map(|a| a.query.clone()));
        if let Some(first) = first {
            for entry in &entries {
                if let Some(activity) = &entry.tool_activity {
                    prop_assert_eq!(&activity.query, &first);
                }
            }
        }
    }

    // Invariant 6: Replaying search results is idempotent
    #[test]
    fn prop_replayed_results_idempotent(body in arb_body(), refs in arb_refs()) {
        let event = TurnEvent::Stream(StreamEvent::SearchResults { refs: refs.clone() });
        let mut events: Vec<TurnEvent> = body.into_iter().map(TurnEvent::Stream).collect();
        events.push(event.clone());
        let once = trace(events).pop().unwrap();
        let twice = transition(&once, event).unwrap().entry;

        prop_assert_eq!(&twice, &once);
        let activity = twice.tool_activity.unwrap();
        prop_assert_eq!(activity.result_refs, refs);
        prop_assert_eq!(activity.stages.last(), Some(&Stage::Reading));
    }

    // Invariant 7: Finalized entries reject every further event
    #[test]
    fn prop_finalized_entries_are_immutable(body in arb_body(), late in arb_body_event()) {
        let finished = trace(with_end(body)).pop().unwrap();
        let result = transition(&finished, TurnEvent::Stream(late));
        let rejected = matches!(result, Err(TransitionError::EntryFinalized { .. }));
        prop_assert!(rejected);
    }

    // Invariant 8: Interruptions keep partial text, or fail with a fixed message
    #[test]
    fn prop_interruption_preserves_partial_output(body in arb_body(), interruption in arb_interruption()) {
        let expected = content_of(&body);
        let mut events: Vec<TurnEvent> = body.into_iter().map(TurnEvent::Stream).collect();
        events.push(interruption);
        let last = trace(events).pop().unwrap();

        if expected.is_empty() {
            prop_assert_eq!(last.lifecycle, Lifecycle::Failed);
            prop_assert!(
                last.text == STREAM_ERROR_MESSAGE || last.text == CANCELLED_MESSAGE,
                "Unexpected fallback text: {}",
                last.text
            );
        } else {
            prop_assert_eq!(last.lifecycle, Lifecycle::Complete);
            prop_assert_eq!(last.text, expected);
        }
    }

    // Invariant 9: Checkpoints never touch the entry
    #[test]
    fn prop_checkpoint_leaves_entry_unchanged(body in arb_body(), token in "[a-z0-9]{1,12}") {
        let current = trace(body.into_iter().map(TurnEvent::Stream).collect()).pop().unwrap();
        let token = ContinuationToken::new(token);
        let result = transition(
            &current,
            TurnEvent::Stream(StreamEvent::Checkpoint { token: token.clone() }),
        )
        .unwrap();
        prop_assert_eq!(result.entry, current);
        prop_assert_eq!(result.effects, vec![Effect::UpdateContinuation { token }]);
    }

    // Invariant 10: Only terminal events ask for the channel to close
    #[test]
    fn prop_only_terminal_events_close(event in arb_body_event()) {
        let result = transition(&TranscriptEntry::assistant_placeholder(), TurnEvent::Stream(event)).unwrap();
        prop_assert!(!result.closes_channel());
    }
}

#[test]
fn test_weather_scenario() {
    let entries = trace(with_end(vec![
        StreamEvent::SearchStart {
            query: "weather".into(),
        },
        StreamEvent::SearchResults {
            refs: vec!["u1".into(), "u2".into()],
        },
        StreamEvent::Content {
            text: "It is sunny".into(),
        },
    ]));
    let last = entries.last().unwrap();
    assert_eq!(last.text, "It is sunny");
    assert_eq!(last.lifecycle, Lifecycle::Complete);
    let activity = last.tool_activity.as_ref().unwrap();
    assert_eq!(
        activity.stages,
        vec![Stage::Searching, Stage::Reading, Stage::Writing]
    );
    assert_eq!(activity.result_refs, vec!["u1", "u2"]);
}
