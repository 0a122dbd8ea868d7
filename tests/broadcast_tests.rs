// Broadcast events: wire shape and fan-out behavior.

use meet_scribe::broadcast::{BroadcastEvent, Broadcaster, EventKind};

#[test]
fn events_serialize_with_snake_case_kind() {
    let event = BroadcastEvent::new(EventKind::RecordingStarted, "recording started");
    let json = serde_json::to_value(&event).expect("serialize");

    assert_eq!(json["type"], "recording_started");
    assert_eq!(json["message"], "recording started");
    // No duration on a plain event.
    assert!(json.get("duration_secs").is_none());
}

#[test]
fn recording_started_carries_the_duration() {
    let broadcaster = Broadcaster::new(8);
    let mut rx = broadcaster.subscribe();
    broadcaster.recording_started("recording started", 7200);

    let event = rx.try_recv().expect("event delivered");
    assert_eq!(event.kind, EventKind::RecordingStarted);
    assert_eq!(event.duration_secs, Some(7200));

    let json = serde_json::to_value(&event).expect("serialize");
    assert_eq!(json["duration_secs"], 7200);
}

#[tokio::test]
async fn send_without_observers_is_not_an_error() {
    let broadcaster = Broadcaster::new(8);
    // No subscribers at all; must not panic or error.
    broadcaster.status("nobody is listening");
}

#[tokio::test]
async fn every_observer_receives_every_event() {
    let broadcaster = Broadcaster::new(8);
    let mut first = broadcaster.subscribe();
    let mut second = broadcaster.subscribe();

    broadcaster.status("step one");
    broadcaster.success("step two");

    for rx in [&mut first, &mut second] {
        assert_eq!(rx.try_recv().expect("first event").kind, EventKind::Status);
        assert_eq!(rx.try_recv().expect("second event").kind, EventKind::Success);
    }
}

#[tokio::test]
async fn dropped_observers_do_not_block_the_rest() {
    let broadcaster = Broadcaster::new(8);
    let gone = broadcaster.subscribe();
    let mut alive = broadcaster.subscribe();

    drop(gone);
    broadcaster.status("still flowing");

    assert_eq!(alive.try_recv().expect("event").kind, EventKind::Status);
}
