use super::*;
use tokio::time::{advance, timeout};

fn snap(html: &str) -> PreviewSnapshot {
    PreviewSnapshot { html: html.into(), ..PreviewSnapshot::default() }
}

const DELAY: Duration = Duration::from_millis(DEFAULT_PREVIEW_DEBOUNCE_MS);

#[tokio::test(start_paused = true)]
async fn single_edit_publishes_after_delay() {
    let mut debouncer = Debouncer::new(DELAY);
    let mut rx = debouncer.subscribe();
    let edited_at = Instant::now();
    debouncer.schedule(snap("<p>hello</p>"));

    advance(Duration::from_millis(499)).await;
    assert!(!rx.has_changed().unwrap());
    assert_eq!(debouncer.current(), PreviewSnapshot::default());

    rx.changed().await.unwrap();
    let elapsed = Instant::now() - edited_at;
    assert!(elapsed >= DELAY && elapsed < DELAY + Duration::from_millis(10));
    assert_eq!(rx.borrow_and_update().html, "<p>hello</p>");
    assert_eq!(debouncer.current().html, "<p>hello</p>");
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_publish_once_with_final_value() {
    let mut debouncer = Debouncer::new(DELAY);
    let mut rx = debouncer.subscribe();

    debouncer.schedule(snap("<p>a"));
    advance(Duration::from_millis(200)).await;
    debouncer.schedule(snap("<p>ab"));
    advance(Duration::from_millis(200)).await;
    let last_edit = Instant::now();
    debouncer.schedule(snap("<p>abc"));

    // 899ms after the first edit and 499ms after the last: nothing yet.
    advance(Duration::from_millis(499)).await;
    assert!(!rx.has_changed().unwrap());

    rx.changed().await.unwrap();
    let elapsed = Instant::now() - last_edit;
    assert!(elapsed >= DELAY && elapsed < DELAY + Duration::from_millis(10));
    assert_eq!(rx.borrow_and_update().html, "<p>abc");

    let extra = timeout(Duration::from_secs(5), rx.changed()).await;
    assert!(extra.is_err(), "expected exactly one preview update");
}

#[tokio::test(start_paused = true)]
async fn cancel_drops_pending_update() {
    let mut debouncer = Debouncer::new(DELAY);
    let mut rx = debouncer.subscribe();
    debouncer.schedule(snap("<p>never</p>"));
    advance(Duration::from_millis(100)).await;
    debouncer.cancel();

    let result = timeout(Duration::from_secs(2), rx.changed()).await;
    assert!(result.is_err());
    assert_eq!(debouncer.current(), PreviewSnapshot::default());
}

#[tokio::test(start_paused = true)]
async fn edits_after_publish_start_a_new_window() {
    let mut debouncer = Debouncer::new(DELAY);
    let mut rx = debouncer.subscribe();

    debouncer.schedule(snap("one"));
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().html, "one");

    debouncer.schedule(snap("two"));
    advance(Duration::from_millis(250)).await;
    assert!(!rx.has_changed().unwrap());
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().html, "two");
}

#[tokio::test(start_paused = true)]
async fn unchanged_snapshot_is_not_republished() {
    let mut debouncer = Debouncer::new(DELAY);
    let mut rx = debouncer.subscribe();

    debouncer.schedule(snap("one"));
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().html, "one");

    debouncer.schedule(snap("one"));
    let extra = timeout(Duration::from_secs(2), rx.changed()).await;
    assert!(extra.is_err(), "identical snapshot must not notify subscribers");
    assert_eq!(debouncer.current().html, "one");
}

#[tokio::test(start_paused = true)]
async fn edit_and_revert_inside_window_publishes_nothing() {
    let mut debouncer = Debouncer::new(DELAY);
    let mut rx = debouncer.subscribe();

    debouncer.schedule(snap("draft"));
    advance(Duration::from_millis(100)).await;
    debouncer.schedule(PreviewSnapshot::default());

    let extra = timeout(Duration::from_secs(2), rx.changed()).await;
    assert!(extra.is_err());
}

#[test]
fn delay_is_reported() {
    let debouncer = Debouncer::new(Duration::from_millis(42));
    assert_eq!(debouncer.delay(), Duration::from_millis(42));
}
