use std::sync::atomic::Ordering;
use std::time::Duration;

use joinwatch_config::throttle::CooldownPolicy;
use joinwatch_types::{OcrCandidate, Point, Rect, RegionId, RegionStatus, WatchEvent};
use tokio::time::timeout;

use super::fakes::{
    FakeCapture, FakeEngine, JOIN_TEXT, gradient, harness, harness_with_capacity, solid, test_config,
};

const SURFACE: Rect = Rect::new(0, 0, 400, 200);

fn cell() -> RegionId {
    RegionId::for_cell(0, 0, 0)
}

#[tokio::test]
async fn test_identical_crop_hits_cache() {
    let capture = FakeCapture::single(SURFACE, gradient(400, 200));
    let captures = capture.captures.clone();
    let engine = FakeEngine::reading("hello there");
    let calls = engine.calls.clone();

    let h = harness(test_config(1, 1), capture, vec![engine]).await;

    let first = h.scheduler.run_cycle().await;
    assert_eq!(first.ocr_calls, 1);
    assert_eq!(first.cache_hits, 0);

    let second = timeout(Duration::from_secs(2), h.scheduler.run_cycle())
        .await
        .unwrap();
    assert_eq!(second.cycle, 2);
    assert_eq!(second.cache_hits, 1);
    assert_eq!(second.ocr_calls, 0);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(captures.load(Ordering::SeqCst), 2);
    assert_eq!(h.state.recognitions.stats().hits, 1);
}

#[tokio::test]
async fn test_match_triggers_and_cools_down() {
    let engine = FakeEngine::reading(JOIN_TEXT);
    let calls = engine.calls.clone();
    let h = harness(
        test_config(1, 1),
        FakeCapture::single(SURFACE, gradient(400, 200)),
        vec![engine],
    )
    .await;

    let report = h.scheduler.run_cycle().await;
    assert_eq!(report.matches, 1);
    assert_eq!(report.triggered, 1);

    match h.rx.try_recv().unwrap() {
        Some(WatchEvent::Triggered {
            region_id,
            anchor,
            text,
            phrase,
        }) => {
            assert_eq!(region_id, cell());
            // engine anchor (10, 10) inside the bottom 50px strip
            assert_eq!(anchor, Point::new(10, 160));
            assert_eq!(text, JOIN_TEXT);
            assert_eq!(phrase, JOIN_TEXT);
        }
        other => panic!("expected a trigger, got {other:?}"),
    }
    // only actionable events travel on the queue
    assert!(h.rx.try_recv().unwrap().is_none());

    {
        let registry = h.state.registry.lock();
        let region = registry.get(&cell()).unwrap();
        assert_eq!(region.status, RegionStatus::Cooldown);
        assert_eq!(region.trigger_count, 1);
        assert!(region.detected_text.is_none());
    }
    assert_eq!(h.state.throttler.backoff(&cell()), Some(Duration::from_secs(5)));

    // cooling regions are not selected
    let next = h.scheduler.run_cycle().await;
    assert_eq!(next.selected, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let strategies = h.state.selector.stats();
    assert_eq!(strategies[0].attempts, 1);
    assert_eq!(strategies[0].successes, 1);
}

#[tokio::test]
async fn test_throttler_holds_after_short_cooldown() {
    let mut config = test_config(1, 1);
    config.throttle.cooldown_policy = CooldownPolicy::Fixed;
    config.throttle.cooldown_seconds = 0.05;

    // new content on the second capture, so the match is re-evaluated
    let h = harness(
        config,
        FakeCapture::sequence(SURFACE, vec![gradient(400, 200), solid(400, 200, 0)]),
        vec![FakeEngine::reading(JOIN_TEXT)],
    )
    .await;

    assert_eq!(h.scheduler.run_cycle().await.triggered, 1);
    tokio::time::sleep(Duration::from_millis(120)).await;

    let report = h.scheduler.run_cycle().await;
    assert_eq!(report.selected, 1);
    assert_eq!(report.unchanged, 0);
    assert_eq!(report.ocr_calls, 1);
    assert_eq!(report.throttled, 1);
    assert_eq!(report.triggered, 0);

    let registry = h.state.registry.lock();
    assert_eq!(registry.get(&cell()).unwrap().status, RegionStatus::Idle);
    assert_eq!(h.state.throttler.stats().throttled_count, 1);
}

#[tokio::test]
async fn test_slow_engine_times_out_without_caching() {
    let mut config = test_config(1, 1);
    config.ocr.timeout_ms = 50;

    let h = harness(
        config,
        FakeCapture::single(SURFACE, gradient(400, 200)),
        vec![FakeEngine::reading(JOIN_TEXT).slow(Duration::from_millis(300))],
    )
    .await;

    let report = timeout(Duration::from_secs(2), h.scheduler.run_cycle())
        .await
        .unwrap();
    assert_eq!(report.timeouts, 1);
    assert_eq!(report.triggered, 0);
    assert!(h.state.recognitions.is_empty());

    let registry = h.state.registry.lock();
    assert_eq!(registry.get(&cell()).unwrap().status, RegionStatus::Idle);
}

#[tokio::test]
async fn test_saturated_pool_defers_region() {
    let mut config = test_config(1, 2);
    config.ocr.lease_timeout_ms = 20;

    let h = harness(
        config,
        FakeCapture::single(SURFACE, gradient(400, 200)),
        vec![FakeEngine::reading("hello there").slow(Duration::from_millis(300))],
    )
    .await;

    let report = timeout(Duration::from_secs(3), h.scheduler.run_cycle())
        .await
        .unwrap();
    assert_eq!(report.selected, 2);
    assert_eq!(report.scanned, 1);
    assert_eq!(report.deferred, 1);

    // deferred regions stay eligible
    let registry = h.state.registry.lock();
    assert_eq!(registry.eligible_for_capture().len(), 2);
}

#[tokio::test]
async fn test_scan_area_outside_capture_is_skipped() {
    let engine = FakeEngine::reading(JOIN_TEXT);
    let calls = engine.calls.clone();

    // surface claims 200px but the capture is only 100px tall
    let h = harness(
        test_config(1, 1),
        FakeCapture::single(SURFACE, gradient(400, 100)),
        vec![engine],
    )
    .await;

    let report = h.scheduler.run_cycle().await;
    assert_eq!(report.out_of_bounds, 1);
    assert_eq!(report.scanned, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_fresh_frame_is_shared() {
    let mut config = test_config(1, 2);
    config.scan.capture_freshness_ms = 60_000;

    let capture = FakeCapture::single(SURFACE, gradient(400, 200));
    let captures = capture.captures.clone();
    let h = harness(config, capture, vec![FakeEngine::reading("hello there")]).await;

    h.scheduler.run_cycle().await;
    h.scheduler.run_cycle().await;

    assert_eq!(captures.load(Ordering::SeqCst), 1);
    assert_eq!(h.scheduler.frames().captures(), 1);
}

#[tokio::test]
async fn test_capture_failure_fails_surface_regions() {
    let engine = FakeEngine::reading(JOIN_TEXT);
    let calls = engine.calls.clone();
    let h = harness(test_config(1, 2), FakeCapture::broken(SURFACE), vec![engine]).await;

    let report = h.scheduler.run_cycle().await;
    assert_eq!(report.failures, 2);
    assert_eq!(report.ocr_calls, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.state.registry.lock().stats().idle, 2);
}

#[tokio::test]
async fn test_candidate_policy() {
    let candidates = vec![
        OcrCandidate::new("hello there", 0.99),
        OcrCandidate::new(JOIN_TEXT, 0.6).with_anchor(Point::new(4, 4)),
    ];

    let blended = harness(
        test_config(1, 1),
        FakeCapture::single(SURFACE, gradient(400, 200)),
        vec![FakeEngine::new(candidates.clone())],
    )
    .await;
    assert_eq!(blended.scheduler.run_cycle().await.triggered, 1);

    let mut config = test_config(1, 1);
    config.scan.multi_candidate = false;
    let confident = harness(
        config,
        FakeCapture::single(SURFACE, gradient(400, 200)),
        vec![FakeEngine::new(candidates)],
    )
    .await;
    let report = confident.scheduler.run_cycle().await;
    assert_eq!(report.scanned, 1);
    assert_eq!(report.matches, 0);
}

fn fast_backoff(mut config: joinwatch_config::Config) -> joinwatch_config::Config {
    config.throttle.base_seconds = 0.05;
    config.throttle.max_seconds = 1.0;
    config
}

#[tokio::test]
async fn test_static_screen_fires_once() {
    let engine = FakeEngine::reading(JOIN_TEXT);
    let calls = engine.calls.clone();
    let h = harness(
        fast_backoff(test_config(1, 1)),
        FakeCapture::single(SURFACE, gradient(400, 200)),
        vec![engine],
    )
    .await;

    let mut triggered = 0;
    let mut unchanged = 0;
    for _ in 0..4 {
        let report = h.scheduler.run_cycle().await;
        triggered += report.triggered;
        unchanged += report.unchanged;
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    assert_eq!(triggered, 1);
    assert_eq!(unchanged, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.drain_triggers(), vec![cell()]);
    assert_eq!(h.state.registry.lock().get(&cell()).unwrap().trigger_count, 1);
    assert_eq!(h.state.changes.stats().unchanged, 3);
}

#[tokio::test]
async fn test_new_content_fires_again() {
    let frames = vec![
        gradient(400, 200),
        gradient(400, 200),
        solid(400, 200, 0),
    ];
    let h = harness(
        fast_backoff(test_config(1, 1)),
        FakeCapture::sequence(SURFACE, frames),
        vec![FakeEngine::reading(JOIN_TEXT)],
    )
    .await;

    let mut triggered = Vec::new();
    for _ in 0..3 {
        triggered.push(h.scheduler.run_cycle().await.triggered);
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    assert_eq!(triggered, vec![1, 0, 1]);
    assert_eq!(h.drain_triggers().len(), 2);
}

#[tokio::test]
async fn test_idle_cycles_leave_room_for_triggers() {
    let h = harness_with_capacity(
        test_config(1, 1),
        FakeCapture::single(SURFACE, gradient(400, 200)),
        vec![FakeEngine::reading(JOIN_TEXT)],
        2,
    )
    .await;

    h.state.registry.lock().set_enabled(&cell(), false).unwrap();
    for _ in 0..3 {
        assert_eq!(h.scheduler.run_cycle().await.selected, 0);
    }
    assert!(h.rx.try_recv().unwrap().is_none());

    h.state.registry.lock().set_enabled(&cell(), true).unwrap();
    assert_eq!(h.scheduler.run_cycle().await.triggered, 1);
    assert_eq!(h.drain_triggers(), vec![cell()]);
}

#[tokio::test]
async fn test_dropped_trigger_fires_after_cooldown() {
    let mut config = fast_backoff(test_config(1, 1));
    config.throttle.cooldown_policy = CooldownPolicy::Fixed;
    config.throttle.cooldown_seconds = 0.05;

    let h = harness_with_capacity(
        config,
        FakeCapture::single(SURFACE, gradient(400, 200)),
        vec![FakeEngine::reading(JOIN_TEXT)],
        1,
    )
    .await;

    // the event loop is stuck, the queue is full
    assert!(h.tx.try_send(WatchEvent::LayoutRebuilt { regions: 1 }).unwrap());
    assert_eq!(h.scheduler.run_cycle().await.triggered, 1);
    assert!(h.drain_triggers().is_empty());
    assert_eq!(h.state.changes.stats().tracked, 0);

    tokio::time::sleep(Duration::from_millis(150)).await;
    let report = h.scheduler.run_cycle().await;
    assert_eq!(report.unchanged, 0);
    assert_eq!(report.triggered, 1);
    assert_eq!(h.drain_triggers(), vec![cell()]);
    assert_eq!(h.state.changes.stats().tracked, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_overlapping_cycles_trigger_once() {
    let engines = vec![
        FakeEngine::reading(JOIN_TEXT).slow(Duration::from_millis(50)),
        FakeEngine::reading(JOIN_TEXT).slow(Duration::from_millis(50)),
    ];
    let h = harness(
        test_config(1, 1),
        FakeCapture::single(SURFACE, gradient(400, 200)),
        engines,
    )
    .await;

    let (a, b) = timeout(Duration::from_secs(3), async {
        tokio::join!(h.scheduler.run_cycle(), h.scheduler.run_cycle())
    })
    .await
    .unwrap();

    assert_eq!(a.selected + b.selected, 2);
    assert_eq!(a.triggered + b.triggered, 1);
    assert_eq!(h.drain_triggers(), vec![cell()]);

    let registry = h.state.registry.lock();
    let region = registry.get(&cell()).unwrap();
    assert_eq!(region.trigger_count, 1);
    assert_eq!(region.status, RegionStatus::Cooldown);
}
