#![allow(clippy::unwrap_used)]
// Blink sequencing and button handling against an in-memory device, with
// tokio's clock paused so timings are exact.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::time::{Instant, sleep};

use blinker_core::{DefaultMode, Palette, Pattern, SequenceOutcome, SimulatedLine};

use common::{FakeDevice, blinker, config, secs};

const BLUE: blinker_core::Color = Palette::RGBW.blue;
const WHITE: blinker_core::Color = Palette::RGBW.white;
const RED: blinker_core::Color = Palette::RGBW.red;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

// ── Control-surface triggers ────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn short_press_blinks_then_reverts_once() {
    let device = FakeDevice::new(30);
    let line = Arc::new(SimulatedLine::new());
    let app = blinker(&device, &line, config());
    assert!(app.device().connect().await);

    let outcome = app.trigger_short_press().await;

    assert!(matches!(outcome, SequenceOutcome::Completed), "{outcome:?}");
    let pushes = device.pushes();
    let (last, blinks) = pushes.split_last().unwrap();
    assert!(last.is_effect(common::DEFAULT_EFFECT));
    assert!((4.99..5.05).contains(&secs(last.at)), "revert at {:?}", last.at);
    assert_eq!(device.reverts().len(), 1);

    // Blue and white alternate every half flash interval.
    assert!((19..=21).contains(&blinks.len()), "{} blinks", blinks.len());
    for (i, push) in blinks.iter().enumerate() {
        let expected = if i % 2 == 0 { BLUE } else { WHITE };
        assert_eq!(push.color(), Some(expected), "blink {i}");
    }
    let gap = blinks[1].at - blinks[0].at;
    assert!((ms(250)..ms(260)).contains(&gap), "toggled after {gap:?}");

    assert!(!app.sequencer().is_active());
    assert_eq!(app.sequencer().pattern(), Pattern::None);
    assert_eq!(app.health().button_press_count, 1);
}

#[tokio::test(start_paused = true)]
async fn simulated_long_press_runs_for_threshold() {
    let device = FakeDevice::new(30);
    let line = Arc::new(SimulatedLine::new());
    let app = blinker(&device, &line, config());
    assert!(app.device().connect().await);

    let outcome = app.trigger_long_press().await;

    assert!(matches!(outcome, SequenceOutcome::Completed), "{outcome:?}");
    let pushes = device.pushes();
    let (last, blinks) = pushes.split_last().unwrap();
    assert!((2.99..3.05).contains(&secs(last.at)));
    assert!(last.is_effect(common::DEFAULT_EFFECT));
    assert_eq!(blinks[0].color(), Some(RED));
    assert!(blinks[1].color().is_some_and(|c| c.is_off()));
    assert_eq!(blinks[1].payload.bri, 0);
}

#[tokio::test(start_paused = true)]
async fn white_default_reverts_to_white() {
    let device = FakeDevice::new(30);
    let line = Arc::new(SimulatedLine::new());
    let mut cfg = config();
    cfg.default_mode = DefaultMode::White;
    cfg.brightness = 180;
    let app = blinker(&device, &line, cfg);
    assert!(app.device().connect().await);

    app.trigger_long_press().await;

    let last = device.pushes().pop().unwrap();
    assert_eq!(last.color(), Some(WHITE));
    assert_eq!(last.payload.bri, 180);
}

#[tokio::test(start_paused = true)]
async fn rgb_strip_uses_three_channel_colors() {
    let device = FakeDevice::new(30);
    let line = Arc::new(SimulatedLine::new());
    let mut cfg = config();
    cfg.rgbw = false;
    let app = blinker(&device, &line, cfg);
    assert!(app.device().connect().await);

    app.trigger_short_press().await;

    let pushes = device.pushes();
    assert_eq!(pushes[0].color(), Some(Palette::RGB.blue));
    assert_eq!(pushes[1].color(), Some(Palette::RGB.white));
}

// ── Pre-emption ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn held_button_escalates_short_run_to_alert() {
    let device = FakeDevice::new(30);
    let line = Arc::new(SimulatedLine::new());
    let app = blinker(&device, &line, config());
    assert!(app.device().connect().await);

    let run = tokio::spawn({
        let app = app.clone();
        async move { app.trigger_short_press().await }
    });

    sleep(ms(500)).await;
    line.press();
    sleep(ms(3500)).await;
    line.release();

    let outcome = run.await.unwrap();
    assert!(matches!(outcome, SequenceOutcome::Escalated), "{outcome:?}");

    let pushes = device.pushes();
    let first_red = pushes
        .iter()
        .position(|p| p.color() == Some(RED))
        .expect("alert never started");
    assert!(
        (3.5..3.53).contains(&secs(pushes[first_red].at)),
        "alert started at {:?}",
        pushes[first_red].at
    );
    assert!(
        pushes[first_red..]
            .iter()
            .all(|p| p.color() != Some(BLUE) && p.color() != Some(WHITE)),
        "short pattern pushed after escalation"
    );

    let reverts = device.reverts();
    assert_eq!(reverts.len(), 1);
    assert!((4.0..4.03).contains(&secs(reverts[0].at)), "{:?}", reverts[0].at);
    assert!(pushes.last().unwrap().is_effect(common::DEFAULT_EFFECT));
}

#[tokio::test(start_paused = true)]
async fn hold_past_window_falls_through_to_full_alert() {
    let device = FakeDevice::new(30);
    let line = Arc::new(SimulatedLine::new());
    let app = blinker(&device, &line, config());
    assert!(app.device().connect().await);

    let run = tokio::spawn({
        let app = app.clone();
        async move { app.trigger_short_press().await }
    });

    sleep(ms(500)).await;
    line.press();
    sleep(ms(8500)).await;
    line.release();

    let outcome = run.await.unwrap();
    assert!(matches!(outcome, SequenceOutcome::Escalated), "{outcome:?}");

    // Window closes at 5 s, then a full 5 s alert.
    let reverts = device.reverts();
    assert_eq!(reverts.len(), 1);
    assert!((10.0..10.05).contains(&secs(reverts[0].at)), "{:?}", reverts[0].at);
}

#[tokio::test(start_paused = true)]
async fn newer_sequence_preempts_running_one() {
    let device = FakeDevice::new(30);
    let line = Arc::new(SimulatedLine::new());
    let app = blinker(&device, &line, config());
    assert!(app.device().connect().await);

    let short = tokio::spawn({
        let app = app.clone();
        async move { app.trigger_short_press().await }
    });
    sleep(ms(1000)).await;
    assert_eq!(app.sequencer().pattern(), Pattern::Short);

    let long = tokio::spawn({
        let app = app.clone();
        async move { app.trigger_long_press().await }
    });

    let short = short.await.unwrap();
    let long = long.await.unwrap();
    assert!(matches!(short, SequenceOutcome::Cancelled), "{short:?}");
    assert!(matches!(long, SequenceOutcome::Completed), "{long:?}");

    let pushes = device.pushes();
    let first_red = pushes.iter().position(|p| p.color() == Some(RED)).unwrap();
    let revert_positions: Vec<usize> = pushes
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_effect(common::DEFAULT_EFFECT))
        .map(|(i, _)| i)
        .collect();

    // One revert per sequence; the cancelled one lands before the alert.
    assert_eq!(revert_positions.len(), 2);
    assert!(revert_positions[0] < first_red);
    assert_eq!(revert_positions[1], pushes.len() - 1);
    assert!(
        pushes[first_red..]
            .iter()
            .all(|p| p.color() != Some(BLUE) && p.color() != Some(WHITE))
    );
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_within_a_tick() {
    let device = FakeDevice::new(30);
    let line = Arc::new(SimulatedLine::new());
    let app = blinker(&device, &line, config());
    assert!(app.device().connect().await);

    let run = tokio::spawn({
        let app = app.clone();
        async move { app.trigger_short_press().await }
    });
    sleep(ms(2000)).await;
    assert!(app.sequencer().is_active());

    let stopped_at = Instant::now();
    app.sequencer().cancel();
    let outcome = run.await.unwrap();

    assert!(matches!(outcome, SequenceOutcome::Cancelled));
    assert!(stopped_at.elapsed() <= ms(20));
    assert_eq!(device.reverts().len(), 1);
    assert!(!app.sequencer().is_active());
}

// ── Degraded device ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn failed_push_recovers_in_background() {
    let device = FakeDevice::new(30);
    let line = Arc::new(SimulatedLine::new());
    let mut cfg = config();
    cfg.retry_delay = ms(100);
    cfg.reconnect_delay = ms(500);
    let app = blinker(&device, &line, cfg);
    assert!(app.device().connect().await);

    let started = Instant::now();
    let run = tokio::spawn({
        let app = app.clone();
        async move { app.trigger_short_press().await }
    });

    sleep(ms(1000)).await;
    device.set_online(false);
    sleep(ms(1000)).await;
    device.set_online(true);

    let outcome = run.await.unwrap();
    assert!(matches!(outcome, SequenceOutcome::Completed), "{outcome:?}");
    // The loop kept its schedule while recovery ran elsewhere.
    assert!(started.elapsed() < ms(5500), "took {:?}", started.elapsed());

    assert!(app.device().is_connected().await);
    assert!(device.info_calls.load(Ordering::SeqCst) >= 2);
    assert_eq!(device.reverts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn revert_lands_after_device_returns() {
    let device = FakeDevice::new(30);
    let line = Arc::new(SimulatedLine::new());
    let app = blinker(&device, &line, config());
    assert!(app.device().connect().await);

    let run = tokio::spawn({
        let app = app.clone();
        async move { app.trigger_short_press().await }
    });

    // Down for most of the blink window and well past its end.
    sleep(ms(1000)).await;
    device.set_online(false);
    sleep(ms(6500)).await;
    device.set_online(true);

    let outcome = run.await.unwrap();
    assert!(matches!(outcome, SequenceOutcome::Completed), "{outcome:?}");
    sleep(Duration::from_secs(30)).await;

    // Background recovery resent a blink step; the revert still comes last.
    let pushes = device.pushes();
    let last = pushes.last().unwrap();
    assert!(last.is_effect(common::DEFAULT_EFFECT), "left on {:?}", last.payload);
    assert!(secs(last.at) > 7.5, "reverted at {:?}", last.at);
    assert!(app.device().is_connected().await);
    assert!(!app.sequencer().is_active());
}

// ── Button loop ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn button_short_press_runs_short_pattern() {
    let device = FakeDevice::new(30);
    let line = Arc::new(SimulatedLine::new());
    let app = blinker(&device, &line, config());
    app.start().await;

    sleep(ms(1000)).await;
    // Startup applied the default appearance.
    assert_eq!(device.reverts().len(), 1);

    line.press();
    sleep(ms(1000)).await;
    line.release();
    sleep(ms(6000)).await;
    app.shutdown().await;

    let pushes = device.pushes();
    assert!(pushes.iter().any(|p| p.color() == Some(BLUE)));
    assert!(pushes.iter().all(|p| p.color() != Some(RED)));
    assert_eq!(device.reverts().len(), 2);
    assert_eq!(app.health().button_press_count, 1);
}

#[tokio::test(start_paused = true)]
async fn button_hold_blinks_alert_until_release() {
    let device = FakeDevice::new(30);
    let line = Arc::new(SimulatedLine::new());
    let app = blinker(&device, &line, config());
    app.start().await;

    sleep(ms(1000)).await;
    line.press();
    sleep(ms(4000)).await;
    line.release();
    sleep(ms(500)).await;
    app.shutdown().await;

    let pushes = device.pushes();
    assert!(pushes.iter().all(|p| p.color() != Some(BLUE)));

    let first_red = pushes.iter().find(|p| p.color() == Some(RED)).unwrap();
    assert!(
        (4.0..4.03).contains(&secs(first_red.at)),
        "alert started at {:?}",
        first_red.at
    );

    let reverts = device.reverts();
    assert_eq!(reverts.len(), 2);
    assert!((5.0..5.03).contains(&secs(reverts[1].at)), "{:?}", reverts[1].at);
    assert_eq!(app.health().button_press_count, 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_background_tasks() {
    let device = FakeDevice::new(30);
    let line = Arc::new(SimulatedLine::new());
    let app = blinker(&device, &line, config());
    app.start().await;

    sleep(ms(100)).await;
    app.shutdown().await;

    assert!(app.is_shutting_down());
    let calls = device.state_calls();
    sleep(Duration::from_secs(120)).await;
    assert_eq!(device.state_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn button_loop_waits_for_supervisor_connection() {
    let device = FakeDevice::new(30);
    device.fail_next_connects(1);
    let line = Arc::new(SimulatedLine::new());
    let app = blinker(&device, &line, config());
    app.start().await;

    // The supervisor's backoff is the only thing probing the device.
    sleep(ms(3000)).await;
    assert_eq!(device.info_calls.load(Ordering::SeqCst), 1);
    assert!(device.reverts().is_empty());

    sleep(ms(3000)).await;
    assert_eq!(device.info_calls.load(Ordering::SeqCst), 2);
    assert_eq!(device.reverts().len(), 1);
    app.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn button_loop_pauses_between_failed_recoveries() {
    let device = FakeDevice::new(30);
    let line = Arc::new(SimulatedLine::new());
    let app = blinker(&device, &line, config());
    app.start().await;
    sleep(ms(100)).await;
    assert_eq!(device.reverts().len(), 1);

    // Reachable, but every push is refused: reconnect works, restore fails.
    device.reject_pushes(true);
    assert!(!app.apply_default_appearance().await);
    let before = device.info_calls.load(Ordering::SeqCst);
    sleep(Duration::from_secs(20)).await;
    let reconnects = device.info_calls.load(Ordering::SeqCst) - before;
    app.shutdown().await;

    // Each cycle is a 3 s restore attempt plus a 5 s pause, not a 10 ms tick.
    assert!((2..=3).contains(&reconnects), "{reconnects} reconnects");
}

#[tokio::test(start_paused = true)]
async fn release_seen_after_stalled_poll_runs_timed_alert() {
    let device = FakeDevice::new(30);
    let line = Arc::new(SimulatedLine::new());
    let app = blinker(&device, &line, config());
    app.start().await;
    sleep(ms(100)).await;

    line.press();
    sleep(ms(50)).await;
    // The device drops while the button is down; the loop stalls reconnecting.
    device.set_online(false);
    assert!(!app.apply_default_appearance().await);
    sleep(ms(1000)).await;
    line.release();
    sleep(ms(1000)).await;
    device.set_online(true);
    sleep(Duration::from_secs(12)).await;
    app.shutdown().await;

    let pushes = device.pushes();
    assert!(pushes.iter().all(|p| p.color() != Some(BLUE)));
    let first_red = pushes.iter().find(|p| p.color() == Some(RED)).unwrap();
    let last = pushes.last().unwrap();
    assert!(last.is_effect(common::DEFAULT_EFFECT));
    // A full short-flash-duration alert, then the revert.
    let alert = secs(last.at) - secs(first_red.at);
    assert!((4.99..5.05).contains(&alert), "alert lasted {alert}s");
    assert_eq!(app.health().button_press_count, 1);
}

#[tokio::test(start_paused = true)]
async fn hold_outlasting_escalated_run_is_not_a_new_press() {
    let device = FakeDevice::new(30);
    let line = Arc::new(SimulatedLine::new());
    let app = blinker(&device, &line, config());
    app.start().await;

    // Short press at 0.5 s starts the blue/white run.
    sleep(ms(500)).await;
    line.press();
    sleep(ms(200)).await;
    line.release();

    // Pressed again and held through escalation and the full fallback alert.
    sleep(ms(500)).await;
    line.press();
    sleep(ms(10_800)).await;
    line.release();
    sleep(ms(8000)).await;
    app.shutdown().await;

    let reverts = device.reverts();
    assert_eq!(reverts.len(), 2, "startup plus one sequence");
    let pushes = device.pushes();
    let last = pushes.last().unwrap();
    assert!(last.is_effect(common::DEFAULT_EFFECT));
    assert!((10.7..10.8).contains(&secs(last.at)), "reverted at {:?}", last.at);
    assert_eq!(app.health().button_press_count, 1);
}
