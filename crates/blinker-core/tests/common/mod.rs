// Shared fixtures: an in-memory light device driven under a paused clock.
#![allow(dead_code, clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use url::Url;

use blinker_api::{Color, DeviceInfo, Error, LedInfo, StatePayload, StatusResponse};
use blinker_core::{
    Blinker, BlinkerConfig, DefaultMode, DeviceTransport, InputLine, SimulatedLine,
};

pub const DEFAULT_EFFECT: u16 = 162;

/// A push the device accepted, stamped with time since the fake was built.
#[derive(Debug, Clone)]
pub struct Push {
    pub at: Duration,
    pub payload: StatePayload,
}

impl Push {
    pub fn color(&self) -> Option<Color> {
        self.payload.primary_color()
    }

    pub fn is_effect(&self, index: u16) -> bool {
        self.payload.seg.first().is_some_and(|s| s.fx == index)
    }
}

pub struct FakeDevice {
    start: Instant,
    led_count: AtomicU32,
    online: AtomicBool,
    rejecting_pushes: AtomicBool,
    failing_connects: AtomicUsize,
    pub info_calls: AtomicUsize,
    pub state_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pushes: Mutex<Vec<Push>>,
}

impl FakeDevice {
    pub fn new(led_count: u32) -> Arc<Self> {
        Arc::new(Self {
            start: Instant::now(),
            led_count: AtomicU32::new(led_count),
            online: AtomicBool::new(true),
            rejecting_pushes: AtomicBool::new(false),
            failing_connects: AtomicUsize::new(0),
            info_calls: AtomicUsize::new(0),
            state_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            pushes: Mutex::new(Vec::new()),
        })
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Keep answering info requests but fail every state push.
    pub fn reject_pushes(&self, rejecting: bool) {
        self.rejecting_pushes.store(rejecting, Ordering::SeqCst);
    }

    /// Fail the next `n` info requests even while online.
    pub fn fail_next_connects(&self, n: usize) {
        self.failing_connects.store(n, Ordering::SeqCst);
    }

    pub fn pushes(&self) -> Vec<Push> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn reverts(&self) -> Vec<Push> {
        self.pushes()
            .into_iter()
            .filter(|p| p.is_effect(DEFAULT_EFFECT))
            .collect()
    }

    pub fn state_calls(&self) -> usize {
        self.state_calls.load(Ordering::SeqCst)
    }

    fn unavailable() -> Error {
        Error::Status {
            status: 503,
            url: "http://wled.test/".into(),
        }
    }
}

#[derive(Clone)]
pub struct FakeTransport(pub Arc<FakeDevice>);

impl DeviceTransport for FakeTransport {
    async fn info(&self) -> Result<DeviceInfo, Error> {
        self.0.info_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .0
            .failing_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing || !self.0.online.load(Ordering::SeqCst) {
            return Err(FakeDevice::unavailable());
        }
        Ok(DeviceInfo {
            name: "Bench Strip".into(),
            ver: "0.14.4".into(),
            leds: LedInfo {
                count: self.0.led_count.load(Ordering::SeqCst),
            },
        })
    }

    async fn set_state(&self, payload: &StatePayload) -> Result<(), Error> {
        self.0.state_calls.fetch_add(1, Ordering::SeqCst);
        if !self.0.online.load(Ordering::SeqCst)
            || self.0.rejecting_pushes.load(Ordering::SeqCst)
        {
            return Err(FakeDevice::unavailable());
        }
        self.0.pushes.lock().unwrap().push(Push {
            at: self.0.start.elapsed(),
            payload: payload.clone(),
        });
        Ok(())
    }

    async fn status(&self) -> Result<StatusResponse, Error> {
        self.0.status_calls.fetch_add(1, Ordering::SeqCst);
        if !self.0.online.load(Ordering::SeqCst) {
            return Err(FakeDevice::unavailable());
        }
        Ok(StatusResponse {
            effects: vec!["Solid".into(), "Blink".into(), "Breathe".into()],
        })
    }
}

/// Default timings, but an effect default so reverts are easy to spot.
pub fn config() -> BlinkerConfig {
    let mut config = BlinkerConfig::new(Url::parse("http://wled.test/").unwrap());
    config.default_mode = DefaultMode::Effect;
    config.effect.index = DEFAULT_EFFECT;
    config
}

pub fn blinker(
    device: &Arc<FakeDevice>,
    line: &Arc<SimulatedLine>,
    config: BlinkerConfig,
) -> Blinker<FakeTransport> {
    let input: Arc<dyn InputLine> = Arc::clone(line) as Arc<dyn InputLine>;
    Blinker::new(config, FakeTransport(Arc::clone(device)), input)
}

pub fn secs(at: Duration) -> f64 {
    at.as_secs_f64()
}
