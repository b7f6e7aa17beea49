//! Background idle pump for the plugin
//!
//! Plugins expect periodic housekeeping calls on a non-audio thread. The pump
//! ticks at a fixed rate whether or not the engine is running.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::plugin::PluginIdle;

/// Idle calls per second
pub const IDLE_RATE_HZ: u32 = 30;

pub struct IdlePump {
    should_stop: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl IdlePump {
    pub fn new(plugin: Weak<dyn PluginIdle>) -> Self {
        Self::with_interval(plugin, Duration::from_secs(1) / IDLE_RATE_HZ)
    }

    pub fn with_interval(plugin: Weak<dyn PluginIdle>, interval: Duration) -> Self {
        let should_stop = Arc::new(AtomicBool::new(false));
        let ticks = Arc::new(AtomicU64::new(0));

        let thread_stop = Arc::clone(&should_stop);
        let thread_ticks = Arc::clone(&ticks);
        let thread = thread::Builder::new()
            .name("clap-host-idle".to_string())
            .spawn(move || run(plugin, interval, thread_stop, thread_ticks));

        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("Failed to spawn idle thread: {}", e);
                None
            }
        };

        Self {
            should_stop,
            ticks,
            thread,
        }
    }

    /// Idle calls delivered so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

impl Drop for IdlePump {
    fn drop(&mut self) {
        self.should_stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            if let Some(t) = handle.thread().name() {
                log::debug!("Joining {}", t);
            }
            if handle.join().is_err() {
                log::error!("Idle thread panicked");
            }
        }
    }
}

fn run(
    plugin: Weak<dyn PluginIdle>,
    interval: Duration,
    should_stop: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
) {
    let mut deadline = Instant::now() + interval;

    while !should_stop.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now < deadline {
            thread::sleep(deadline - now);
            continue;
        }

        // The handle is gone once the engine has been torn down
        let Some(plugin) = plugin.upgrade() else {
            break;
        };
        plugin.idle();
        ticks.fetch_add(1, Ordering::Relaxed);

        // Missed ticks are dropped, not replayed
        deadline = (deadline + interval).max(Instant::now());
    }
}
