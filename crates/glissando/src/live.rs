//! Live loop: one pass at a time against the device clock.
//!
//! Pass `n` is laid at `origin + n * pass_length`, so consecutive passes
//! abut exactly. Each pass is emitted in full while holding the device lock,
//! `schedule_ahead` seconds before it begins. Cancellation is only observed
//! between passes.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{emit_timeline, OutputDevice};
use crate::error::BackendError;
use crate::timeline::Timeline;

/// Longest single sleep while waiting on the device clock. The clock may be
/// suspended mid-wait, so the remaining time is re-read after each step.
const MAX_WAIT_STEP: Duration = Duration::from_millis(50);

/// Clock differences below this count as "reached".
const CLOCK_EPSILON: f64 = 1e-6;

/// Parameters of a live loop.
#[derive(Debug, Clone)]
pub struct LiveLoop {
    /// One pass with its first chord at time zero.
    pub pass: Timeline,
    /// Silence before the first pass.
    pub lead_in: f64,
    pub looping: bool,
    pub schedule_ahead: f64,
}

/// What a finished live loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveReport {
    /// Passes fully handed to the device.
    pub passes: usize,
}

pub(crate) fn lock_device<D>(device: &Mutex<D>) -> MutexGuard<'_, D> {
    device.lock().unwrap_or_else(|poisoned| {
        warn!("Output device lock was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Spawn the loop on the current runtime.
pub fn spawn_live_loop<D: OutputDevice>(
    device: Arc<Mutex<D>>,
    live: LiveLoop,
    cancel: CancellationToken,
) -> JoinHandle<Result<LiveReport, BackendError>> {
    tokio::spawn(run_live_loop(device, live, cancel))
}

/// Run the loop until cancelled, or after one pass when not looping.
pub async fn run_live_loop<D: OutputDevice>(
    device: Arc<Mutex<D>>,
    live: LiveLoop,
    cancel: CancellationToken,
) -> Result<LiveReport, BackendError> {
    let pass_length = live.pass.duration();
    if pass_length <= 0.0 {
        return Ok(LiveReport { passes: 0 });
    }

    let origin = lock_device(&device).now() + live.lead_in;
    let mut passes = 0;

    loop {
        let pass_start = origin + passes as f64 * pass_length;

        if passes > 0 && !wait_until(&device, pass_start - live.schedule_ahead, &cancel).await {
            break;
        }

        {
            let mut dev = lock_device(&device);
            if cancel.is_cancelled() {
                break;
            }
            let tones = emit_timeline(&live.pass.shifted(pass_start), &mut *dev)?;
            debug!(
                "Scheduled pass {} at {:.3}s ({} tones)",
                passes, pass_start, tones
            );
        }
        passes += 1;

        if !live.looping {
            wait_until(&device, pass_start + pass_length, &cancel).await;
            break;
        }
    }

    info!("Live loop finished after {} passes", passes);
    Ok(LiveReport { passes })
}

/// Sleep until the device clock reaches `target`. Returns false if cancelled
/// first.
async fn wait_until<D: OutputDevice>(
    device: &Mutex<D>,
    target: f64,
    cancel: &CancellationToken,
) -> bool {
    loop {
        let remaining = target - lock_device(device).now();
        if remaining <= CLOCK_EPSILON {
            return true;
        }

        let step = Duration::from_secs_f64(remaining.min(MAX_WAIT_STEP.as_secs_f64()));
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(step) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::Scheduler;
    use crate::virtual_output::VirtualOutput;

    fn live(text: &str, looping: bool) -> LiveLoop {
        LiveLoop {
            pass: Scheduler::default()
                .schedule_text(text, 120.0, 0.0)
                .unwrap(),
            lead_in: 0.0,
            looping,
            schedule_ahead: 0.1,
        }
    }

    fn running_output() -> Arc<Mutex<VirtualOutput>> {
        let mut output = VirtualOutput::new(8_000);
        output.resume_clock();
        Arc::new(Mutex::new(output))
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_pass_without_loop() {
        let device = running_output();
        let report = run_live_loop(device.clone(), live("c,d,e", false), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report, LiveReport { passes: 1 });
        let output = lock_device(&device);
        assert_eq!(output.tones().len(), 3);
        assert!(output.now() >= 1.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_passes_are_contiguous() {
        let device = running_output();
        let cancel = CancellationToken::new();
        let handle = spawn_live_loop(device.clone(), live("c,-,(e,g)", true), cancel.clone());

        tokio::time::sleep(Duration::from_millis(3_200)).await;
        cancel.cancel();
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.passes, 3);

        let output = lock_device(&device);
        let starts: Vec<f64> = output.tones().iter().map(|t| t.start).collect();
        assert_eq!(starts, vec![0.0, 1.0, 1.0, 1.5, 2.5, 2.5, 3.0, 4.0, 4.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_waits_for_pass_boundary() {
        let device = running_output();
        let cancel = CancellationToken::new();
        let handle = spawn_live_loop(device.clone(), live("c,d,e,f", true), cancel.clone());

        tokio::time::sleep(Duration::from_millis(500)).await;
        cancel.cancel();
        let report = handle.await.unwrap().unwrap();

        assert_eq!(report.passes, 1);
        assert_eq!(lock_device(&device).tones().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lead_in_delays_first_pass() {
        let device = running_output();
        let mut params = live("a", false);
        params.lead_in = 0.25;

        run_live_loop(device.clone(), params, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(lock_device(&device).tones()[0].start, 0.25);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_lead_in_waits_in_bounded_steps() {
        let device = running_output();
        let cancel = CancellationToken::new();
        let mut params = live("c,d", true);
        params.lead_in = 1e20;
        let handle = spawn_live_loop(device.clone(), params, cancel.clone());

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        assert_eq!(handle.await.unwrap().unwrap().passes, 1);
        assert_eq!(lock_device(&device).tones()[0].start, 1e20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspended_clock_holds_next_pass() {
        let device = running_output();
        let cancel = CancellationToken::new();
        let handle = spawn_live_loop(device.clone(), live("c,d", true), cancel.clone());

        tokio::time::sleep(Duration::from_millis(200)).await;
        lock_device(&device).suspend_clock();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(lock_device(&device).tones().len(), 2);

        cancel.cancel();
        assert_eq!(handle.await.unwrap().unwrap().passes, 1);
    }
}
