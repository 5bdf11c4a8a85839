//! Continuous sampling and recording service.
//!
//! Periodically samples temperature and pressure, snapshots actuator
//! and system state, appends one row to the session log and publishes
//! the sample for UI observers. The interval is re-armable at runtime
//! without duplicating or skipping rows.

use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;

use crate::{
    app_context::ControlContext,
    event::{Event, EventBus},
    providers::traits::ServiceProvider,
    recorder::Recorder,
    task_manager::TaskManager,
};

/// Data recording service provider.
///
/// Critical: this loop is the system's observable record. It stays up
/// through start/stop commands so cool-down after shutdown is captured.
pub struct RecordingServiceProvider {
    context: Arc<ControlContext>,
    event_bus: EventBus,
}

impl RecordingServiceProvider {
    pub fn new(context: Arc<ControlContext>, event_bus: EventBus) -> Self {
        Self { context, event_bus }
    }
}

#[async_trait]
impl ServiceProvider for RecordingServiceProvider {
    async fn start(&self, task_manager: &mut TaskManager) -> Result<()> {
        let context = self.context.clone();
        let event_bus = self.event_bus.clone();

        task_manager
            .spawn(self.name(), |cancel_token| async move {
                run_recording_service(context, event_bus, cancel_token).await
            })
            .await
    }

    fn name(&self) -> &'static str {
        "RecordingService"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn is_critical(&self) -> bool {
        true
    }
}

async fn run_recording_service(
    context: Arc<ControlContext>,
    event_bus: EventBus,
    cancel_token: CancellationToken,
) -> Result<()> {
    let session = context.session_info();
    let candidates = context.storage_candidates().await;
    let mut recorder = Recorder::initialize(&candidates, &session);
    if !recorder.enabled() {
        event_bus.publish_lossy(Event::Diagnostic(
            "recording disabled: no writable storage location".to_string(),
        ));
    }

    let mut events = event_bus.subscribe();
    let mut period = Duration::from_secs(context.recording.read().await.interval_secs);
    let mut tick = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                info!("Recording service cancelled");
                break;
            }
            event = events.recv() => {
                if let Ok(Event::RecordingIntervalChanged(secs)) = event {
                    // Replace the timer before its next deadline; the
                    // next row lands within one new period.
                    period = Duration::from_secs(secs.max(1));
                    tick = interval_at(Instant::now() + period, period);
                    info!("Recording interval re-armed to {}s", period.as_secs());
                }
            }
            _instant = tick.tick() => {
                if let Err(e) = sample_and_record(&context, &event_bus, &mut recorder).await {
                    warn!("Failed to record sample: {e}");
                }
            }
        }
    }
    Ok(())
}

/// One tick: sensors first, then the state snapshot, then the row.
async fn sample_and_record(
    context: &Arc<ControlContext>,
    event_bus: &EventBus,
    recorder: &mut Recorder,
) -> Result<()> {
    let temperature = if context.sensors.probe_available() {
        context.sensors.read_temperature()
    } else {
        // No probe: the thermal loop's simulated value is the best
        // estimate of the chamber temperature.
        context.system.read().await.current_temp_c
    };
    let pressure = context.sensors.read_pressure();

    let record = context.snapshot_record(temperature, pressure).await;
    recorder.append(&record)?;
    event_bus.publish_lossy(Event::SampleRecorded(record));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_context::test_support::simulated_context;
    use pretty_assertions::assert_eq;
    use tokio::time::timeout;

    #[tokio::test]
    async fn provider_metadata() {
        let bus = EventBus::new();
        let (context, _fixture) = simulated_context(bus.clone());
        let provider = RecordingServiceProvider::new(context, bus);

        assert_eq!(provider.name(), "RecordingService");
        assert_eq!(provider.priority(), 10);
        assert!(provider.is_critical());
    }

    #[tokio::test]
    async fn records_appear_at_the_configured_interval() {
        let bus = EventBus::new();
        let (context, _fixture) = simulated_context(bus.clone());
        context.recording.write().await.interval_secs = 1;

        let mut rx = bus.subscribe();
        let mut task_manager = TaskManager::new();
        RecordingServiceProvider::new(context, bus)
            .start(&mut task_manager)
            .await
            .unwrap();

        let event = timeout(Duration::from_secs(3), async {
            loop {
                if let Ok(Event::SampleRecorded(record)) = rx.recv().await {
                    break record;
                }
            }
        })
        .await
        .expect("no sample within 3s");

        assert!(event.simulated);
        assert_eq!(event.board, "unknown");

        task_manager.shutdown_all().await.unwrap();
    }

    #[tokio::test]
    async fn interval_re_arm_produces_next_row_within_new_period() {
        let bus = EventBus::new();
        let (context, _fixture) = simulated_context(bus.clone());
        // Long initial interval: without the re-arm no row would appear.
        context.recording.write().await.interval_secs = 30;

        let mut rx = bus.subscribe();
        let mut task_manager = TaskManager::new();
        RecordingServiceProvider::new(context.clone(), bus.clone())
            .start(&mut task_manager)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        context.recording.write().await.interval_secs = 1;
        bus.publish(Event::RecordingIntervalChanged(1)).unwrap();

        let started = std::time::Instant::now();
        let record = timeout(Duration::from_secs(2), async {
            loop {
                if let Ok(Event::SampleRecorded(record)) = rx.recv().await {
                    break record;
                }
            }
        })
        .await
        .expect("no row within 2s of re-arm");

        assert!(started.elapsed() >= Duration::from_millis(900));
        assert!(!record.timestamp.is_empty());

        task_manager.shutdown_all().await.unwrap();
    }

    #[tokio::test]
    async fn consecutive_rows_have_distinct_timestamps() {
        let bus = EventBus::new();
        let (context, _fixture) = simulated_context(bus.clone());
        context.recording.write().await.interval_secs = 1;

        let mut rx = bus.subscribe();
        let mut task_manager = TaskManager::new();
        RecordingServiceProvider::new(context, bus)
            .start(&mut task_manager)
            .await
            .unwrap();

        let mut stamps = Vec::new();
        let _ = timeout(Duration::from_secs(5), async {
            while stamps.len() < 2 {
                if let Ok(Event::SampleRecorded(record)) = rx.recv().await {
                    stamps.push(record.timestamp);
                }
            }
        })
        .await;

        assert_eq!(stamps.len(), 2, "expected two rows within 5s");
        assert_ne!(stamps[0], stamps[1]);

        task_manager.shutdown_all().await.unwrap();
    }
}
