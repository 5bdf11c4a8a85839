//! Periodic pressure sampling broadcast.
//!
//! Samples the pressure input every two seconds and publishes the value
//! for UI observers. Non-critical: the recording loop takes its own
//! pressure samples, this service only feeds the live display.

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::{
    app_context::ControlContext,
    event::{Event, EventBus},
    providers::traits::ServiceProvider,
    task_manager::TaskManager,
};

const TICK: Duration = Duration::from_secs(2);

pub struct PressureServiceProvider {
    context: Arc<ControlContext>,
    event_bus: EventBus,
}

impl PressureServiceProvider {
    pub fn new(context: Arc<ControlContext>, event_bus: EventBus) -> Self {
        Self { context, event_bus }
    }
}

#[async_trait]
impl ServiceProvider for PressureServiceProvider {
    async fn start(&self, task_manager: &mut TaskManager) -> Result<()> {
        let context = self.context.clone();
        let event_bus = self.event_bus.clone();

        task_manager
            .spawn(self.name(), |cancel_token| async move {
                run_pressure_service(context, event_bus, cancel_token).await
            })
            .await
    }

    fn name(&self) -> &'static str {
        "PressureService"
    }

    fn priority(&self) -> i32 {
        3
    }
}

async fn run_pressure_service(
    context: Arc<ControlContext>,
    event_bus: EventBus,
    cancel_token: CancellationToken,
) -> Result<()> {
    let mut tick = interval(TICK);

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                info!("Pressure service cancelled");
                break;
            }
            _instant = tick.tick() => {
                let volts = context.sensors.read_pressure();
                event_bus.publish_lossy(Event::PressureUpdated(volts));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_context::test_support::simulated_context;
    use crate::sensing::PRESSURE_MAX_V;
    use pretty_assertions::assert_eq;
    use tokio::time::timeout;

    #[tokio::test]
    async fn provider_metadata() {
        let bus = EventBus::new();
        let (context, _fixture) = simulated_context(bus.clone());
        let provider = PressureServiceProvider::new(context, bus);

        assert_eq!(provider.name(), "PressureService");
        assert_eq!(provider.priority(), 3);
        assert!(!provider.is_critical());
    }

    #[tokio::test]
    async fn publishes_samples_within_nominal_range() {
        let bus = EventBus::new();
        let (context, _fixture) = simulated_context(bus.clone());

        let mut rx = bus.subscribe();
        let mut task_manager = TaskManager::new();
        PressureServiceProvider::new(context, bus)
            .start(&mut task_manager)
            .await
            .unwrap();

        let volts = timeout(Duration::from_secs(3), async {
            loop {
                if let Ok(Event::PressureUpdated(v)) = rx.recv().await {
                    break v;
                }
            }
        })
        .await
        .expect("no pressure sample within 3s");

        assert!((0.0..=PRESSURE_MAX_V).contains(&volts));

        task_manager.shutdown_all().await.unwrap();
    }
}
