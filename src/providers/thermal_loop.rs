//! Temperature acquisition/simulation service.
//!
//! Once per second: read the probe when one answers; otherwise advance
//! the thermal simulator (forced heating toward the target while the
//! system is active, passive cooling toward room temperature when not).

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
    thermal,
};

const TICK: Duration = Duration::from_secs(1);

/// Thermal loop service provider.
pub struct ThermalServiceProvider {
    context: Arc<ControlContext>,
    event_bus: EventBus,
}

impl ThermalServiceProvider {
    pub fn new(context: Arc<ControlContext>, event_bus: EventBus) -> Self {
        Self { context, event_bus }
    }
}

#[async_trait]
impl ServiceProvider for ThermalServiceProvider {
    async fn start(&self, task_manager: &mut TaskManager) -> Result<()> {
        let context = self.context.clone();
        let event_bus = self.event_bus.clone();

        task_manager
            .spawn(self.name(), |cancel_token| async move {
                run_thermal_service(context, event_bus, cancel_token).await
            })
            .await
    }

    fn name(&self) -> &'static str {
        "ThermalService"
    }

    fn priority(&self) -> i32 {
        8
    }

    fn is_critical(&self) -> bool {
        true
    }
}

async fn run_thermal_service(
    context: Arc<ControlContext>,
    event_bus: EventBus,
    cancel_token: CancellationToken,
) -> Result<()> {
    let mut tick = interval(TICK);

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                info!("Thermal service cancelled");
                break;
            }
            _instant = tick.tick() => {
                let temperature = advance_temperature(&context).await;
                event_bus.publish_lossy(Event::TemperatureUpdated(temperature));
            }
        }
    }
    Ok(())
}

/// One tick of acquisition or simulation; returns the new temperature.
async fn advance_temperature(context: &Arc<ControlContext>) -> f32 {
    let temperature = if context.sensors.probe_available() {
        context.sensors.read_temperature()
    } else {
        let system = *context.system.read().await;
        if system.active {
            thermal::next_temp(system.target_temp_c, system.current_temp_c)
        } else {
            thermal::passive_cool(system.current_temp_c)
        }
    };

    context.system.write().await.current_temp_c = temperature;
    temperature
}
