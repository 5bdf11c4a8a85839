//! D-Bus service provider: serves the interface and forwards bus
//! events to UI signals.

use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use zbus::Connection;

use crate::{
    app_context::ControlContext,
    event::{Event, EventBus},
    interface::{DBusInterface, DBusInterfaceSignals},
    providers::traits::ServiceProvider,
    task_manager::TaskManager,
};

const SERVICE_NAME: &str = "io.github.ovend";
const OBJECT_PATH: &str = "/io/github/ovend";

/// D-Bus boundary service.
///
/// Non-critical: without a session bus the daemon still drives
/// actuators and records data, it is just headless.
pub struct DBusServiceProvider {
    context: Arc<ControlContext>,
    event_bus: EventBus,
    connection: Connection,
}

impl DBusServiceProvider {
    /// Connects to the session bus; fails when no bus is available,
    /// which the coordinator treats as a degraded (headless) start.
    pub async fn new(context: Arc<ControlContext>, event_bus: EventBus) -> Result<Self> {
        let connection = Connection::session().await?;
        Ok(Self {
            context,
            event_bus,
            connection,
        })
    }
}

#[async_trait]
impl ServiceProvider for DBusServiceProvider {
    async fn start(&self, task_manager: &mut TaskManager) -> Result<()> {
        let context = self.context.clone();
        let event_bus = self.event_bus.clone();
        let connection = self.connection.clone();

        task_manager
            .spawn(self.name(), |cancel_token| async move {
                run_dbus_service(context, event_bus, connection, cancel_token).await
            })
            .await
    }

    fn name(&self) -> &'static str {
        "DBusService"
    }

    fn priority(&self) -> i32 {
        5
    }
}

async fn run_dbus_service(
    context: Arc<ControlContext>,
    event_bus: EventBus,
    connection: Connection,
    cancel_token: CancellationToken,
) -> Result<()> {
    let stop_notify = Arc::new(event_listener::Event::new());

    let interface = DBusInterface {
        context,
        event_bus: event_bus.clone(),
        stop_notify: stop_notify.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    connection.object_server().at(OBJECT_PATH, interface).await?;
    connection.request_name(SERVICE_NAME).await?;

    let iface = connection
        .object_server()
        .interface::<_, DBusInterface>(OBJECT_PATH)
        .await?;
    let mut events = event_bus.subscribe();

    loop {
        let stopped = stop_notify.listen();
        tokio::select! {
            () = cancel_token.cancelled() => {
                info!("D-Bus service cancelled");
                break;
            }
            () = stopped => {
                info!("Stop requested over D-Bus");
                event_bus.publish_lossy(Event::SystemShutdown);
                break;
            }
            event = events.recv() => {
                match event {
                    Ok(event) => forward_event(&iface, event).await,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!("D-Bus signal forwarding lagged by {n} events");
                    }
                }
            }
        }
    }
    Ok(())
}

/// Translates a bus event into the matching UI signal.
async fn forward_event(
    iface: &zbus::object_server::InterfaceRef<DBusInterface>,
    event: Event,
) {
    let result = match event {
        Event::TemperatureUpdated(celsius) => iface.temperature(f64::from(celsius)).await,
        Event::PressureUpdated(volts) => iface.pressure(f64::from(volts)).await,
        Event::ActuatorChanged { role, value } => {
            iface.actuator_changed(role.as_str(), value).await
        }
        Event::SampleRecorded(record) => match serde_json::to_string(&record) {
            Ok(json) => iface.sample_recorded(&json).await,
            Err(e) => {
                warn!("Failed to serialize log record: {e}");
                Ok(())
            }
        },
        Event::Diagnostic(message) => iface.diagnostic(&message).await,
        Event::RecordingIntervalChanged(_) | Event::SystemShutdown => Ok(()),
    };

    if let Err(e) = result {
        warn!("Failed to emit D-Bus signal: {e}");
    }
}
