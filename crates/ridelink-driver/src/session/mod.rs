//! The driver session actor.
//!
//! One task owns the presence controller, the marker, the location source
//! and the lifecycle gate. Every input reaches it through a channel and is
//! handled to completion before the next one.

mod handle;

#[cfg(test)]
mod tests;

pub use handle::{SessionCommand, SessionHandle, SessionView};

use std::sync::Arc;

use ridelink_common::{
    DriverEvent, EventBus, LocationError, Notification, NotificationQueue, PresenceError,
    SessionId, SurfaceLifecycleState,
};
use ridelink_location::{LocationEvent, LocationEventKind, LocationEvents, LocationProvider, LocationSource};
use ridelink_map::{MapSurface, MarkerSync};
use ridelink_presence::{
    PresenceController, PresenceStore, PresenceSubscription, PublishOutcome, RemoteEvent,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::lifecycle::{GateAction, LifecycleGate};
use crate::settings::SessionSettings;

/// Notification key of the blocking location-permission notice.
pub const PERMISSION_NOTICE: &str = "location-permission";

type PublishResult = (u64, Result<(), PresenceError>);

/// Start a driver session on the current runtime.
pub fn spawn_session<S>(
    store: Arc<dyn PresenceStore>,
    provider: Arc<dyn LocationProvider>,
    surface: S,
    settings: SessionSettings,
) -> (SessionHandle, JoinHandle<()>)
where
    S: MapSurface + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(64);
    let (view_tx, view_rx) = watch::channel(SessionView::initial(settings.initial_connected));
    let bus = EventBus::new(settings.event_capacity);
    let (location, location_events) = LocationSource::new(provider, settings.location_capacity);
    let (publish_tx, publish_rx) = mpsc::unbounded_channel();

    let session = DriverSession {
        id: SessionId::new(),
        controller: PresenceController::new(settings.initial_connected),
        store,
        subscription: None,
        marker: MarkerSync::new(surface, settings.marker.clone()),
        location,
        location_events,
        gate: LifecycleGate::new(),
        notifications: NotificationQueue::new(settings.notification_capacity),
        bus: bus.clone(),
        view_tx,
        publish_tx,
        publish_rx,
        settings,
    };

    let handle = SessionHandle::new(command_tx, view_rx, bus);
    let task = tokio::spawn(session.run(command_rx));
    (handle, task)
}

struct DriverSession<S: MapSurface> {
    id: SessionId,
    controller: PresenceController,
    store: Arc<dyn PresenceStore>,
    subscription: Option<PresenceSubscription>,
    marker: MarkerSync<S>,
    location: LocationSource,
    location_events: LocationEvents,
    gate: LifecycleGate,
    notifications: NotificationQueue,
    bus: EventBus,
    view_tx: watch::Sender<SessionView>,
    publish_tx: mpsc::UnboundedSender<PublishResult>,
    publish_rx: mpsc::UnboundedReceiver<PublishResult>,
    settings: SessionSettings,
}

async fn next_remote(subscription: &mut Option<PresenceSubscription>) -> Option<RemoteEvent> {
    match subscription {
        Some(sub) => sub.recv().await,
        None => std::future::pending().await,
    }
}

impl<S: MapSurface> DriverSession<S> {
    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        info!(session = %self.id.short(), "driver session started");

        loop {
            tokio::select! {
                // Inputs that are already queued are handled before commands.
                biased;

                event = next_remote(&mut self.subscription) => match event {
                    Some(event) => self.on_remote_event(event),
                    None => {
                        warn!("presence subscription closed by store");
                        self.subscription = None;
                    }
                },
                Some((version, result)) = self.publish_rx.recv() => {
                    self.on_publish_result(version, result);
                }
                Some(event) = self.location_events.recv() => self.on_location_event(event),
                command = commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.on_command(command),
                },
            }
        }

        self.shutdown();
        info!(session = %self.id.short(), "driver session ended");
    }

    fn on_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Toggle => self.toggle(),
            SessionCommand::Lifecycle(state) => self.transition(state),
            SessionCommand::StyleLoaded => self.on_style_loaded(),
            SessionCommand::DismissPermissionNotice => {
                if self.notifications.dismiss(PERMISSION_NOTICE) {
                    self.bus.publish(DriverEvent::PermissionNotice { visible: false });
                    self.refresh_view();
                }
            }
            SessionCommand::Snapshot(reply) => {
                self.refresh_view();
                let _ = reply.send(self.view_tx.borrow().clone());
            }
            SessionCommand::Shutdown => {}
        }
    }

    // -- presence -----------------------------------------------------------

    fn toggle(&mut self) {
        if self.gate.state() == SurfaceLifecycleState::Destroyed {
            debug!("toggle ignored after destroy");
            return;
        }

        let record = self.controller.toggle();
        let version = record.version;
        self.publish_presence();

        let store = Arc::clone(&self.store);
        let results = self.publish_tx.clone();
        tokio::spawn(async move {
            let result = store.set(record).await;
            let _ = results.send((version, result));
        });
    }

    fn on_publish_result(&mut self, version: u64, result: Result<(), PresenceError>) {
        let error = result.as_ref().err().cloned();
        if self.controller.on_publish_result(version, result) == PublishOutcome::Failed {
            let body = error.map(|e| e.to_string()).unwrap_or_default();
            self.warn_user("Status not saved", body);
        }
    }

    fn on_remote_event(&mut self, event: RemoteEvent) {
        match event {
            RemoteEvent::Value(value) => {
                if self.controller.on_remote_update(value).changed() {
                    self.publish_presence();
                }
            }
            RemoteEvent::Error(error) => {
                self.controller.on_remote_error(&error);
                self.warn_user("Status unavailable", error.to_string());
            }
        }
    }

    fn publish_presence(&mut self) {
        let flag = self.controller.flag();
        self.bus.publish(DriverEvent::PresenceChanged {
            connected: flag.connected,
            origin: flag.origin,
            version: flag.version,
        });
        self.refresh_view();
    }

    fn subscribe_presence(&mut self) {
        if self.subscription.is_none() {
            self.subscription = Some(self.store.subscribe());
            info!("presence subscription established");
        }

        let path = self.settings.probe_path.clone();
        if path.is_empty() {
            return;
        }
        let message = self.settings.probe_message.clone();
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            match store.probe(&path, &message).await {
                Ok(()) => info!(path = %path, "connectivity probe written"),
                Err(e) => warn!(path = %path, error = %e, "connectivity probe failed"),
            }
        });
    }

    // -- lifecycle ----------------------------------------------------------

    fn transition(&mut self, to: SurfaceLifecycleState) {
        let actions = match self.gate.transition(to) {
            Ok(actions) => actions,
            Err(e) => {
                debug!(error = %e, "lifecycle command rejected");
                return;
            }
        };
        if actions.is_empty() {
            return;
        }

        for action in actions {
            match action {
                GateAction::SubscribePresence => self.subscribe_presence(),
                GateAction::StartLocation => self.maybe_start_location(),
                GateAction::StopLocation => self.location.stop(),
                GateAction::ReleaseAll => self.release_all(),
            }
        }

        self.bus.publish(DriverEvent::LifecycleChanged(to));
        self.refresh_view();
    }

    fn on_style_loaded(&mut self) {
        match self.marker.on_style_loaded() {
            Ok(()) => {
                self.maybe_start_location();
                self.refresh_view();
            }
            Err(e) => warn!(error = %e, "map style setup failed"),
        }
    }

    fn maybe_start_location(&mut self) {
        if self.gate.is_started() && self.marker.is_style_loaded() && !self.location.is_active() {
            self.location.start();
        }
    }

    fn release_all(&mut self) {
        self.location.stop();
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
        if self.marker.release() {
            info!("map surface and listeners released");
        }
    }

    fn shutdown(&mut self) {
        self.release_all();
        self.bus.publish(DriverEvent::Shutdown);
    }

    // -- location -----------------------------------------------------------

    fn on_location_event(&mut self, event: LocationEvent) {
        match event.kind {
            LocationEventKind::Sample(position) => match self.marker.on_position(position) {
                Ok(()) => {
                    self.bus.publish(DriverEvent::MarkerMoved(position.point));
                    self.refresh_view();
                }
                Err(e) => warn!(error = %e, "marker update failed"),
            },
            LocationEventKind::PermissionDenied => {
                self.notifications.push(Notification::blocking(
                    PERMISSION_NOTICE,
                    "Location permission required",
                    "Allow location access so riders can see where you are.",
                ));
                self.bus.publish(DriverEvent::PermissionNotice { visible: true });
                self.refresh_view();
            }
            LocationEventKind::Terminated(error) => {
                self.marker.on_provider_terminated();
                let title = match error {
                    LocationError::PermissionRevoked => "Location permission revoked",
                    _ => "Location unavailable",
                };
                self.warn_user(title, error.to_string());
            }
        }
    }

    // -- view ---------------------------------------------------------------

    fn warn_user(&mut self, title: &str, body: String) {
        self.bus.publish(DriverEvent::Warning(format!("{title}: {body}")));
        self.notifications.push(Notification::warning(title, body));
        self.refresh_view();
    }

    fn refresh_view(&mut self) {
        let flag = self.controller.flag();
        let view = SessionView {
            connected: flag.connected,
            presence_version: flag.version,
            marker: self.marker.position().map(|p| p.point),
            lifecycle: self.gate.state(),
            style_loaded: self.marker.is_style_loaded(),
            permission_notice: self.notifications.has_blocking(PERMISSION_NOTICE),
            notices: self
                .notifications
                .visible()
                .into_iter()
                .map(|n| format!("{}: {}", n.title, n.body))
                .collect(),
        };
        self.view_tx.send_replace(view);
    }
}
