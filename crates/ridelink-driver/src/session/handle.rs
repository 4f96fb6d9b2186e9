//! Cloneable handle to a running driver session.

use ridelink_common::{DriverEvent, EventBus, GeoPoint, RideLinkError, SurfaceLifecycleState};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// Inputs accepted by the session actor.
#[derive(Debug)]
pub enum SessionCommand {
    Toggle,
    Lifecycle(SurfaceLifecycleState),
    StyleLoaded,
    DismissPermissionNotice,
    /// Reply with the view once everything already queued is handled.
    Snapshot(oneshot::Sender<SessionView>),
    Shutdown,
}

/// What the UI renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub connected: bool,
    pub presence_version: u64,
    pub marker: Option<GeoPoint>,
    pub lifecycle: SurfaceLifecycleState,
    pub style_loaded: bool,
    pub permission_notice: bool,
    pub notices: Vec<String>,
}

impl SessionView {
    pub(crate) fn initial(connected: bool) -> Self {
        Self {
            connected,
            presence_version: 0,
            marker: None,
            lifecycle: SurfaceLifecycleState::Created,
            style_loaded: false,
            permission_notice: false,
            notices: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    view: watch::Receiver<SessionView>,
    bus: EventBus,
}

impl SessionHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<SessionCommand>,
        view: watch::Receiver<SessionView>,
        bus: EventBus,
    ) -> Self {
        Self {
            commands,
            view,
            bus,
        }
    }

    pub async fn send(&self, command: SessionCommand) -> Result<(), RideLinkError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RideLinkError::Other("driver session has ended".into()))
    }

    pub async fn toggle(&self) -> Result<(), RideLinkError> {
        self.send(SessionCommand::Toggle).await
    }

    pub async fn start(&self) -> Result<(), RideLinkError> {
        self.send(SessionCommand::Lifecycle(SurfaceLifecycleState::Started))
            .await
    }

    pub async fn stop(&self) -> Result<(), RideLinkError> {
        self.send(SessionCommand::Lifecycle(SurfaceLifecycleState::Stopped))
            .await
    }

    pub async fn destroy(&self) -> Result<(), RideLinkError> {
        self.send(SessionCommand::Lifecycle(SurfaceLifecycleState::Destroyed))
            .await
    }

    pub async fn style_loaded(&self) -> Result<(), RideLinkError> {
        self.send(SessionCommand::StyleLoaded).await
    }

    pub async fn dismiss_permission_notice(&self) -> Result<(), RideLinkError> {
        self.send(SessionCommand::DismissPermissionNotice).await
    }

    pub async fn shutdown(&self) -> Result<(), RideLinkError> {
        self.send(SessionCommand::Shutdown).await
    }

    /// The view after every input queued so far has been handled.
    pub async fn snapshot(&self) -> Result<SessionView, RideLinkError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot(tx)).await?;
        rx.await
            .map_err(|_| RideLinkError::Other("driver session has ended".into()))
    }

    /// Latest published view, without waiting.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<DriverEvent> {
        self.bus.subscribe()
    }
}
