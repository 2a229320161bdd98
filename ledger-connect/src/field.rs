//! The Ledger instruction field.
//!
//! Ties the shared state, HID discovery, transport creation and the
//! renderer together. While mounted, the field runs two effects each time
//! the transport type, connection status or transport state changes:
//!
//! - **connection probe**: with HID transport selected and no Ledger known
//!   to be connected, enumerate attached devices and record whether a
//!   Ledger is among them.
//! - **transport verification**: with HID transport selected, a Ledger
//!   connected, and no transport result yet, try once to create a transport
//!   and record the classified outcome.
//!
//! Unmounting resets the transport state to `None` and releases the
//! transport, so the next mount verifies again. Effects still in flight at
//! unmount are not aborted, but their results are discarded rather than
//! written.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    error::Result,
    hid::HidBackend,
    i18n::Translate,
    platform::Platform,
    render::{render_instructions, Instructions, LinkAction, RenderContext},
    state::AppState,
    tracing::prelude::*,
    transport::{transport_state_for, TransportFactory},
    types::{
        any_ledger, EnvironmentType, HidDeviceFilter, PlatformKind, TransportState, TransportType,
        WebHidConnectedStatus,
    },
};

/// External collaborators the field calls into.
#[derive(Clone)]
pub struct FieldServices {
    pub hid: Arc<dyn HidBackend>,
    pub transport: Arc<dyn TransportFactory>,
    pub platform: Arc<dyn Platform>,
    pub messages: Arc<dyn Translate>,
}

/// Per-instance rendering inputs not held in shared state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldOptions {
    pub show_data_instruction: bool,
    pub environment: EnvironmentType,
    pub platform: PlatformKind,
}

/// Instruction field bound to shared state and services.
#[derive(Clone)]
pub struct LedgerInstructionField {
    inner: Arc<FieldInner>,
}

struct FieldInner {
    state: AppState,
    services: FieldServices,
    options: FieldOptions,
}

/// Guards effect writes for one mount.
#[derive(Clone)]
struct EffectScope {
    live: CancellationToken,
    attempt_in_flight: Arc<AtomicBool>,
}

impl EffectScope {
    fn new() -> Self {
        Self {
            live: CancellationToken::new(),
            attempt_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    fn is_live(&self) -> bool {
        !self.live.is_cancelled()
    }
}

impl LedgerInstructionField {
    pub fn new(state: AppState, services: FieldServices, options: FieldOptions) -> Self {
        Self {
            inner: Arc::new(FieldInner {
                state,
                services,
                options,
            }),
        }
    }

    /// A field sharing this one's state and services with different options.
    pub fn with_options(&self, options: FieldOptions) -> Self {
        Self::new(
            self.inner.state.clone(),
            self.inner.services.clone(),
            options,
        )
    }

    pub fn options(&self) -> FieldOptions {
        self.inner.options
    }

    /// Render the instructions for the current state.
    pub fn render(&self) -> Instructions {
        let options = self.inner.options;
        let ctx = RenderContext::new(
            self.inner.state.snapshot(),
            options.show_data_instruction,
            options.environment,
            options.platform,
        );
        render_instructions(&ctx, self.inner.services.messages.as_ref())
    }

    /// Run the connection probe once, outside of any mount.
    pub async fn probe_connection_status(&self) {
        self.probe(&EffectScope::new()).await
    }

    /// Run transport verification once, outside of any mount.
    pub async fn verify_transport(&self) {
        self.verify(&EffectScope::new()).await
    }

    async fn run_effects(&self, scope: &EffectScope) {
        tokio::join!(self.verify(scope), self.probe(scope));
    }

    async fn probe(&self, scope: &EffectScope) {
        let state = &self.inner.state;
        if !scope.is_live()
            || state.ledger_transport_type() != TransportType::WebHid
            || state.webhid_connected_status() == WebHidConnectedStatus::Connected
        {
            return;
        }

        let devices = match self.inner.services.hid.list_connected_devices().await {
            Some(devices) => devices,
            None => {
                debug!("HID enumeration unavailable, treating as no devices");
                Vec::new()
            }
        };
        let status = if any_ledger(&devices) {
            WebHidConnectedStatus::Connected
        } else {
            WebHidConnectedStatus::NotConnected
        };

        if !scope.is_live() {
            trace!(status = %status, "Field unmounted, discarding probe result");
            return;
        }
        state.set_webhid_connected_status(status);
    }

    async fn verify(&self, scope: &EffectScope) {
        let state = &self.inner.state;
        let snapshot = state.snapshot();
        if !scope.is_live()
            || snapshot.transport_type != TransportType::WebHid
            || snapshot.webhid_connected_status != WebHidConnectedStatus::Connected
            || snapshot.transport_status != TransportState::None
        {
            return;
        }

        if scope.attempt_in_flight.swap(true, Ordering::SeqCst) {
            trace!("Transport attempt already in flight");
            return;
        }
        let result = self
            .inner
            .services
            .transport
            .attempt_transport_creation()
            .await;

        let transport_state = transport_state_for(&result);
        match &result {
            Ok(created) => debug!(created, state = %transport_state, "Transport attempt finished"),
            Err(e) => info!(error = %e, state = %transport_state, "Transport creation failed"),
        }

        // Checked under the state lock so an unmount's reset always wins.
        if !state.set_transport_status_if(transport_state, || scope.is_live()) {
            debug!(state = %transport_state, "Field unmounted, discarding transport result");
        }
        // Cleared only once the result is recorded, so a verify spawned in
        // between still sees the attempt as pending.
        scope.attempt_in_flight.store(false, Ordering::SeqCst);
    }

    /// Carry out a link's action.
    pub async fn activate(&self, action: LinkAction) -> Result<()> {
        let platform = &self.inner.services.platform;
        let fullscreen = self.inner.options.environment.is_fullscreen();
        debug!(action = ?action, fullscreen, "Link activated");

        match action {
            LinkAction::CloseOtherApps => {
                if fullscreen {
                    platform.reload().await
                } else {
                    platform.reopen_as_full_tab().await
                }
            }
            LinkAction::ConnectWebHid => {
                if !fullscreen {
                    return platform.reopen_as_full_tab().await;
                }

                let devices = self
                    .inner
                    .services
                    .hid
                    .request_device(&HidDeviceFilter::ledger())
                    .await
                    .inspect_err(|e| warn!(error = %e, "Device request failed"))?;
                let status = if any_ledger(&devices) {
                    WebHidConnectedStatus::Connected
                } else {
                    WebHidConnectedStatus::NotConnected
                };
                self.inner.state.set_webhid_connected_status(status);
                Ok(())
            }
        }
    }

    /// Start running effects on every dependency change.
    ///
    /// Must be called within a tokio runtime. Call
    /// [`MountedField::unmount`] to stop.
    pub fn mount(self) -> MountedField {
        let scope = EffectScope::new();
        let mut rx = self.inner.state.subscribe();

        let field = self.clone();
        let loop_scope = scope.clone();
        let task = tokio::spawn(async move {
            field.spawn_effects(&loop_scope);
            loop {
                tokio::select! {
                    _ = loop_scope.live.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let deps = *rx.borrow_and_update();
                        trace!(deps = ?deps, "Dependencies changed");
                        field.spawn_effects(&loop_scope);
                    }
                }
            }
            trace!("Effect loop stopped");
        });

        debug!(options = ?self.inner.options, "Field mounted");
        MountedField {
            field: self,
            scope,
            task,
        }
    }

    fn spawn_effects(&self, scope: &EffectScope) {
        let field = self.clone();
        let scope = scope.clone();
        tokio::spawn(async move { field.run_effects(&scope).await });
    }
}

/// A field whose effects are running.
pub struct MountedField {
    field: LedgerInstructionField,
    scope: EffectScope,
    task: JoinHandle<()>,
}

impl MountedField {
    pub fn field(&self) -> &LedgerInstructionField {
        &self.field
    }

    pub fn render(&self) -> Instructions {
        self.field.render()
    }

    pub async fn activate(&self, action: LinkAction) -> Result<()> {
        self.field.activate(action).await
    }

    /// Stop the effects, reset the transport state and release the
    /// transport.
    ///
    /// Returns the field so it can be mounted again.
    pub async fn unmount(self) -> LedgerInstructionField {
        self.scope.live.cancel();
        if let Err(e) = self.task.await {
            error!(error = %e, "Effect loop panicked");
        }
        let inner = &self.field.inner;
        inner.state.set_transport_status(TransportState::None);
        inner.services.transport.close().await;
        debug!("Field unmounted");
        self.field
    }
}
