//! Generic runtime for client orchestration.
//!
//! The Runtime drives the client event loop, coordinating between:
//! - [`Client`]: sans-IO chat sync state machine
//! - [`Driver`]: platform-specific socket I/O
//! - the auth signal, UI commands and the single reconnect timer
//!
//! Each event is handled to completion, observers included, before the next
//! one is taken, so frames are applied strictly in arrival order.

use std::time::Duration;

use courier_client::{
    Client, ClientAction, ClientConfig, ClientEvent, CloseInfo, ConnectionStatus, Generation,
};
use tokio::{sync::mpsc, time::Instant};

use crate::{
    ChatHandle, Driver, RuntimeError,
    handle::Command,
};

/// Commands buffered between UI callers and the runtime.
const COMMAND_BUFFER: usize = 64;

/// How long shutdown waits for the closing socket to report back.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The one outstanding reconnect timer.
#[derive(Debug, Clone, Copy)]
struct PendingRetry {
    generation: Generation,
    deadline: Instant,
}

/// Generic runtime that executes [`Client`] actions through a [`Driver`].
pub struct Runtime<D: Driver> {
    driver: D,
    client: Client,
    auth: mpsc::UnboundedReceiver<bool>,
    /// False once the auth sender is gone; the last value stays in effect.
    auth_live: bool,
    commands: mpsc::Receiver<Command>,
    retry: Option<PendingRetry>,
}

impl<D: Driver> Runtime<D> {
    /// Create a runtime and the handle that controls it.
    ///
    /// `auth` carries the external authorization signal. Every value sent is
    /// applied in order, so a quick logout and login still closes the old
    /// session before opening a new one. The client starts unauthorized.
    pub fn new(
        driver: D,
        config: ClientConfig,
        auth: mpsc::UnboundedReceiver<bool>,
    ) -> (Self, ChatHandle) {
        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let runtime = Self {
            driver,
            client: Client::new(config),
            auth,
            auth_live: true,
            commands,
            retry: None,
        };
        (runtime, ChatHandle::new(commands_tx))
    }

    /// Get a reference to the client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Get a mutable reference to the client, e.g. to subscribe to its stores
    /// before running.
    pub fn client_mut(&mut self) -> &mut Client {
        &mut self.client
    }

    /// Get a reference to the driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Run the event loop until shutdown.
    ///
    /// Returns `Ok` after [`ChatHandle::shutdown`] or once every handle is
    /// dropped. Either way the connection is closed, observers are released
    /// and the driver is stopped. A socket that was live gets up to
    /// [`SHUTDOWN_GRACE`] to finish its closing handshake first.
    ///
    /// # Errors
    ///
    /// `RuntimeError::DriverStopped` if the driver's event source ends first.
    pub async fn run(mut self) -> Result<(), RuntimeError> {
        let result = loop {
            tokio::select! {
                event = self.driver.next_event() => match event {
                    Some(event) => self.dispatch(event.into()),
                    None => {
                        tracing::error!("driver event source ended");
                        break Err(RuntimeError::DriverStopped);
                    },
                },
                authorized = self.auth.recv(), if self.auth_live => match authorized {
                    Some(authorized) => self.dispatch(ClientEvent::AuthChanged(authorized)),
                    None => {
                        tracing::debug!("auth signal sender dropped, keeping last value");
                        self.auth_live = false;
                    },
                },
                command = self.commands.recv() => match command {
                    Some(Command::SwitchRoom(room_id)) => {
                        self.dispatch(ClientEvent::SwitchRoom { room_id });
                    },
                    Some(Command::PostMessage(content)) => {
                        self.dispatch(ClientEvent::PostMessage { content });
                    },
                    Some(Command::RequestOlder) => self.dispatch(ClientEvent::RequestOlder),
                    Some(Command::Shutdown) | None => break Ok(()),
                },
                generation = retry_elapsed(self.retry), if self.retry.is_some() => {
                    self.retry = None;
                    self.dispatch(ClientEvent::RetryElapsed { generation });
                },
            }
        };

        let actions = self.client.shutdown();
        self.execute(actions);
        self.retry = None;
        self.await_close().await;
        self.driver.stop();
        tracing::info!("runtime stopped");
        result
    }

    /// Feed one event into the client and execute the resulting actions.
    fn dispatch(&mut self, event: ClientEvent) {
        let actions = self.client.handle(event);
        self.execute(actions);

        // Disconnects and newer connects cancel the retry inside the client
        if self.retry.is_some() && self.client.connection().pending_retry().is_none() {
            tracing::debug!("retry timer disarmed");
            self.retry = None;
        }
    }

    /// Wait until the socket closed by shutdown reports back, the driver
    /// ends, or [`SHUTDOWN_GRACE`] passes.
    async fn await_close(&mut self) {
        let deadline = Instant::now() + SHUTDOWN_GRACE;

        while self.client.connection_status() == ConnectionStatus::Closing {
            match tokio::time::timeout_at(deadline, self.driver.next_event()).await {
                Ok(Some(event)) => {
                    let actions = self.client.handle(event.into());
                    self.execute(actions);
                },
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(grace = ?SHUTDOWN_GRACE, "socket still closing at shutdown");
                    break;
                },
            }
        }
    }

    /// Execute client actions. Driver failures are fed back into the client
    /// as socket reports, which may produce further actions.
    fn execute(&mut self, initial: Vec<ClientAction>) {
        let mut pending = initial;

        while !pending.is_empty() {
            for action in std::mem::take(&mut pending) {
                match action {
                    ClientAction::OpenSocket { generation, url } => {
                        if let Err(error) = self.driver.open(generation, &url) {
                            tracing::warn!(%generation, %error, "socket open could not start");
                            pending.extend(self.client.handle(ClientEvent::SocketOpenFailed {
                                generation,
                                reason: error.to_string(),
                            }));
                        }
                    },
                    ClientAction::CloseSocket { generation, code, reason } => {
                        if let Err(error) = self.driver.close(generation, code, &reason) {
                            tracing::warn!(%generation, %error, "socket close failed, treating as closed");
                            pending.extend(self.client.handle(ClientEvent::SocketClosed {
                                generation,
                                close: CloseInfo::abnormal(error.to_string()),
                            }));
                        }
                    },
                    ClientAction::SendText { generation, text } => {
                        if let Err(error) = self.driver.send_text(generation, text) {
                            tracing::warn!(%generation, %error, "frame send failed");
                        }
                    },
                    ClientAction::ScheduleRetry { generation, delay } => {
                        tracing::debug!(%generation, ?delay, "retry timer armed");
                        self.retry = Some(PendingRetry { generation, deadline: Instant::now() + delay });
                    },
                }
            }
        }
    }
}

/// Resolve when the pending retry is due. Never resolves without one.
async fn retry_elapsed(retry: Option<PendingRetry>) -> Generation {
    match retry {
        Some(PendingRetry { generation, deadline }) => {
            tokio::time::sleep_until(deadline).await;
            generation
        },
        None => std::future::pending().await,
    }
}
