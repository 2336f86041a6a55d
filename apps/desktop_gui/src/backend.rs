//! Backend worker thread. Owns the authenticated session on a tokio
//! runtime and talks to the UI thread over a pair of crossbeam channels:
//! commands in, events out. The UI never blocks on the network.

use std::thread;

use client_core::{
    ApiClient, ClientError, MessageStore, Partner, SelectionContext, SessionController,
};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use shared::protocol::{ProfileRecord, RegisterRequest};
use tracing::debug;

pub enum BackendCommand {
    Login {
        server_url: String,
        username: String,
        password: String,
    },
    Register {
        server_url: String,
        request: RegisterRequest,
    },
    Refresh,
    LoadProfile,
    Search {
        query: String,
    },
    SendMessage {
        selection: SelectionContext,
        text: String,
    },
    Logout,
}

pub enum UiEvent {
    LoginOk {
        username: String,
    },
    LoggedOut,
    /// A fresh feed snapshot together with the partner directory derived
    /// from it. Always sent as a pair so the sidebar and the thread view
    /// can never disagree about which snapshot they render.
    FeedUpdated {
        partners: Vec<Partner>,
        store: MessageStore,
    },
    ProfileLoaded(ProfileRecord),
    SearchResults(Vec<ProfileRecord>),
    MessageSent,
    Info(String),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Login,
    Register,
    Refresh,
    Search,
    SendMessage,
}

impl UiErrorContext {
    pub fn label(self) -> &'static str {
        match self {
            Self::BackendStartup => "Startup",
            Self::Login => "Sign in",
            Self::Register => "Registration",
            Self::Refresh => "Refresh",
            Self::Search => "Search",
            Self::SendMessage => "Send",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    pub context: UiErrorContext,
    pub message: String,
    reauth: bool,
}

impl UiError {
    fn from_client(context: UiErrorContext, err: &ClientError) -> Self {
        Self {
            context,
            message: err.to_string(),
            reauth: err.requires_reauth(),
        }
    }

    fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        Self {
            context,
            message: message.into(),
            reauth: false,
        }
    }

    /// Whether the credential was rejected and the app must return to the
    /// sign-in screen.
    pub fn requires_reauth(&self) -> bool {
        self.reauth
    }
}

pub fn queue_command(cmd_tx: &Sender<BackendCommand>, cmd: BackendCommand, status: &mut String) {
    let cmd_name = match &cmd {
        BackendCommand::Login { .. } => "login",
        BackendCommand::Register { .. } => "register",
        BackendCommand::Refresh => "refresh",
        BackendCommand::LoadProfile => "load_profile",
        BackendCommand::Search { .. } => "search",
        BackendCommand::SendMessage { .. } => "send_message",
        BackendCommand::Logout => "logout",
    };
    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
        }
        Err(TrySendError::Full(_)) => {
            *status = "Backend is busy; try again in a moment".to_string();
        }
        Err(TrySendError::Disconnected(_)) => {
            *status = "Backend worker is not running; restart the app".to_string();
        }
    }
}

fn feed_event(controller: &SessionController) -> UiEvent {
    UiEvent::FeedUpdated {
        partners: controller.partners().to_vec(),
        store: controller.store().clone(),
    }
}

async fn refresh_and_publish(
    ui_tx: &Sender<UiEvent>,
    controller: &mut SessionController,
    context: UiErrorContext,
) {
    match controller.refresh().await {
        Ok(()) => {
            let _ = ui_tx.try_send(feed_event(controller));
        }
        Err(err) => {
            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_client(context, &err)));
        }
    }
}

pub fn spawn_backend_thread(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));
            let mut controller: Option<SessionController> = None;

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::Login {
                        server_url,
                        username,
                        password,
                    } => {
                        let api = match ApiClient::new(&server_url) {
                            Ok(api) => api,
                            Err(err) => {
                                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_client(
                                    UiErrorContext::Login,
                                    &err,
                                )));
                                continue;
                            }
                        };
                        match api.login(&username, &password).await {
                            Ok(session) => {
                                let username = session.username().to_string();
                                let mut fresh = SessionController::new(api, session);
                                let _ = ui_tx.try_send(UiEvent::LoginOk { username });
                                refresh_and_publish(&ui_tx, &mut fresh, UiErrorContext::Refresh)
                                    .await;
                                controller = Some(fresh);
                            }
                            Err(err) => {
                                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_client(
                                    UiErrorContext::Login,
                                    &err,
                                )));
                            }
                        }
                    }
                    BackendCommand::Register {
                        server_url,
                        request,
                    } => {
                        let api = match ApiClient::new(&server_url) {
                            Ok(api) => api,
                            Err(err) => {
                                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_client(
                                    UiErrorContext::Register,
                                    &err,
                                )));
                                continue;
                            }
                        };
                        match api.register(request).await {
                            Ok(session) => {
                                let username = session.username().to_string();
                                let mut fresh = SessionController::new(api, session);
                                let _ = ui_tx.try_send(UiEvent::LoginOk { username });
                                refresh_and_publish(&ui_tx, &mut fresh, UiErrorContext::Refresh)
                                    .await;
                                controller = Some(fresh);
                            }
                            Err(err) => {
                                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_client(
                                    UiErrorContext::Register,
                                    &err,
                                )));
                            }
                        }
                    }
                    BackendCommand::Refresh => {
                        if let Some(controller) = controller.as_mut() {
                            refresh_and_publish(&ui_tx, controller, UiErrorContext::Refresh).await;
                        } else {
                            debug!("refresh requested without an active session");
                        }
                    }
                    BackendCommand::LoadProfile => {
                        if let Some(controller) = controller.as_ref() {
                            match controller.fetch_profile().await {
                                Ok(profile) => {
                                    let _ = ui_tx.try_send(UiEvent::ProfileLoaded(profile));
                                }
                                Err(err) => {
                                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_client(
                                        UiErrorContext::Refresh,
                                        &err,
                                    )));
                                }
                            }
                        }
                    }
                    BackendCommand::Search { query } => {
                        if let Some(controller) = controller.as_ref() {
                            match controller.search_profiles(&query).await {
                                Ok(results) => {
                                    let _ = ui_tx.try_send(UiEvent::SearchResults(results));
                                }
                                Err(err) => {
                                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_client(
                                        UiErrorContext::Search,
                                        &err,
                                    )));
                                }
                            }
                        }
                    }
                    BackendCommand::SendMessage { selection, text } => {
                        if let Some(controller) = controller.as_mut() {
                            match controller.send(&selection, &text).await {
                                Ok(()) => {
                                    let _ = ui_tx.try_send(UiEvent::MessageSent);
                                    let _ = ui_tx.try_send(feed_event(controller));
                                }
                                Err(err) => {
                                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_client(
                                        UiErrorContext::SendMessage,
                                        &err,
                                    )));
                                }
                            }
                        } else {
                            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                                UiErrorContext::SendMessage,
                                "no active session",
                            )));
                        }
                    }
                    BackendCommand::Logout => {
                        controller = None;
                        let _ = ui_tx.try_send(UiEvent::LoggedOut);
                    }
                }
            }
        });
    });
}
