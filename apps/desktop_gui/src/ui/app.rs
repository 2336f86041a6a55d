//! egui application: the sign-in card and the main chat workspace
//! (partner sidebar, feed, per-partner thread, profile dossier).

use std::time::{Duration, Instant};

use client_core::{same_identity, select_thread, MessageStore, Partner, SelectionContext};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use serde::{Deserialize, Serialize};
use shared::protocol::{ProfileRecord, RegisterRequest};

use crate::backend::{queue_command, BackendCommand, UiEvent};

pub const SETTINGS_STORAGE_KEY: &str = "wiregram.login";

const FEED_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Login form prefill remembered between runs. Never the password.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedLoginSettings {
    pub server_url: String,
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppViewState {
    Login,
    Main,
}

#[derive(Debug, Clone)]
struct StatusBanner {
    message: String,
}

struct ThreadLine {
    author: String,
    when: String,
    text: String,
    outgoing: bool,
}

pub struct WiregramApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,

    view_state: AppViewState,

    // Sign-in form.
    server_url: String,
    username_input: String,
    password_input: String,
    register_mode: bool,
    email_input: String,
    location_input: String,
    bio_input: String,

    // Authenticated session state.
    self_username: String,
    store: MessageStore,
    partners: Vec<Partner>,
    selected_partner: Option<Partner>,
    viewed_profile: Option<ProfileRecord>,
    my_profile: Option<ProfileRecord>,

    search_query: String,
    search_results: Vec<ProfileRecord>,

    composer: String,
    /// Text of the send currently in flight. The composer is only cleared
    /// when the backend confirms this exact text was dispatched, so a
    /// failed send never loses what the user typed.
    in_flight_text: Option<String>,

    status: String,
    status_banner: Option<StatusBanner>,
    last_refresh: Instant,
}

impl WiregramApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        default_server_url: String,
        persisted: Option<PersistedLoginSettings>,
    ) -> Self {
        let persisted = persisted.unwrap_or_default();
        let server_url = if persisted.server_url.is_empty() {
            default_server_url
        } else {
            persisted.server_url
        };
        Self {
            cmd_tx,
            ui_rx,
            view_state: AppViewState::Login,
            server_url,
            username_input: persisted.username,
            password_input: String::new(),
            register_mode: false,
            email_input: String::new(),
            location_input: String::new(),
            bio_input: String::new(),
            self_username: String::new(),
            store: MessageStore::new(),
            partners: Vec::new(),
            selected_partner: None,
            viewed_profile: None,
            my_profile: None,
            search_query: String::new(),
            search_results: Vec::new(),
            composer: String::new(),
            in_flight_text: None,
            status: "Not signed in".to_string(),
            status_banner: None,
            last_refresh: Instant::now(),
        }
    }

    fn persisted_settings(&self) -> PersistedLoginSettings {
        PersistedLoginSettings {
            server_url: self.server_url.clone(),
            username: self.username_input.clone(),
        }
    }

    fn reset_session_state(&mut self) {
        self.self_username.clear();
        self.store = MessageStore::new();
        self.partners.clear();
        self.selected_partner = None;
        self.viewed_profile = None;
        self.my_profile = None;
        self.search_query.clear();
        self.search_results.clear();
        self.composer.clear();
        self.in_flight_text = None;
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::LoginOk { username } => {
                    self.view_state = AppViewState::Main;
                    self.reset_session_state();
                    self.status = format!("Signed in as {username}");
                    self.status_banner = None;
                    self.self_username = username;
                    self.password_input.clear();
                    self.last_refresh = Instant::now();
                    queue_command(&self.cmd_tx, BackendCommand::LoadProfile, &mut self.status);
                }
                UiEvent::LoggedOut => {
                    self.view_state = AppViewState::Login;
                    self.reset_session_state();
                    self.status = "Signed out".to_string();
                    self.status_banner = None;
                }
                UiEvent::FeedUpdated { partners, store } => {
                    self.partners = partners;
                    self.store = store;
                }
                UiEvent::ProfileLoaded(profile) => {
                    self.my_profile = Some(profile);
                }
                UiEvent::SearchResults(results) => {
                    self.search_results = results;
                    if self.search_results.is_empty() {
                        self.status = "No profiles matched the search".to_string();
                    }
                }
                UiEvent::MessageSent => {
                    if self.in_flight_text.take().as_deref() == Some(self.composer.as_str()) {
                        self.composer.clear();
                    }
                    self.status = "Message sent".to_string();
                }
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::Error(err) => {
                    self.in_flight_text = None;
                    if err.requires_reauth() {
                        self.view_state = AppViewState::Login;
                        self.reset_session_state();
                        self.status = format!("Authentication error: {}", err.message);
                        self.status_banner = Some(StatusBanner {
                            message: "Session expired or credentials rejected. Please sign in again."
                                .to_string(),
                        });
                    } else {
                        self.status = format!("{} error: {}", err.context.label(), err.message);
                    }
                }
            }
        }
    }

    fn try_login(&mut self) {
        let username = self.username_input.trim().to_string();
        let server_url = self.server_url.trim().to_string();
        if username.is_empty() || server_url.is_empty() || self.password_input.is_empty() {
            self.status_banner = Some(StatusBanner {
                message: "Server URL, username, and password are all required.".to_string(),
            });
            return;
        }
        self.status_banner = None;
        self.status = "Signing in...".to_string();
        queue_command(
            &self.cmd_tx,
            BackendCommand::Login {
                server_url,
                username,
                password: self.password_input.clone(),
            },
            &mut self.status,
        );
    }

    fn try_register(&mut self) {
        let username = self.username_input.trim().to_string();
        let server_url = self.server_url.trim().to_string();
        if username.is_empty() || server_url.is_empty() || self.password_input.is_empty() {
            self.status_banner = Some(StatusBanner {
                message: "Server URL, username, and password are all required.".to_string(),
            });
            return;
        }
        self.status_banner = None;
        self.status = "Creating account...".to_string();
        queue_command(
            &self.cmd_tx,
            BackendCommand::Register {
                server_url,
                request: RegisterRequest {
                    username,
                    password: self.password_input.clone(),
                    email: self.email_input.trim().to_string(),
                    location: self.location_input.trim().to_string(),
                    bio: self.bio_input.trim().to_string(),
                },
            },
            &mut self.status,
        );
    }

    /// Resolve the send target from the open profile (wins) or the
    /// selected chat, then queue the send. The composer keeps its text
    /// until the backend confirms dispatch.
    fn try_send_current_composer(&mut self) {
        let text = self.composer.trim().to_string();
        if text.is_empty() {
            return;
        }
        let selection = SelectionContext::from_sources(
            self.viewed_profile.as_ref(),
            self.selected_partner.as_ref(),
        );
        if selection.target().is_none() {
            self.status = "Open a profile or select a chat before sending".to_string();
            return;
        }
        self.in_flight_text = Some(self.composer.clone());
        queue_command(
            &self.cmd_tx,
            BackendCommand::SendMessage { selection, text },
            &mut self.status,
        );
    }

    fn run_search(&mut self) {
        let query = self.search_query.trim().to_string();
        if query.is_empty() {
            self.search_results.clear();
            return;
        }
        queue_command(
            &self.cmd_tx,
            BackendCommand::Search { query },
            &mut self.status,
        );
    }

    fn sign_out(&mut self) {
        queue_command(&self.cmd_tx, BackendCommand::Logout, &mut self.status);
    }

    fn maybe_poll_feed(&mut self) {
        if self.view_state == AppViewState::Main
            && self.last_refresh.elapsed() >= FEED_POLL_INTERVAL
        {
            self.last_refresh = Instant::now();
            queue_command(&self.cmd_tx, BackendCommand::Refresh, &mut self.status);
        }
    }

    fn show_status_banner(&mut self, ui: &mut egui::Ui) {
        if let Some(banner) = self.status_banner.clone() {
            egui::Frame::NONE
                .fill(egui::Color32::from_rgb(111, 53, 53))
                .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)))
                .corner_radius(8)
                .inner_margin(egui::Margin::symmetric(10, 8))
                .show(ui, |ui| {
                    ui.horizontal_wrapped(|ui| {
                        ui.label(egui::RichText::new(&banner.message).color(egui::Color32::WHITE));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Dismiss").clicked() {
                                self.status_banner = None;
                            }
                        });
                    });
                });
        }
    }

    fn show_login_screen(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let avail = ui.available_size();
            ui.add_space((avail.y * 0.12).clamp(18.0, 90.0));

            ui.vertical_centered(|ui| {
                ui.set_width(avail.x.clamp(420.0, 540.0));

                egui::Frame::NONE
                    .fill(ui.visuals().faint_bg_color)
                    .corner_radius(14)
                    .stroke(egui::Stroke::new(
                        1.0,
                        ui.visuals().widgets.noninteractive.bg_stroke.color,
                    ))
                    .inner_margin(egui::Margin::symmetric(20, 18))
                    .show(ui, |ui| {
                        ui.style_mut().spacing.item_spacing = egui::vec2(10.0, 10.0);

                        ui.horizontal(|ui| {
                            ui.label(egui::RichText::new("💬").size(24.0));
                            ui.vertical(|ui| {
                                ui.heading("Wiregram");
                                ui.weak(if self.register_mode {
                                    "Create an account."
                                } else {
                                    "Sign in to your account."
                                });
                            });
                        });

                        ui.add_space(8.0);
                        self.show_status_banner(ui);

                        ui.label(egui::RichText::new("Server URL").strong());
                        ui.add(
                            egui::TextEdit::singleline(&mut self.server_url)
                                .hint_text("http://127.0.0.1:8000")
                                .desired_width(f32::INFINITY),
                        );

                        ui.label(egui::RichText::new("Username").strong());
                        ui.add(
                            egui::TextEdit::singleline(&mut self.username_input)
                                .hint_text("alice")
                                .desired_width(f32::INFINITY),
                        );

                        ui.label(egui::RichText::new("Password").strong());
                        let password_resp = ui.add(
                            egui::TextEdit::singleline(&mut self.password_input)
                                .password(true)
                                .desired_width(f32::INFINITY),
                        );

                        if self.register_mode {
                            ui.label(egui::RichText::new("Email (optional)").strong());
                            ui.add(
                                egui::TextEdit::singleline(&mut self.email_input)
                                    .desired_width(f32::INFINITY),
                            );
                            ui.label(egui::RichText::new("Location (optional)").strong());
                            ui.add(
                                egui::TextEdit::singleline(&mut self.location_input)
                                    .desired_width(f32::INFINITY),
                            );
                            ui.label(egui::RichText::new("Bio (optional)").strong());
                            ui.add(
                                egui::TextEdit::multiline(&mut self.bio_input)
                                    .desired_rows(2)
                                    .desired_width(f32::INFINITY),
                            );
                        }

                        let enter_pressed = ctx.input(|i| i.key_pressed(egui::Key::Enter));
                        if password_resp.has_focus() && enter_pressed {
                            if self.register_mode {
                                self.try_register();
                            } else {
                                self.try_login();
                            }
                        }

                        ui.add_space(6.0);
                        let action_label = if self.register_mode {
                            "Create account"
                        } else {
                            "Sign in"
                        };
                        let btn = egui::Button::new(
                            egui::RichText::new(action_label).strong().size(16.0),
                        )
                        .min_size(egui::vec2(ui.available_width(), 40.0));
                        if ui.add(btn).clicked() {
                            if self.register_mode {
                                self.try_register();
                            } else {
                                self.try_login();
                            }
                        }

                        let toggle_label = if self.register_mode {
                            "Have an account already? Sign in"
                        } else {
                            "New here? Create an account"
                        };
                        if ui.small_button(toggle_label).clicked() {
                            self.register_mode = !self.register_mode;
                            self.status_banner = None;
                        }

                        ui.separator();
                        ui.horizontal_wrapped(|ui| {
                            ui.small("Status:");
                            ui.small(egui::RichText::new(&self.status).weak());
                        });
                    });
            });
        });
    }

    fn show_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Wiregram");
                ui.separator();
                ui.strong(&self.self_username);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Sign out").clicked() {
                        self.sign_out();
                    }
                    if ui.button("Refresh").clicked() {
                        self.last_refresh = Instant::now();
                        queue_command(&self.cmd_tx, BackendCommand::Refresh, &mut self.status);
                    }
                    ui.small(egui::RichText::new(&self.status).weak());
                });
            });
        });
    }

    fn show_sidebar(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("sidebar")
            .default_width(230.0)
            .show(ctx, |ui| {
                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    let resp = ui.add(
                        egui::TextEdit::singleline(&mut self.search_query)
                            .hint_text("Search profiles"),
                    );
                    let submitted =
                        resp.lost_focus() && ctx.input(|i| i.key_pressed(egui::Key::Enter));
                    if ui.button("🔍").clicked() || submitted {
                        self.run_search();
                    }
                });

                let mut opened_profile: Option<ProfileRecord> = None;
                if !self.search_results.is_empty() {
                    ui.small("Results");
                    for profile in &self.search_results {
                        if ui.button(&profile.username).clicked() {
                            opened_profile = Some(profile.clone());
                        }
                    }
                    if ui.small_button("Clear results").clicked() {
                        self.search_results.clear();
                    }
                    ui.separator();
                }
                if let Some(profile) = opened_profile {
                    self.viewed_profile = Some(profile);
                }

                if ui
                    .selectable_label(
                        self.viewed_profile.is_none() && self.selected_partner.is_none(),
                        "📥 Feed",
                    )
                    .clicked()
                {
                    self.viewed_profile = None;
                    self.selected_partner = None;
                }
                if ui.selectable_label(false, "👤 My profile").clicked() {
                    self.viewed_profile = self.my_profile.clone();
                    if self.my_profile.is_none() {
                        queue_command(&self.cmd_tx, BackendCommand::LoadProfile, &mut self.status);
                    }
                }

                ui.separator();
                ui.small("Chats");
                let mut clicked_partner: Option<Partner> = None;
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for partner in &self.partners {
                        let selected = self.viewed_profile.is_none()
                            && self
                                .selected_partner
                                .as_ref()
                                .map(|p| p.identity == partner.identity)
                                .unwrap_or(false);
                        if ui
                            .selectable_label(selected, &partner.display_name)
                            .clicked()
                        {
                            clicked_partner = Some(partner.clone());
                        }
                    }
                    if self.partners.is_empty() {
                        ui.weak("No conversations yet");
                    }
                });
                if let Some(partner) = clicked_partner {
                    self.selected_partner = Some(partner);
                    self.viewed_profile = None;
                }
            });
    }

    fn show_composer(&mut self, ui: &mut egui::Ui) {
        ui.separator();
        ui.horizontal(|ui| {
            let resp = ui.add(
                egui::TextEdit::singleline(&mut self.composer)
                    .hint_text("Write a message")
                    .desired_width(ui.available_width() - 70.0),
            );
            let submitted = resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Send").clicked() || submitted {
                self.try_send_current_composer();
                resp.request_focus();
            }
        });
    }

    fn thread_lines(&self, partner_name: &str) -> Vec<ThreadLine> {
        select_thread(&self.store, partner_name)
            .into_iter()
            .map(|record| {
                let outgoing = same_identity(&record.sender_username, &self.self_username);
                ThreadLine {
                    author: if outgoing {
                        "You".to_string()
                    } else {
                        record.sender_username.clone()
                    },
                    when: record.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                    text: record.text.clone(),
                    outgoing,
                }
            })
            .collect()
    }

    fn show_profile_dossier(&mut self, ui: &mut egui::Ui, profile: &ProfileRecord) {
        ui.heading(&profile.username);
        egui::Grid::new("profile_grid").num_columns(2).show(ui, |ui| {
            ui.small("Photo");
            match profile.avatar.as_deref().filter(|url| !url.is_empty()) {
                Some(url) => {
                    ui.hyperlink(url);
                }
                None => {
                    ui.weak("No photo");
                }
            }
            ui.end_row();
            if !profile.email.is_empty() {
                ui.small("Email");
                ui.label(&profile.email);
                ui.end_row();
            }
            if !profile.location.is_empty() {
                ui.small("Location");
                ui.label(&profile.location);
                ui.end_row();
            }
            if !profile.bio.is_empty() {
                ui.small("Bio");
                ui.label(&profile.bio);
                ui.end_row();
            }
        });
        if same_identity(&profile.username, &self.self_username) {
            ui.weak("This is your own profile.");
        } else {
            ui.add_space(8.0);
            self.show_composer(ui);
        }
    }

    fn show_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(profile) = self.viewed_profile.clone() {
                self.show_profile_dossier(ui, &profile);
            } else if let Some(partner) = self.selected_partner.clone() {
                ui.heading(&partner.display_name);
                let lines = self.thread_lines(&partner.display_name);
                egui::ScrollArea::vertical()
                    .stick_to_bottom(true)
                    .auto_shrink([false, false])
                    .max_height(ui.available_height() - 48.0)
                    .show(ui, |ui| {
                        for line in &lines {
                            ui.horizontal_wrapped(|ui| {
                                let author = egui::RichText::new(&line.author).strong();
                                ui.label(if line.outgoing {
                                    author.color(egui::Color32::LIGHT_BLUE)
                                } else {
                                    author
                                });
                                ui.small(egui::RichText::new(&line.when).weak());
                            });
                            ui.label(&line.text);
                            ui.add_space(4.0);
                        }
                        if lines.is_empty() {
                            ui.weak("No messages in this conversation yet.");
                        }
                    });
                self.show_composer(ui);
            } else {
                ui.heading("Feed");
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        for record in self.store.all() {
                            ui.horizontal_wrapped(|ui| {
                                ui.strong(&record.sender_username);
                                ui.small("→");
                                ui.strong(&record.receiver_username);
                                ui.small(
                                    egui::RichText::new(
                                        record.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                                    )
                                    .weak(),
                                );
                            });
                            ui.label(&record.text);
                            ui.add_space(4.0);
                        }
                        if self.store.is_empty() {
                            ui.weak("Nothing here yet. Find someone via search to start a chat.");
                        }
                    });
            }
        });
    }
}

impl eframe::App for WiregramApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.maybe_poll_feed();
        ctx.request_repaint_after(Duration::from_millis(500));

        match self.view_state {
            AppViewState::Login => self.show_login_screen(ctx),
            AppViewState::Main => {
                self.show_top_bar(ctx);
                self.show_sidebar(ctx);
                self.show_central_panel(ctx);
            }
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        if let Ok(text) = serde_json::to_string(&self.persisted_settings()) {
            storage.set_string(SETTINGS_STORAGE_KEY, text);
        }
    }
}
