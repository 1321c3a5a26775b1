use std::time::Duration;

use client_core::{
    view::{self, FormView, ViewModel},
    ControllerSnapshot,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::domain::{FormField, UserId, UserRecord};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{
    events::{UiError, UiEvent},
    orchestration::dispatch_backend_command,
};

const HEADING_SIZE: f32 = 18.0;

pub struct UserAdminApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    snapshot: ControllerSnapshot,
    name_input: String,
    email_input: String,
    seen_form_revision: u64,
    pending_delete: Option<UserRecord>,
    status: String,
    fatal_error: Option<UiError>,
}

impl UserAdminApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            snapshot: ControllerSnapshot::default(),
            name_input: String::new(),
            email_input: String::new(),
            seen_form_revision: 0,
            pending_delete: None,
            status: String::new(),
            fatal_error: None,
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Snapshot(snapshot) => self.apply_snapshot(snapshot),
                UiEvent::Info(message) => self.status = message,
                UiEvent::Error(err) => self.report(err),
            }
        }
    }

    /// Local input buffers only follow the controller when it rewrote the form
    /// itself; echoes of our own keystrokes are ignored.
    fn apply_snapshot(&mut self, snapshot: ControllerSnapshot) {
        if snapshot.form_revision != self.seen_form_revision {
            self.name_input = snapshot.form.name.clone();
            self.email_input = snapshot.form.email.clone();
            self.seen_form_revision = snapshot.form_revision;
        }
        if let Some(pending) = &self.pending_delete {
            if snapshot.record(pending.id).is_none() {
                self.pending_delete = None;
            }
        }
        self.snapshot = snapshot;
    }

    fn report(&mut self, err: UiError) {
        tracing::error!(context = ?err.context(), "{}", err.message());
        self.status = err.message().to_string();
        if err.is_fatal() {
            self.fatal_error = Some(err);
        }
    }

    fn dispatch(&mut self, cmd: BackendCommand) {
        if let Err(err) = dispatch_backend_command(&self.cmd_tx, cmd) {
            self.report(err);
        }
    }

    fn request_delete(&mut self, id: UserId) {
        self.pending_delete = self.snapshot.record(id).cloned();
    }

    fn answer_delete(&mut self, confirmed: bool) {
        let Some(record) = self.pending_delete.take() else {
            return;
        };
        if confirmed {
            self.dispatch(BackendCommand::DeleteConfirmed { id: record.id });
        }
    }

    fn show_main(&mut self, ctx: &egui::Context) {
        let model = ViewModel::from_snapshot(&self.snapshot);

        if !self.status.is_empty() {
            egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
                ui.weak(self.status.as_str());
            });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(view::GREETING);
            ui.label(model.total_line.as_str());
            ui.separator();
            self.show_form(ui, &model.form);
            ui.separator();
            self.show_list(ui, &model);
        });

        self.show_delete_dialog(ctx);
    }

    fn show_form(&mut self, ui: &mut egui::Ui, form: &FormView) {
        ui.label(egui::RichText::new(form.heading).strong().size(HEADING_SIZE));
        ui.add_space(4.0);

        egui::Grid::new("user_form")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                ui.label(format!("{}:", view::NAME_LABEL));
                if ui.text_edit_singleline(&mut self.name_input).changed() {
                    self.dispatch(BackendCommand::SetField {
                        field: FormField::Name,
                        value: self.name_input.clone(),
                    });
                }
                ui.end_row();

                ui.label(format!("{}:", view::EMAIL_LABEL));
                if ui.text_edit_singleline(&mut self.email_input).changed() {
                    self.dispatch(BackendCommand::SetField {
                        field: FormField::Email,
                        value: self.email_input.clone(),
                    });
                }
                ui.end_row();
            });

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            let submit_enabled = form.submit_enabled && self.fatal_error.is_none();
            if ui
                .add_enabled(submit_enabled, egui::Button::new(form.submit_label))
                .clicked()
            {
                self.dispatch(BackendCommand::Submit);
            }
            if form.cancel_visible && ui.button(view::CANCEL_LABEL).clicked() {
                self.dispatch(BackendCommand::CancelEdit);
            }
        });
    }

    fn show_list(&mut self, ui: &mut egui::Ui, model: &ViewModel) {
        ui.label(
            egui::RichText::new(view::LIST_HEADING)
                .strong()
                .size(HEADING_SIZE),
        );
        ui.add_space(4.0);

        if let Some(line) = model.loading_line {
            ui.horizontal(|ui| {
                ui.add(egui::Spinner::new());
                ui.weak(line);
            });
        }
        if let Some(line) = model.empty_line {
            ui.weak(line);
            return;
        }

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for row in &model.rows {
                    ui.horizontal(|ui| {
                        ui.strong(row.name.as_str());
                        ui.label(format!("({})", row.email));
                        ui.weak(row.badge.as_str());
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button(view::DELETE_LABEL).clicked() {
                                self.request_delete(row.id);
                            }
                            if ui.button(view::EDIT_LABEL).clicked() {
                                self.dispatch(BackendCommand::BeginEdit { id: row.id });
                            }
                        });
                    });
                }
            });
    }

    fn show_delete_dialog(&mut self, ctx: &egui::Context) {
        let Some(record) = self.pending_delete.as_ref() else {
            return;
        };
        let prompt = view::delete_prompt(record);

        let mut answer = None;
        egui::Window::new("Confirm")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(prompt);
                ui.horizontal(|ui| {
                    if ui.button("OK").clicked() {
                        answer = Some(true);
                    }
                    if ui.button(view::CANCEL_LABEL).clicked() {
                        answer = Some(false);
                    }
                });
            });

        if let Some(confirmed) = answer {
            self.answer_delete(confirmed);
        }
    }
}

impl eframe::App for UserAdminApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.show_main(ctx);

        if self.snapshot.loading {
            ctx.request_repaint_after(Duration::from_millis(16));
        } else {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
