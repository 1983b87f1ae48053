//! Code Companion — chat with a local model on one side, edit the code it
//! writes on the other.

use eframe::egui;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

mod editor;
mod session;
mod types;
mod utils;

use editor::CODE_BG;
use types::{AppState, SessionPhase};
use utils::save_settings;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_min_inner_size([900.0, 600.0]),
        vsync: true,
        ..Default::default()
    };
    eframe::run_native(
        "Code Companion",
        options,
        Box::new(|_cc| {
            Box::new(CodeCompanionApp {
                state: Arc::new(Mutex::new(AppState::default())),
            })
        }),
    )
}

struct CodeCompanionApp {
    state: Arc<Mutex<AppState>>,
}

impl eframe::App for CodeCompanionApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut s = self.state.lock();

        // Apply worker events and due highlight timers, on this thread only.
        s.poll_session_events();
        s.editors.poll(Instant::now());

        // Keep polling while anything is pending.
        if s.session.is_some() || s.editors.has_pending_highlight() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::SidePanel::right("chat_panel")
            .default_width(520.0)
            .min_width(360.0)
            .show(ctx, |ui| {
                chat_panel(ui, &mut s);
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::default().fill(CODE_BG).inner_margin(6.0))
            .show(ctx, |ui| {
                s.editors.ui(ui);
            });

        settings_window(ctx, &mut s);
    }
}

fn chat_panel(ui: &mut egui::Ui, s: &mut AppState) {
    ui.horizontal(|ui| {
        ui.heading("Code Companion");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("⚙").on_hover_text("Settings").clicked() {
                s.show_settings = !s.show_settings;
            }
            ui.label(egui::RichText::new(s.settings.model.as_str()).weak().small());
        });
    });
    ui.separator();

    let footer_height = 70.0;
    egui::ScrollArea::vertical()
        .max_height(ui.available_height() - footer_height)
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            // Read-only but selectable.
            ui.add(
                egui::TextEdit::multiline(&mut s.conversation_view.as_str())
                    .frame(false)
                    .desired_width(f32::INFINITY),
            );
        });

    // Status line: animated dots while a session is active, 500ms period.
    if let Some(session) = &s.session {
        let ticks = session.started_at.elapsed().as_millis() / 500;
        let dots = ".".repeat((ticks % 4) as usize);
        let label = match session.phase {
            SessionPhase::Requesting => "Contacting model",
            SessionPhase::Streaming => "Model is responding",
        };
        ui.label(
            egui::RichText::new(format!("{}{}", label, dots))
                .weak()
                .italics(),
        );
    } else {
        ui.label("");
    }

    ui.horizontal(|ui| {
        let streaming = s.is_streaming();
        let input = ui.add_enabled(
            !streaming,
            egui::TextEdit::singleline(&mut s.input_text)
                .hint_text("Ask the model…")
                .desired_width(ui.available_width() - 150.0),
        );
        if input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            s.submit_message();
            input.request_focus();
        }
        if ui
            .add_enabled(!streaming, egui::Button::new("Send"))
            .clicked()
        {
            s.submit_message();
        }
        if ui
            .add_enabled(streaming, egui::Button::new("Cancel"))
            .clicked()
        {
            s.cancel_session();
        }
    });
}

fn settings_window(ctx: &egui::Context, s: &mut AppState) {
    let mut open = s.show_settings;
    egui::Window::new("Settings")
        .open(&mut open)
        .resizable(false)
        .show(ctx, |ui| {
            ui.label("Model");
            ui.text_edit_singleline(&mut s.settings.model);
            ui.add_space(6.0);

            ui.checkbox(
                &mut s.settings.live_code_updates,
                "Update code panel while streaming",
            );
            ui.add(
                egui::Slider::new(&mut s.settings.highlight_debounce_ms, 100..=2000)
                    .text("Highlight debounce (ms)"),
            );

            let mut transcript_enabled = s.settings.transcript_path.is_some();
            if ui
                .checkbox(&mut transcript_enabled, "Append transcript file")
                .changed()
            {
                s.settings.transcript_path =
                    transcript_enabled.then(|| "model_responses.txt".to_string());
            }
            if let Some(path) = &mut s.settings.transcript_path {
                ui.text_edit_singleline(path);
            }

            ui.add_space(6.0);
            if ui.button("Save").clicked() {
                save_settings(&s.settings);
                s.editors
                    .set_debounce(Duration::from_millis(s.settings.highlight_debounce_ms));
                s.settings_status = Some("Saved".to_string());
            }
            if let Some(status) = &s.settings_status {
                ui.label(egui::RichText::new(status.as_str()).weak());
            }
        });
    s.show_settings = open;
}
