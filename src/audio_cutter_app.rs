use crate::config::CutterConfig;
use crate::decode::{RodioDecodeService, SourceFile};
use crate::error::{EditError, Result};
use crate::region::RegionKind;
use crate::session::{EditSession, SessionEvent, SessionState};
use crate::trim::TrimMode;
use eframe::egui;
use std::path::Path;
use tracing::{info, warn};

/// AudioCutterApp controls application UI.
///
/// The app is a thin front end: every edit goes through [EditSession], and the app only
/// keeps the values typed into its input fields plus the last status message.
pub struct AudioCutterApp {
    /// Session that owns regions, the current audio resource and the decode thread.
    session: EditSession,
    config: CutterConfig,

    /// Current audio track filename, chosen by user.
    current_file_name: Option<String>,
    /// Selection bounds in seconds, as entered by the user.
    selection_start: f64,
    selection_end: f64,
    /// Marker position in seconds.
    marker_at: f64,
    /// Last message shown to the user.
    status: String,
}

impl AudioCutterApp {
    /// Creates the app and its editing session.
    ///
    /// # Parameters
    ///
    /// * `cc` - eframe creation context, used by the decode thread to force UI repainting.
    /// * `config` - settings from the command line.
    pub fn new(cc: &eframe::CreationContext<'_>, config: CutterConfig) -> Result<Self> {
        let ui_ctx = cc.egui_ctx.clone();
        let mut session = EditSession::with_notifier(
            Box::new(RodioDecodeService),
            Some(Box::new(move || ui_ctx.request_repaint())),
        )?;
        session.set_export_name(config.export_name.clone());

        let mut app = Self {
            session,
            config,
            current_file_name: None,
            selection_start: 0.0,
            selection_end: 0.0,
            marker_at: 0.0,
            status: String::new(),
        };

        if let Some(path) = app.config.initial_file.clone() {
            app.load_file(&path);
        }
        Ok(app)
    }

    /// Reads and starts decoding the file at `path`.
    fn load_file(&mut self, path: &Path) {
        info!(path = %path.display(), "opening file");
        let result = SourceFile::open(path).and_then(|file| {
            let name = file.name.clone();
            self.session.begin_load(file).map(|_| name)
        });

        match result {
            Ok(name) => {
                self.status = format!("Загрузка {name} ...");
                self.current_file_name = Some(name);
            }
            Err(error) => self.report(&error),
        }
    }

    fn report(&mut self, error: &EditError) {
        warn!(%error, "operation failed");
        self.status = error.user_message().to_string();
    }

    /// Applies a finished decode or trim to the UI state.
    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Loaded { buffer, .. } => {
                self.selection_start = 0.0;
                self.selection_end = buffer.duration();
                self.marker_at = 0.0;
                self.status = format!(
                    "Загружено: {} каналов, {} Гц, {}",
                    buffer.channel_count(),
                    buffer.sample_rate(),
                    format_time(buffer.duration())
                );
            }
            SessionEvent::Trimmed { mode, info, .. } => {
                self.selection_start = 0.0;
                self.selection_end = info.duration();
                self.marker_at = self.marker_at.min(info.duration());
                let kind = match mode {
                    TrimMode::Outer => "Внешняя",
                    TrimMode::Inner => "Внутренняя",
                };
                self.status = format!(
                    "{kind} обрезка готова, длительность {}",
                    format_time(info.duration())
                );
            }
            SessionEvent::LoadFailed { error, .. } => {
                self.current_file_name = None;
                self.report(&error);
            }
            SessionEvent::TrimFailed { error, .. } => self.report(&error),
        }
    }

    /// Controls behavior of opening file UI button.
    ///
    /// # Parameters
    ///
    /// * `ui` - `egui::UI` for placing the button on.
    fn open_file_button(&mut self, ui: &mut egui::Ui) {
        if ui.button("Открыть файл...").clicked() {
            if let Some(file) = rfd::FileDialog::new()
                .add_filter("Аудио файл", &["mp3", "wav", "ogg"])
                .pick_file()
            {
                self.load_file(&file);
            }
        }
    }

    /// Controls selection and marker part of the UI.
    ///
    /// # Parameters
    ///
    /// * `ui` - `egui::UI` for placing region controls on.
    /// * `duration` - length of the active buffer in seconds.
    fn region_controls(&mut self, ui: &mut egui::Ui, duration: f64) {
        ui.horizontal(|ui| {
            ui.label("Начало:");
            ui.add(
                egui::DragValue::new(&mut self.selection_start)
                    .speed(0.05)
                    .range(0.0..=duration)
                    .suffix(" с"),
            );
            ui.label("Конец:");
            ui.add(
                egui::DragValue::new(&mut self.selection_end)
                    .speed(0.05)
                    .range(0.0..=duration)
                    .suffix(" с"),
            );
            if ui.button("Выделить").clicked() {
                match self
                    .session
                    .set_selection(self.selection_start, self.selection_end)
                {
                    Ok(region) => {
                        self.status = format!(
                            "Выделено {} - {}",
                            format_time(region.start),
                            format_time(region.end)
                        )
                    }
                    Err(error) => self.report(&error),
                }
            }
        });

        ui.horizontal(|ui| {
            ui.label("Маркер:");
            ui.add(
                egui::DragValue::new(&mut self.marker_at)
                    .speed(0.05)
                    .range(0.0..=duration)
                    .suffix(" с"),
            );
            if ui.button("Добавить маркер").clicked() {
                match self.session.add_marker(self.marker_at) {
                    Ok(region) => self.status = format!("Маркер {}", region.label()),
                    Err(error) => self.report(&error),
                }
            }
            if ui.button("Удалить все").clicked() {
                match self.session.clear_regions() {
                    Ok(()) => self.status = String::from("Выделения и маркеры удалены"),
                    Err(error) => self.report(&error),
                }
            }
        });

        let regions = self.session.regions().regions();
        if !regions.is_empty() {
            ui.horizontal_wrapped(|ui| {
                for region in regions {
                    match region.kind {
                        RegionKind::Selection => ui.label(format!(
                            "[{} - {}]",
                            format_time(region.start),
                            format_time(region.end)
                        )),
                        RegionKind::Marker => ui.label(format!("| {}", region.label())),
                    };
                }
            });
        }
    }

    /// Controls trimming and saving part of the UI.
    ///
    /// # Parameters
    ///
    /// * `ui` - `egui::UI` for placing trim controls on.
    fn trim_controls(&mut self, ui: &mut egui::Ui) {
        let idle = self.session.state() == SessionState::Ready;
        let has_selection = self.session.regions().selection().is_some();

        ui.horizontal(|ui| {
            let mut requested = None;
            if ui
                .add_enabled(idle && has_selection, egui::Button::new("Оставить выделенное"))
                .clicked()
            {
                requested = Some(TrimMode::Outer);
            }
            if ui
                .add_enabled(idle && has_selection, egui::Button::new("Вырезать выделенное"))
                .clicked()
            {
                requested = Some(TrimMode::Inner);
            }

            if let Some(mode) = requested {
                match self.session.request_trim(mode) {
                    Ok(_) => self.status = String::from("Обрезка ..."),
                    Err(error) => self.report(&error),
                }
            }

            if ui.add_enabled(idle, egui::Button::new("Сохранить...")).clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("WAV файл", &["wav"])
                    .set_file_name(self.config.export_name.as_str())
                    .save_file()
                {
                    match self.session.export_current(&path) {
                        Ok(()) => self.status = format!("Сохранено в {}", path.display()),
                        Err(error) => self.report(&error),
                    }
                }
            }
        });
    }
}

impl eframe::App for AudioCutterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // The decode thread requests a repaint when it finishes, so results are picked up
        // here without a timer.
        while let Some(event) = self.session.poll() {
            self.handle_event(event);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading("Audio Cutter");

                self.open_file_button(ui);

                if let Some(name) = &self.current_file_name {
                    ui.horizontal(|ui| {
                        ui.label("Открытый файл:");
                        ui.label(name.as_str());
                    });
                }

                match self.session.state() {
                    SessionState::Decoding | SessionState::Trimming => {
                        ui.spinner();
                    }
                    SessionState::Ready => {
                        let duration = self
                            .session
                            .buffer_info()
                            .map(|info| info.duration())
                            .unwrap_or_default();
                        ui.label(format!("Длительность: {}", format_time(duration)));
                        ui.separator();
                        self.region_controls(ui, duration);
                        ui.separator();
                        self.trim_controls(ui);
                    }
                    SessionState::Empty => {}
                }

                if !self.status.is_empty() {
                    ui.separator();
                    ui.label(self.status.as_str());
                }
            });
        });
    }
}

/// Formats seconds as `m:ss.s`.
fn format_time(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor();
    format!("{}:{:04.1}", minutes as u64, seconds - minutes * 60.0)
}
