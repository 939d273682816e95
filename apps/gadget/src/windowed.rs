//! Desktop emulator window built on `eframe`.

use std::time::{Duration, Instant};

use eframe::egui;
use frontend_core::{
    config::{BackendVariant, DisplayGeometry},
    windowed::{TickOutcome, WindowButton, WindowedSession},
    BackendConfig, BackendError, FrontendEndpoint, RenderBackend, ShutdownHandle,
};
use shared::{Action, Frame};

const LAMP_HOLD: Duration = Duration::from_millis(200);
const MIN_REPAINT: Duration = Duration::from_millis(10);

const KEY_BINDINGS: [(egui::Key, WindowButton); 6] = [
    (egui::Key::ArrowLeft, WindowButton::Left),
    (egui::Key::ArrowRight, WindowButton::Right),
    (egui::Key::Enter, WindowButton::Center),
    (egui::Key::Space, WindowButton::Center),
    (egui::Key::Q, WindowButton::B1),
    (egui::Key::E, WindowButton::B2),
];

pub fn button_for_key(key: egui::Key) -> Option<WindowButton> {
    KEY_BINDINGS
        .iter()
        .find(|(bound, _)| *bound == key)
        .map(|(_, button)| *button)
}

pub struct EguiBackend {
    session: WindowedSession,
    title: String,
    scale: f32,
    geometry: DisplayGeometry,
}

impl EguiBackend {
    pub fn new(config: &BackendConfig, endpoint: FrontendEndpoint) -> Self {
        Self {
            session: WindowedSession::new(endpoint, config.poll_interval),
            title: config.windowed.title.clone(),
            scale: config.windowed.scale,
            geometry: config.display,
        }
    }
}

impl RenderBackend for EguiBackend {
    fn variant(&self) -> BackendVariant {
        BackendVariant::Windowed
    }

    fn on_action(&self, action: Action) -> Result<(), BackendError> {
        self.session.on_action(action)
    }

    fn on_frame(&mut self, frame: Frame) -> Result<(), BackendError> {
        self.session.on_frame(frame);
        Ok(())
    }

    fn run(self: Box<Self>) -> Result<(), BackendError> {
        let EguiBackend {
            session,
            title,
            scale,
            geometry,
        } = *self;

        let screen = egui::vec2(
            geometry.width as f32 * scale,
            geometry.height as f32 * scale,
        );
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_title(title.as_str())
                .with_inner_size([screen.x + 48.0, screen.y + 150.0])
                .with_min_inner_size([screen.x + 24.0, screen.y + 120.0]),
            ..Default::default()
        };

        tracing::info!(%title, scale, "opening emulator window");
        eframe::run_native(
            &title,
            options,
            Box::new(move |_cc| Ok(Box::new(EmulatorApp::new(session, screen)))),
        )
        .map_err(|err| BackendError::Toolkit(err.to_string()))?;

        tracing::info!("emulator window closed");
        Ok(())
    }

    fn shutdown_handle(&self) -> ShutdownHandle {
        self.session.shutdown_handle()
    }

    fn wants_main_thread(&self) -> bool {
        true
    }
}

struct EmulatorApp {
    session: WindowedSession,
    screen_size: egui::Vec2,
    texture: Option<egui::TextureHandle>,
    shown_generation: u64,
    last_input: Option<Instant>,
    status: Option<String>,
    closing: bool,
}

impl EmulatorApp {
    fn new(session: WindowedSession, screen_size: egui::Vec2) -> Self {
        Self {
            session,
            screen_size,
            texture: None,
            shown_generation: 0,
            last_input: None,
            status: None,
            closing: false,
        }
    }

    fn press(&mut self, button: WindowButton) {
        self.last_input = Some(Instant::now());
        match self.session.press(button) {
            Ok(()) => self.status = None,
            Err(err) => {
                tracing::warn!(button = button.label(), "{err}");
                self.status = Some(err.to_string());
            }
        }
    }

    fn lamp_lit(&self, now: Instant) -> bool {
        self.last_input
            .is_some_and(|at| now.saturating_duration_since(at) < LAMP_HOLD)
    }

    fn upload_frame(&mut self, ctx: &egui::Context) {
        if self.session.generation() == self.shown_generation {
            return;
        }
        let Some(frame) = self.session.current_frame() else {
            return;
        };

        let rgba = frame.to_rgba();
        let image = egui::ColorImage::from_rgba_unmultiplied(
            [frame.width() as usize, frame.height() as usize],
            &rgba,
        );
        match &mut self.texture {
            Some(texture) => texture.set(image, egui::TextureOptions::NEAREST),
            None => {
                self.texture = Some(ctx.load_texture("screen", image, egui::TextureOptions::NEAREST))
            }
        }
        self.shown_generation = self.session.generation();
    }

    fn show_screen(&self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.label("Screen");
            match &self.texture {
                Some(texture) => {
                    ui.add(egui::Image::new((texture.id(), self.screen_size)));
                }
                None => {
                    let (rect, _) = ui.allocate_exact_size(self.screen_size, egui::Sense::hover());
                    ui.painter().rect_filled(rect, 0.0, egui::Color32::BLACK);
                }
            }
        });
    }

    fn show_leds(&self, ui: &mut egui::Ui, now: Instant) {
        ui.group(|ui| {
            ui.label("LEDs");
            let (rect, _) = ui.allocate_exact_size(egui::vec2(24.0, 24.0), egui::Sense::hover());
            let color = if self.lamp_lit(now) {
                egui::Color32::from_rgb(64, 128, 255)
            } else {
                egui::Color32::from_rgb(16, 24, 64)
            };
            ui.painter().circle_filled(rect.center(), 9.0, color);
        });
    }

    fn show_actions(&self, ui: &mut egui::Ui) -> Option<WindowButton> {
        let mut pressed = None;
        ui.group(|ui| {
            ui.label("Actions");
            ui.horizontal(|ui| {
                for button in WindowButton::ROW {
                    if ui.button(button.label()).clicked() {
                        pressed = Some(button);
                    }
                }
            });
        });
        pressed
    }
}

impl eframe::App for EmulatorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) && !self.session.close_requested() {
            tracing::info!("window close requested");
            self.session.request_close();
        }

        let keyed: Vec<WindowButton> = ctx.input(|i| {
            KEY_BINDINGS
                .iter()
                .filter(|(key, _)| i.key_pressed(*key))
                .map(|(_, button)| *button)
                .collect()
        });
        for button in keyed {
            self.press(button);
        }

        let now = Instant::now();
        match self.session.tick(now) {
            TickOutcome::NewFrame => self.upload_frame(ctx),
            TickOutcome::Closed if !self.closing => {
                self.closing = true;
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
            _ => {}
        }

        let mut clicked = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_screen(ui);
            ui.horizontal(|ui| {
                self.show_leds(ui, now);
                clicked = self.show_actions(ui);
            });
            if let Some(status) = &self.status {
                ui.colored_label(egui::Color32::LIGHT_RED, status);
            }
        });
        if let Some(button) = clicked {
            self.press(button);
        }

        let next = self.session.until_next_poll(Instant::now()).max(MIN_REPAINT);
        ctx.request_repaint_after(if self.lamp_lit(now) { MIN_REPAINT } else { next });
    }
}

#[cfg(test)]
#[path = "tests/windowed_tests.rs"]
mod tests;
