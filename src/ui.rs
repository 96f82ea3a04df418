use egui::Context;

use crate::controller::Session;
use crate::model::StrideMode;

/// Build the overlay UI and return egui output. Settings edited here are
/// picked up by the session on its next tick.
pub fn build_ui(
    egui_ctx: &Context,
    raw_input: egui::RawInput,
    session: &mut Session,
    wireframe: &mut bool,
    wireframe_available: bool,
) -> egui::FullOutput {
    egui_ctx.run(raw_input, |ctx| {
        if session.input.pointer_locked {
            draw_crosshair(ctx);
        } else {
            draw_capture_hint(ctx);
        }
        draw_debug_window(ctx, session);
        draw_settings_window(ctx, session, wireframe, wireframe_available);
    })
}

fn draw_crosshair(ctx: &Context) {
    let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::TOP, egui::Id::new("crosshair")));
    let center = ctx.available_rect().center();
    let size = 8.0;
    let stroke = egui::Stroke::new(1.0, egui::Color32::WHITE);
    painter.line_segment([center - egui::vec2(size, 0.0), center + egui::vec2(size, 0.0)], stroke);
    painter.line_segment([center - egui::vec2(0.0, size), center + egui::vec2(0.0, size)], stroke);
}

fn draw_capture_hint(ctx: &Context) {
    egui::Area::new(egui::Id::new("capture_hint"))
        .anchor(egui::Align2::CENTER_BOTTOM, [0.0, -16.0])
        .show(ctx, |ui| {
            ui.label(
                egui::RichText::new("Click to fly. Esc releases the mouse.")
                    .color(egui::Color32::WHITE),
            );
        });
}

fn draw_debug_window(ctx: &Context, session: &Session) {
    let frame = session.last_frame;
    let cam = &session.camera;
    let eye = cam.eye;

    egui::Window::new("Debug")
        .default_pos([8.0, 8.0])
        .show(ctx, |ui| {
            let fps = if frame.dt > 0.0 { 1.0 / frame.dt } else { 0.0 };
            ui.label(egui::RichText::new(format!("FPS: {fps:.0}")).small());
            ui.label(egui::RichText::new(format!("Pos: x: {:.1} y: {:.1} z: {:.1}", eye.x, eye.y, eye.z)).small());
            ui.label(
                egui::RichText::new(format!(
                    "Yaw: {:.1} Pitch: {:.1}",
                    cam.yaw.to_degrees(),
                    cam.pitch.to_degrees()
                ))
                .small(),
            );
            ui.label(egui::RichText::new(format!("Speed: {:.1}", session.input.speed)).small());
            ui.label(egui::RichText::new(format!("Captured: {}", session.input.pointer_locked)).small());
            ui.label(egui::RichText::new(format!("Particles: {}", session.particles.point_count())).small());
            ui.label(egui::RichText::new(format!("Scene nodes: {}", session.scene.borrow().len())).small());
            ui.separator();
            ui.label(egui::RichText::new("Controls:").small());
            ui.label(egui::RichText::new("WASD / arrows - Move").small());
            ui.label(egui::RichText::new("Space - Up").small());
            ui.label(egui::RichText::new("Shift - Down").small());
            ui.label(egui::RichText::new("Wheel - Speed").small());
        });
}

/// Speeds outside the slider range are left as they are. Edits land on
/// whole numbers no lower than 1.
fn speed_slider(ui: &mut egui::Ui, speed: &mut f32) {
    let mut value = *speed;
    let slider = egui::Slider::new(&mut value, 1.0..=100.0)
        .clamping(egui::SliderClamping::Never)
        .integer()
        .text("speed");
    if ui.add(slider).changed() {
        *speed = whole_speed(value);
    }
}

fn whole_speed(value: f32) -> f32 {
    if value.is_finite() {
        value.round().max(1.0)
    } else {
        1.0
    }
}

fn draw_settings_window(ctx: &Context, session: &mut Session, wireframe: &mut bool, wireframe_available: bool) {
    let width = ctx.available_rect().width();
    let settings = &mut session.settings;

    egui::Window::new("Settings")
        .default_pos([width - 220.0, 8.0])
        .default_size([210.0, 100.0])
        .show(ctx, |ui| {
            ui.collapsing("Movement", |ui| {
                speed_slider(ui, &mut session.input.speed);
                ui.checkbox(&mut settings.movement.vertical, "vertical movement");
                ui.add(
                    egui::Slider::new(&mut settings.movement.look_sensitivity, 0.0005..=0.01)
                        .logarithmic(true)
                        .text("look"),
                );
                let mut fov_deg = session.camera.fov_y.to_degrees().clamp(30.0, 120.0);
                if ui.add(egui::Slider::new(&mut fov_deg, 30.0..=120.0).step_by(5.0).text("FOV")).changed() {
                    session.camera.fov_y = fov_deg.to_radians();
                }
            });

            ui.collapsing("Particles", |ui| {
                ui.add(egui::Slider::new(&mut settings.particles.rotation_rate, -10.0..=10.0).text("spin"));
                ui.add(
                    egui::Slider::new(&mut settings.particles.amplitude, 0.0..=0.05)
                        .logarithmic(true)
                        .text("jitter"),
                );
                ui.horizontal(|ui| {
                    ui.radio_value(&mut settings.particles.stride, StrideMode::Interleaved, "interleaved");
                    ui.radio_value(&mut settings.particles.stride, StrideMode::PerPoint, "per point");
                });
            });

            ui.collapsing("Lighting", |ui| {
                ui.add(egui::Slider::new(&mut settings.lighting.sun_intensity, 0.0..=2.0).text("sun"));
                ui.add(egui::Slider::new(&mut settings.lighting.ambient, 0.0..=1.0).text("ambient"));
                ui.horizontal(|ui| {
                    ui.label("sky");
                    ui.color_edit_button_rgb(&mut settings.lighting.sky_color);
                });
                ui.checkbox(&mut settings.water.enabled, "water");
                ui.add_enabled(wireframe_available, egui::Checkbox::new(wireframe, "wireframe"));
            });
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::InputState;

    fn show_speed_slider(speed: &mut f32) {
        let ctx = Context::default();
        for _ in 0..2 {
            let _ = ctx.run(egui::RawInput::default(), |ctx| {
                egui::CentralPanel::default().show(ctx, |ui| speed_slider(ui, speed));
            });
        }
    }

    #[test]
    fn scrolled_speed_above_slider_range_survives_a_frame() {
        let mut input = InputState::new(100.0);
        for _ in 0..20 {
            input.on_scroll(-100.0);
        }
        assert_eq!(input.speed, 120.0);
        show_speed_slider(&mut input.speed);
        assert_eq!(input.speed, 120.0);
    }

    #[test]
    fn speed_at_floor_survives_a_frame() {
        let mut speed = 1.0;
        show_speed_slider(&mut speed);
        assert_eq!(speed, 1.0);
    }

    #[test]
    fn edited_speed_is_whole_and_at_least_one() {
        assert_eq!(whole_speed(1.5), 2.0);
        assert_eq!(whole_speed(7.2), 7.0);
        assert_eq!(whole_speed(0.4), 1.0);
        assert_eq!(whole_speed(-3.0), 1.0);
        assert_eq!(whole_speed(f32::NAN), 1.0);
        assert_eq!(whole_speed(250.0), 250.0);
    }

    #[test]
    fn edited_speed_keeps_scrolling_responsive() {
        let mut input = InputState::new(whole_speed(1.5));
        input.on_scroll(100.0);
        input.on_scroll(100.0);
        assert_eq!(input.speed, 1.0);
        input.on_scroll(-100.0);
        assert_eq!(input.speed, 2.0);
    }
}
