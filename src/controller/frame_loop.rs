use wgpu::{Device, Queue};

use crate::controller::session::{FrameStats, Session};
use crate::ui;
use crate::view::RenderState;

/// Per-frame driver shared by the web and native shells: advances the
/// session, pushes its state to the GPU and builds the overlay UI. The shell
/// then calls `RenderState::draw_frame`.
pub struct FrameLoopContext {
    pub session: Session,
    pub egui_ctx: egui::Context,
}

impl FrameLoopContext {
    pub fn new(session: Session) -> Self {
        Self { session, egui_ctx: egui::Context::default() }
    }

    /// `now` is a monotonic timestamp in seconds. `raw_input` carries the
    /// platform's egui events for this frame.
    pub fn update(
        &mut self,
        now: f64,
        mut raw_input: egui::RawInput,
        pixels_per_point: f32,
        device: &Device,
        queue: &Queue,
        render_state: &mut RenderState,
    ) -> FrameStats {
        let stats = self.session.tick(now);

        let session = &self.session;
        render_state.write_camera(queue, &session.camera);
        render_state.write_lighting(queue, &session.settings.lighting);
        render_state.sync_scene(device, &session.scene.borrow());
        render_state.upload_particles(device, queue, &session.particles);

        raw_input.time = Some(now);
        raw_input.screen_rect = Some(egui::Rect::from_min_size(
            egui::Pos2::ZERO,
            egui::vec2(
                render_state.width as f32 / pixels_per_point,
                render_state.height as f32 / pixels_per_point,
            ),
        ));
        self.egui_ctx.set_pixels_per_point(pixels_per_point);

        let wireframe_available = render_state.wireframe_available();
        let mut full_output = ui::build_ui(
            &self.egui_ctx,
            raw_input,
            &mut self.session,
            &mut render_state.wireframe_mode,
            wireframe_available,
        );

        let primitives = self.egui_ctx.tessellate(std::mem::take(&mut full_output.shapes), pixels_per_point);
        render_state.egui_primitives = Some(primitives);
        render_state.egui_full_output = Some(full_output);
        render_state.egui_dpr = pixels_per_point;

        stats
    }

    /// Keep the projection in step with a resized surface.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.session.camera.set_aspect(width, height);
    }
}
