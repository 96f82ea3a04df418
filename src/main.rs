use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{CursorGrabMode, Window, WindowId};

use skyland::config::Settings;
use skyland::controller::assets::FsLoader;
use skyland::controller::{spawn_landscape, EventQueue, FrameLoopContext, InputEvent, Session, SilentAudio};
use skyland::error::Result;
use skyland::logging;
use skyland::model::Camera;
use skyland::view::{GpuContext, RenderState};

/// Pixels per wheel "line", matching what browsers report in `deltaY`.
const LINE_HEIGHT: f32 = 100.0;

/// Everything that exists once the window is up.
struct Viewer {
    window: Arc<Window>,
    gpu: GpuContext,
    render_state: RenderState,
    egui_state: egui_winit::State,
    frame_ctx: FrameLoopContext,
    events: EventQueue,
    captured: bool,
}

impl Viewer {
    async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();
        let instance = GpuContext::native_instance();
        let surface = instance.create_surface(window.clone())?;
        let gpu = GpuContext::new_native(&instance, surface, size.width, size.height).await?;

        let settings = Settings::default();
        let mut camera = Camera::new(size.width, size.height);
        camera.set_look_at(glam::Vec3::ZERO);
        let session = Session::new(settings, camera, Box::new(SilentAudio));
        spawn_landscape(&FsLoader::new("."), session.scene.clone(), &session.settings.landscape);

        let render_state = RenderState::new(
            &gpu.device,
            gpu.format,
            gpu.config.alpha_mode,
            gpu.config.width,
            gpu.config.height,
            session.particles.point_count(),
        );

        let frame_ctx = FrameLoopContext::new(session);
        let egui_state = egui_winit::State::new(
            frame_ctx.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            None,
            None,
            None,
        );

        Ok(Self {
            events: frame_ctx.session.events(),
            window,
            gpu,
            render_state,
            egui_state,
            frame_ctx,
            captured: false,
        })
    }

    /// Grab or release the cursor and tell the session.
    fn set_capture(&mut self, on: bool) {
        if on == self.captured {
            return;
        }
        if on {
            let grabbed = self
                .window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined));
            if let Err(e) = grabbed {
                tracing::warn!("cursor grab refused: {e}");
                return;
            }
            self.window.set_cursor_visible(false);
        } else {
            if let Err(e) = self.window.set_cursor_grab(CursorGrabMode::None) {
                tracing::warn!("cursor release failed: {e}");
            }
            self.window.set_cursor_visible(true);
        }
        self.captured = on;
        self.events.push(InputEvent::PointerLockChanged { locked: on });
    }

    fn redraw(&mut self, now: f64) {
        let raw_input = self.egui_state.take_egui_input(&self.window);
        let ppp = self.window.scale_factor() as f32;
        self.frame_ctx.update(
            now,
            raw_input,
            ppp,
            &self.gpu.device,
            &self.gpu.queue,
            &mut self.render_state,
        );

        if let Some(output) = self.render_state.egui_full_output.as_mut() {
            let platform_output = std::mem::take(&mut output.platform_output);
            self.egui_state.handle_platform_output(&self.window, platform_output);
        }

        let scene = self.frame_ctx.session.scene.borrow();
        self.render_state
            .draw_frame(&self.gpu.device, &self.gpu.queue, &self.gpu.surface, &scene);
    }
}

/// Losing focus or being hidden releases the cursor, as blur and a hidden
/// tab end pointer lock in the browser.
fn ends_capture(event: &WindowEvent) -> bool {
    matches!(event, WindowEvent::Focused(false) | WindowEvent::Occluded(true))
}

struct App {
    viewer: Option<Viewer>,
    start: Instant,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }
        let attributes = Window::default_attributes()
            .with_title("Skyland")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let viewer = event_loop
            .create_window(attributes)
            .map_err(Into::into)
            .and_then(|window| pollster::block_on(Viewer::new(Arc::new(window))));
        match viewer {
            Ok(viewer) => {
                tracing::info!("window ready, click to fly");
                self.viewer = Some(viewer);
            }
            Err(e) => {
                tracing::error!("startup failed: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(viewer) = self.viewer.as_mut() else { return };

        if ends_capture(&event) {
            viewer.set_capture(false);
        }

        let consumed = viewer.egui_state.on_window_event(&viewer.window, &event).consumed;
        if consumed && !viewer.captured {
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                let gpu = &viewer.gpu;
                if viewer.render_state.resize(&gpu.device, &gpu.surface, size.width, size.height) {
                    viewer.frame_ctx.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else { return };
                let code = format!("{code:?}");
                match event.state {
                    ElementState::Pressed => {
                        if viewer.frame_ctx.session.input.bindings.is_release_pointer(&code) {
                            viewer.set_capture(false);
                        }
                        viewer.events.push(InputEvent::KeyDown(code));
                    }
                    ElementState::Released => viewer.events.push(InputEvent::KeyUp(code)),
                }
            }
            WindowEvent::MouseInput { state: ElementState::Pressed, button: MouseButton::Left, .. } => {
                if !viewer.frame_ctx.egui_ctx.is_pointer_over_area() {
                    viewer.set_capture(true);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * LINE_HEIGHT,
                    MouseScrollDelta::PixelDelta(p) => -p.y as f32,
                };
                viewer.events.push(InputEvent::MouseWheel { delta_y });
            }
            WindowEvent::Focused(false) => viewer.events.push(InputEvent::FocusLost),
            WindowEvent::Occluded(hidden) => {
                viewer.events.push(InputEvent::VisibilityChanged { visible: !hidden })
            }
            WindowEvent::RedrawRequested => {
                let now = self.start.elapsed().as_secs_f64();
                viewer.redraw(now);
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let (Some(viewer), DeviceEvent::MouseMotion { delta }) = (self.viewer.as_mut(), event) {
            if viewer.captured {
                viewer.events.push(InputEvent::MouseMove { dx: delta.0 as f32, dy: delta.1 as f32 });
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(viewer) = &self.viewer {
            viewer.window.request_redraw();
        }
    }
}

fn main() {
    logging::init();

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            tracing::error!("cannot create event loop: {e}");
            return;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App { viewer: None, start: Instant::now() };
    if let Err(e) = event_loop.run_app(&mut app) {
        tracing::error!("event loop exited with error: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_loss_and_occlusion_end_capture() {
        assert!(ends_capture(&WindowEvent::Focused(false)));
        assert!(ends_capture(&WindowEvent::Occluded(true)));
    }

    #[test]
    fn regaining_focus_keeps_capture_state() {
        assert!(!ends_capture(&WindowEvent::Focused(true)));
        assert!(!ends_capture(&WindowEvent::Occluded(false)));
        assert!(!ends_capture(&WindowEvent::CloseRequested));
    }
}
