pub mod config;
pub mod error;
pub mod logging;
pub mod utils;
pub mod ui;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

#[cfg(target_arch = "wasm32")]
use std::cell::RefCell;
#[cfg(target_arch = "wasm32")]
use std::rc::Rc;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::closure::Closure;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
#[cfg(target_arch = "wasm32")]
use web_sys::{Document, Event, HtmlCanvasElement, KeyboardEvent, MouseEvent, WheelEvent, Window};

#[cfg(target_arch = "wasm32")]
use controller::{
    assets::FetchLoader,
    audio::web::WebAudio,
    input::wasm as dom,
    AudioEngine, EventQueue, FrameLoopContext, InputEvent, KeyBindings, Session, SilentAudio,
};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    logging::init();
    let (window, document, canvas) = init_canvas()?;
    setup_app(&window, &document, &canvas).await
}

#[cfg(target_arch = "wasm32")]
async fn setup_app(window: &Window, document: &Document, canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
    let gpu = view::GpuContext::new(canvas, canvas.width(), canvas.height()).await?;
    let width = gpu.config.width;
    let height = gpu.config.height;

    let settings = config::Settings::default();
    let audio: Box<dyn AudioEngine> = match WebAudio::new(&settings.audio) {
        Ok(audio) => Box::new(audio),
        Err(e) => {
            tracing::warn!("web audio unavailable, continuing silent: {e:?}");
            Box::new(SilentAudio)
        }
    };
    let mut camera = model::Camera::new(width, height);
    camera.set_look_at(glam::Vec3::ZERO);
    let session = Session::new(settings, camera, audio);
    controller::spawn_landscape(&FetchLoader, session.scene.clone(), &session.settings.landscape);

    let mut render_state = view::RenderState::new(
        gpu.device.as_ref(),
        gpu.format,
        gpu.config.alpha_mode,
        width,
        height,
        session.particles.point_count(),
    );

    let egui_events: Rc<RefCell<Vec<egui::Event>>> = Rc::new(RefCell::new(Vec::new()));
    let mut frame_ctx = FrameLoopContext::new(session);

    setup_input_listeners(
        document,
        window,
        canvas,
        frame_ctx.session.events(),
        frame_ctx.session.input.bindings.clone(),
        egui_events.clone(),
        frame_ctx.egui_ctx.clone(),
    )?;

    let f = RcCellCallback::new(window.clone(), {
        let window = window.clone();
        let canvas = canvas.clone();

        move || {
            let now = window.performance().map(|p| p.now()).unwrap_or(0.0) / 1000.0;
            let dpr = window.device_pixel_ratio() as f32;

            // Track the CSS size of the page in device pixels
            let w = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0);
            let h = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0);
            let (w, h) = ((w * dpr as f64) as u32, (h * dpr as f64) as u32);
            if render_state.resize(gpu.device.as_ref(), &gpu.surface, w, h) {
                canvas.set_width(w);
                canvas.set_height(h);
                frame_ctx.resize(w, h);
            }

            let mut raw_input = egui::RawInput::default();
            raw_input.events.extend(egui_events.borrow_mut().drain(..));

            frame_ctx.update(now, raw_input, dpr, gpu.device.as_ref(), gpu.queue.as_ref(), &mut render_state);

            let scene = frame_ctx.session.scene.borrow();
            render_state.draw_frame(gpu.device.as_ref(), gpu.queue.as_ref(), &gpu.surface, &scene);
        }
    });
    f.start()
}

/// Translate DOM events into `InputEvent`s for the session queue. Pointer
/// events for the overlay UI go to `egui_events` while the mouse is free.
#[cfg(target_arch = "wasm32")]
fn setup_input_listeners(
    document: &Document,
    window: &Window,
    canvas: &HtmlCanvasElement,
    events: EventQueue,
    bindings: KeyBindings,
    egui_events: Rc<RefCell<Vec<egui::Event>>>,
    egui_ctx: egui::Context,
) -> Result<(), JsValue> {
    // Keyboard down
    {
        let events = events.clone();
        let document_for_exit = document.clone();
        let keydown = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            let code = e.code();
            if bindings.is_release_pointer(&code) {
                document_for_exit.exit_pointer_lock();
            }
            if bindings.is_navigation(&code) {
                e.prevent_default();
            }
            events.push(dom::keyboard_event_to_input(&e, true));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
        keydown.forget();
    }

    // Keyboard up
    {
        let events = events.clone();
        let keyup = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            events.push(dom::keyboard_event_to_input(&e, false));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keyup", keyup.as_ref().unchecked_ref())?;
        keyup.forget();
    }

    // Focus loss
    {
        let events = events.clone();
        let blur = Closure::wrap(Box::new(move |_e: Event| {
            events.push(InputEvent::FocusLost);
        }) as Box<dyn FnMut(Event)>);
        window.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref())?;
        blur.forget();
    }

    // Tab hidden or shown
    {
        let events = events.clone();
        let doc_vis = document.clone();
        let visibility = Closure::wrap(Box::new(move |_e: Event| {
            events.push(InputEvent::VisibilityChanged { visible: !doc_vis.hidden() });
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("visibilitychange", visibility.as_ref().unchecked_ref())?;
        visibility.forget();
    }

    // Pointer lock change
    {
        let events = events.clone();
        let doc_pl = document.clone();
        let plc = Closure::wrap(Box::new(move |_e: Event| {
            let locked = doc_pl.pointer_lock_element().is_some();
            events.push(InputEvent::PointerLockChanged { locked });
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("pointerlockchange", plc.as_ref().unchecked_ref())?;
        plc.forget();
    }

    // Canvas click captures the pointer unless it landed on the overlay
    {
        let canvas_click = canvas.clone();
        let egui_ctx = egui_ctx.clone();
        let click = Closure::wrap(Box::new(move |_e: MouseEvent| {
            if !egui_ctx.is_pointer_over_area() {
                canvas_click.request_pointer_lock();
            }
        }) as Box<dyn FnMut(MouseEvent)>);
        canvas.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())?;
        click.forget();
    }

    // Mouse move
    {
        let events = events.clone();
        let egui_q = egui_events.clone();
        let doc_mm = document.clone();
        let mm = Closure::wrap(Box::new(move |e: MouseEvent| {
            if doc_mm.pointer_lock_element().is_some() {
                events.push(dom::mouse_move_to_input(e.movement_x() as f32, e.movement_y() as f32));
            } else {
                let pos = egui::pos2(e.client_x() as f32, e.client_y() as f32);
                egui_q.borrow_mut().push(egui::Event::PointerMoved(pos));
            }
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback("mousemove", mm.as_ref().unchecked_ref())?;
        mm.forget();
    }

    // Mouse buttons drive the overlay while the pointer is free
    for (name, pressed) in [("mousedown", true), ("mouseup", false)] {
        let egui_q = egui_events.clone();
        let doc_btn = document.clone();
        let button = Closure::wrap(Box::new(move |e: MouseEvent| {
            if doc_btn.pointer_lock_element().is_some() || e.button() != 0 {
                return;
            }
            egui_q.borrow_mut().push(egui::Event::PointerButton {
                pos: egui::pos2(e.client_x() as f32, e.client_y() as f32),
                button: egui::PointerButton::Primary,
                pressed,
                modifiers: egui::Modifiers::default(),
            });
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback(name, button.as_ref().unchecked_ref())?;
        button.forget();
    }

    // Context menu prevention
    {
        let contextmenu = Closure::wrap(Box::new(move |e: MouseEvent| {
            e.prevent_default();
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback("contextmenu", contextmenu.as_ref().unchecked_ref())?;
        contextmenu.forget();
    }

    // Mouse wheel adjusts flight speed
    {
        let wheel = Closure::wrap(Box::new(move |e: WheelEvent| {
            events.push(dom::mouse_wheel_to_input(&e));
        }) as Box<dyn FnMut(WheelEvent)>);
        document.add_event_listener_with_callback("wheel", wheel.as_ref().unchecked_ref())?;
        wheel.forget();
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn init_canvas() -> Result<(Window, Document, HtmlCanvasElement), JsValue> {
    let dom_err = |msg: &str| JsValue::from(error::Error::Dom(msg.to_string()));
    let window = web_sys::window().ok_or_else(|| dom_err("no global `window`"))?;
    let document = window.document().ok_or_else(|| dom_err("no document on window"))?;
    let body = document.body().ok_or_else(|| dom_err("no body on document"))?;
    let canvas_el = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| dom_err("failed to create canvas"))?;

    let dpr = window.device_pixel_ratio();
    let w = window.inner_width()?.as_f64().unwrap_or(800.0) * dpr;
    let h = window.inner_height()?.as_f64().unwrap_or(600.0) * dpr;
    canvas_el.set_width(w as u32);
    canvas_el.set_height(h as u32);
    canvas_el.style().set_property("width", "100vw")?;
    canvas_el.style().set_property("height", "100vh")?;
    canvas_el.style().set_property("display", "block")?;
    body.append_child(&canvas_el)?;
    Ok((window, document, canvas_el))
}

/// requestAnimationFrame loop around a boxed frame callback.
#[cfg(target_arch = "wasm32")]
struct RcCellCallback {
    inner: Rc<RefCell<Box<dyn FnMut()>>>,
    window: Window,
}

#[cfg(target_arch = "wasm32")]
impl RcCellCallback {
    fn new(window: Window, f: impl FnMut() + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Box::new(f))),
            window,
        }
    }

    fn start(self) -> Result<(), JsValue> {
        let inner = self.inner.clone();
        let window = self.window.clone();

        let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
        let callback_clone = callback.clone();

        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            inner.borrow_mut().as_mut()();

            if let Some(cb) = callback_clone.borrow().as_ref() {
                if let Err(e) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    tracing::error!("requestAnimationFrame failed, loop stopped: {e:?}");
                }
            }
        }) as Box<dyn FnMut()>));

        if let Some(cb) = callback.borrow().as_ref() {
            self.window.request_animation_frame(cb.as_ref().unchecked_ref())?;
        }

        // The closure lives for the rest of the page
        std::mem::forget(callback);
        Ok(())
    }
}
