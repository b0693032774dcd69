// Re-export all public modules so they can be used from main.rs
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
mod web {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{JsCast, JsValue};
    use web_sys::{Document, HtmlCanvasElement, KeyboardEvent, Window};

    use crate::config::SceneConfig;
    use crate::controller::input::wasm::keyboard_event_to_input;
    use crate::controller::{FrameLoopContext, InputRouter};
    use crate::error::{Error, Result};
    use crate::model::GlyphSequence;
    use crate::view::{FrameOutcome, GpuContext, RenderState};
    use crate::{logging, ui};

    pub async fn start() -> std::result::Result<(), JsValue> {
        logging::init();
        let (window, document, canvas) = init_canvas()?;
        setup_app(&window, &document, &canvas).await?;
        Ok(())
    }

    /// Main application setup for WASM
    async fn setup_app(window: &Window, document: &Document, canvas: &HtmlCanvasElement) -> Result<()> {
        let config = SceneConfig::default();
        let gpu = GpuContext::new(canvas, canvas.width(), canvas.height()).await?;

        let mut render_state = RenderState::new(gpu.device.as_ref(), gpu.queue.as_ref(), gpu.config.clone(), &config);
        let mut frame_ctx = FrameLoopContext::new(&config, gpu.config.width, gpu.config.height);
        setup_key_listener(document, frame_ctx.sequence.clone())?;

        let egui_ctx = egui::Context::default();
        let performance = window.performance().ok_or_else(|| Error::Dom("no performance timer".into()))?;
        let mut last_time = performance.now();

        tracing::info!(width = gpu.config.width, height = gpu.config.height, "glyphfall started");

        let window_for_loop = window.clone();
        let canvas = canvas.clone();
        let f = RcCellCallback::new(window.clone(), move || {
            let now = performance.now();
            let dt = ((now - last_time) / 1000.0) as f32;
            last_time = now;

            // Keep the canvas matched to the window
            let dpr = window_for_loop.device_pixel_ratio();
            let (css_w, css_h) = window_size(&window_for_loop);
            let (w, h) = ((css_w * dpr) as u32, (css_h * dpr) as u32);
            if w != render_state.width() || h != render_state.height() {
                canvas.set_width(w);
                canvas.set_height(h);
                render_state.resize(gpu.device.as_ref(), &gpu.surface, w, h);
            }

            let snapshot = frame_ctx.update(dt, gpu.device.as_ref(), gpu.queue.as_ref(), &mut render_state);

            // egui works in CSS pixels
            let raw_input = egui::RawInput {
                time: Some(now / 1000.0),
                screen_rect: Some(egui::Rect::from_min_size(
                    egui::Pos2::ZERO,
                    egui::vec2(render_state.width() as f32 / dpr as f32, render_state.height() as f32 / dpr as f32),
                )),
                ..Default::default()
            };
            egui_ctx.set_pixels_per_point(dpr as f32);
            let output = ui::build_ui(&egui_ctx, raw_input, &snapshot);
            let (ui_frame, _) = ui::into_frame(&egui_ctx, output);

            let result = render_state.draw_frame(gpu.device.as_ref(), gpu.queue.as_ref(), &gpu.surface, Some(ui_frame));
            match FrameOutcome::from_result(result) {
                FrameOutcome::Presented | FrameOutcome::Skip => true,
                FrameOutcome::Reconfigure => {
                    render_state.reconfigure(gpu.device.as_ref(), &gpu.surface);
                    true
                }
                FrameOutcome::Stop => false,
            }
        });
        f.start()
    }

    /// Route key presses into the glyph sequence
    fn setup_key_listener(document: &Document, sequence: Rc<RefCell<GlyphSequence>>) -> Result<()> {
        let router = InputRouter::default();
        let keydown = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            let Some(routed) = router.route(&keyboard_event_to_input(&e)) else {
                return;
            };
            if routed.prevent_default {
                e.prevent_default();
            }
            sequence.borrow_mut().apply(routed.command);
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document
            .add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())
            .map_err(dom_error)?;
        keydown.forget();
        Ok(())
    }

    /// Full-window canvas attached to the body
    fn init_canvas() -> Result<(Window, Document, HtmlCanvasElement)> {
        let window = web_sys::window().ok_or_else(|| Error::Dom("no global `window`".into()))?;
        let document = window.document().ok_or_else(|| Error::Dom("no document on window".into()))?;
        let body = document.body().ok_or_else(|| Error::Dom("no body on document".into()))?;
        let canvas = document
            .create_element("canvas")
            .map_err(dom_error)?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| Error::Dom("failed to create canvas".into()))?;

        let style = canvas.style();
        for (property, value) in [("display", "block"), ("width", "100vw"), ("height", "100vh")] {
            style.set_property(property, value).map_err(dom_error)?;
        }
        body.style().set_property("margin", "0").map_err(dom_error)?;

        let dpr = window.device_pixel_ratio();
        let (w, h) = window_size(&window);
        canvas.set_width((w * dpr) as u32);
        canvas.set_height((h * dpr) as u32);
        body.append_child(&canvas).map_err(dom_error)?;
        Ok((window, document, canvas))
    }

    fn window_size(window: &Window) -> (f64, f64) {
        let w = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0);
        let h = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0);
        (w, h)
    }

    fn dom_error(value: JsValue) -> Error {
        Error::Dom(value.as_string().unwrap_or_else(|| format!("{value:?}")))
    }

    /// requestAnimationFrame loop that owns its frame callback.
    /// The callback returns false to end the loop.
    struct RcCellCallback {
        inner: Rc<RefCell<Box<dyn FnMut() -> bool>>>,
        window: Window,
    }

    impl RcCellCallback {
        fn new(window: Window, f: impl FnMut() -> bool + 'static) -> Self {
            Self {
                inner: Rc::new(RefCell::new(Box::new(f))),
                window,
            }
        }

        fn start(self) -> Result<()> {
            let inner = self.inner.clone();
            let window = self.window.clone();

            let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
            let callback_clone = callback.clone();

            *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
                if !inner.borrow_mut().as_mut()() {
                    tracing::info!("frame loop stopped");
                    return;
                }

                // Schedule the next frame
                if let Some(cb) = callback_clone.borrow().as_ref() {
                    if let Err(e) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                        tracing::error!(error = ?e, "requestAnimationFrame failed, stopping");
                    }
                }
            }) as Box<dyn FnMut()>));

            if let Some(cb) = callback.borrow().as_ref() {
                self.window
                    .request_animation_frame(cb.as_ref().unchecked_ref())
                    .map_err(dom_error)?;
            }

            // Leak the closure to keep it alive
            std::mem::forget(callback);
            Ok(())
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub async fn start() -> Result<(), wasm_bindgen::JsValue> {
    web::start().await
}
