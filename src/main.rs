use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::ModifiersState;
use winit::window::{Window, WindowId};

// Import from the library crate
use glyphfall::config::SceneConfig;
use glyphfall::controller::input::native::key_event_to_input;
use glyphfall::controller::{FrameLoopContext, InputRouter};
use glyphfall::error::{Error, Result};
use glyphfall::view::{FrameOutcome, GpuContext, RenderState};
use glyphfall::{logging, ui};

/// Everything that exists once the window is up
struct AppState {
    window: Arc<Window>,
    gpu: GpuContext,
    render_state: RenderState,
    frame_ctx: FrameLoopContext,

    // egui
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,

    // Input handling
    router: InputRouter,
    modifiers: ModifiersState,

    // Frame timing
    last_frame_time: Instant,
}

impl AppState {
    fn new(window: Arc<Window>, config: &SceneConfig) -> Result<Self> {
        let gpu = pollster::block_on(GpuContext::new_native(window.clone()))?;
        let render_state = RenderState::new(gpu.device.as_ref(), gpu.queue.as_ref(), gpu.config.clone(), config);
        let frame_ctx = FrameLoopContext::new(config, gpu.config.width, gpu.config.height);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window.as_ref(),
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        tracing::info!(width = gpu.config.width, height = gpu.config.height, "glyphfall started");

        Ok(Self {
            window,
            gpu,
            render_state,
            frame_ctx,
            egui_ctx,
            egui_state,
            router: InputRouter::default(),
            modifiers: ModifiersState::empty(),
            last_frame_time: Instant::now(),
        })
    }

    /// Returns true when egui or the glyph router consumed the event
    fn input(&mut self, event: &WindowEvent) -> bool {
        // First let egui process the event
        if self.egui_state.on_window_event(self.window.as_ref(), event).consumed {
            return true;
        }

        match event {
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
                true
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let routed = key_event_to_input(event, self.modifiers).and_then(|input| self.router.route(&input));
                if let Some(routed) = routed {
                    self.frame_ctx.sequence.borrow_mut().apply(routed.command);
                }
                true
            }
            _ => false,
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.render_state.resize(self.gpu.device.as_ref(), &self.gpu.surface, width, height);
    }

    fn render(&mut self) -> std::result::Result<(), wgpu::SurfaceError> {
        let now = Instant::now();
        let dt = (now - self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;

        let snapshot = self.frame_ctx.update(dt, self.gpu.device.as_ref(), self.gpu.queue.as_ref(), &mut self.render_state);

        let raw_input = self.egui_state.take_egui_input(&self.window);
        let output = ui::build_ui(&self.egui_ctx, raw_input, &snapshot);
        let (ui_frame, platform_output) = ui::into_frame(&self.egui_ctx, output);
        self.egui_state.handle_platform_output(&self.window, platform_output);

        self.render_state
            .draw_frame(self.gpu.device.as_ref(), self.gpu.queue.as_ref(), &self.gpu.surface, Some(ui_frame))
    }
}

#[derive(Default)]
struct App {
    config: SceneConfig,
    state: Option<AppState>,
    error: Option<Error>,
}

impl App {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: Error) {
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title("glyphfall")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        match AppState::new(window, &self.config) {
            Ok(state) => self.state = Some(state),
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(app) = self.state.as_mut() else {
            return;
        };
        if window_id != app.window.id() || app.input(&event) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => app.resize(size.width, size.height),
            WindowEvent::RedrawRequested => match FrameOutcome::from_result(app.render()) {
                FrameOutcome::Presented | FrameOutcome::Skip => {}
                FrameOutcome::Reconfigure => {
                    app.render_state.reconfigure(app.gpu.device.as_ref(), &app.gpu.surface);
                }
                FrameOutcome::Stop => event_loop.exit(),
            },
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(app) = &self.state {
            app.window.request_redraw();
        }
    }
}

fn run() -> Result<()> {
    let event_loop = EventLoop::new()?;
    let mut app = App::default();
    event_loop.run_app(&mut app)?;
    app.error.map_or(Ok(()), Err)
}

fn main() {
    logging::init();

    if let Err(e) = run() {
        tracing::error!(error = %e, "glyphfall exited with an error");
        std::process::exit(1);
    }
}
