//! Meadow - walk a procedural meadow

use std::path::PathBuf;
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowId},
};

use meadow::agent::{Agent, PlaneBody};
use meadow::core::{camera::Camera, error::Error, input::InputState, logging, time::FrameTimer};
use meadow::frame::FramePipeline;
use meadow::render::context::GpuContext;
use meadow::scene::SceneConfig;
use meadow::terrain::TerrainHeightGenerator;
use meadow::vegetation::TickInputs;

struct RenderResources {
    generator: TerrainHeightGenerator,
    frame: FramePipeline,
}

struct App {
    window: Option<Arc<Window>>,
    gpu: Option<GpuContext>,
    resources: Option<RenderResources>,
    scene: SceneConfig,
    scene_path: Option<PathBuf>,
    camera: Camera,
    agent: Agent<PlaneBody, wgpu::Buffer>,
    input: InputState,
    timer: FrameTimer,
    cursor_grabbed: bool,
}

impl App {
    fn new(scene: SceneConfig, scene_path: Option<PathBuf>) -> Self {
        let capsule = scene.agent.capsule.clone();
        // No collision floor: with the height field bound the sampler grounds
        // the agent, without it the agent falls.
        let body = PlaneBody::new(scene.agent.spawn, capsule.feet_offset(), None);
        let agent = Agent::new(body, capsule, scene.agent.motion.clone(), scene.terrain.footprint);

        let mut camera = Camera::default();
        agent.look().apply(&mut camera, agent.eye());

        Self {
            window: None,
            gpu: None,
            resources: None,
            scene,
            scene_path,
            camera,
            agent,
            input: InputState::new(),
            timer: FrameTimer::new(),
            cursor_grabbed: false,
        }
    }

    fn toggle_cursor_grab(&mut self) {
        if let Some(window) = &self.window {
            self.cursor_grabbed = !self.cursor_grabbed;

            if self.cursor_grabbed {
                window.set_cursor_grab(CursorGrabMode::Confined)
                    .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked))
                    .ok();
                window.set_cursor_visible(false);
            } else {
                window.set_cursor_grab(CursorGrabMode::None).ok();
                window.set_cursor_visible(true);
            }

            self.input.set_mouse_captured(self.cursor_grabbed);
        }
    }

    /// Re-read the scene file and retune vegetation. Agent and terrain keep
    /// their current state.
    fn reload_scene(&mut self) {
        let Some(path) = &self.scene_path else {
            log::info!("No scene file to reload");
            return;
        };
        let scene = match SceneConfig::load(path) {
            Ok(scene) => scene,
            Err(e) => {
                log::error!("Failed to reload {}: {}", path.display(), e);
                return;
            }
        };
        if let (Some(gpu), Some(resources)) = (&self.gpu, &mut self.resources) {
            resources.frame.apply_scene(&gpu.device, &gpu.queue, &scene);
        }
        log::info!("Reloaded {}", path.display());
        self.scene = scene;
    }

    fn update(&mut self, dt: f32) {
        self.agent.look_mut().turn(self.input.mouse_delta());
        let input = self.input.agent_input();

        let (Some(gpu), Some(resources)) = (&self.gpu, &self.resources) else {
            return;
        };
        let source = resources
            .generator
            .height_field()
            .map(|field| field.source(&gpu.device, &gpu.queue));
        self.agent.tick(&input, dt, source.as_ref());
        self.agent.look().apply(&mut self.camera, self.agent.eye());
    }

    fn render(&mut self) {
        let (Some(gpu), Some(resources)) = (&mut self.gpu, &mut self.resources) else {
            return;
        };

        let output = match gpu.get_current_texture() {
            Ok(output) => output,
            Err(e) => {
                log::warn!("Surface unavailable ({}), reconfiguring", e);
                let (w, h) = gpu.size();
                gpu.resize(w, h);
                return;
            }
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let inputs = TickInputs {
            time: self.timer.elapsed_secs(),
            wind: self.scene.wind,
        };
        resources.frame.render(&gpu.device, &gpu.queue, &view, &self.camera, &inputs);
        output.present();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title("Meadow")
            .with_inner_size(PhysicalSize::new(1280, 720));

        let window = match event_loop
            .create_window(window_attrs)
            .map_err(|e| Error::Window(e.to_string()))
        {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("{}", e);
                event_loop.exit();
                return;
            }
        };

        let gpu = match pollster::block_on(GpuContext::new(window.clone())) {
            Ok(gpu) => gpu,
            Err(e) => {
                log::error!("Failed to create GPU context: {}", e);
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        self.camera.set_aspect(size.width as f32, size.height as f32);
        log::info!("Window created: {}x{}", size.width, size.height);

        let mut generator = TerrainHeightGenerator::new(&gpu.device, &self.scene.terrain.params());
        let field = generator.generate(&gpu.device, &gpu.queue, self.scene.terrain.resolution);

        let mut frame = FramePipeline::new(
            &gpu.device,
            &gpu.queue,
            gpu.format(),
            gpu.size(),
            &self.scene,
        );
        frame.set_height_field(Some(field));

        self.window = Some(window);
        self.resources = Some(RenderResources { generator, frame });
        self.gpu = Some(gpu);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.input.process_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if size.width > 0 && size.height > 0 {
                    if let Some(gpu) = &mut self.gpu {
                        gpu.resize(size.width, size.height);
                        self.camera.set_aspect(size.width as f32, size.height as f32);

                        if let Some(resources) = &mut self.resources {
                            resources.frame.resize(&gpu.device, size.width, size.height);
                        }
                    }
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state.is_pressed() {
                    match event.physical_key {
                        PhysicalKey::Code(KeyCode::Escape) => {
                            if self.cursor_grabbed {
                                self.toggle_cursor_grab();
                            } else {
                                event_loop.exit();
                            }
                        }
                        PhysicalKey::Code(KeyCode::Tab) => self.toggle_cursor_grab(),
                        PhysicalKey::Code(KeyCode::KeyR) => self.reload_scene(),
                        _ => {}
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if state.is_pressed() && button == winit::event::MouseButton::Left && !self.cursor_grabbed {
                    self.toggle_cursor_grab();
                }
            }
            WindowEvent::RedrawRequested => {
                self.timer.tick();
                let dt = self.timer.delta_secs();

                // Vegetation first, then the agent; the camera follows a
                // frame behind
                self.render();
                self.update(dt);

                if let Some(window) = &self.window {
                    let state = self.agent.controller().state();
                    window.set_title(&format!(
                        "Meadow - {:.1} FPS | {:?} | Tab=mouse, WASD=move, Space=jump, R=reload",
                        self.timer.fps(),
                        state
                    ));
                }

                self.input.end_frame();

                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.input.process_mouse_motion(delta);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() {
    logging::init();
    log::info!("Meadow starting...");

    let args: Vec<String> = std::env::args().collect();
    let scene_path = parse_scene_arg(&args);
    let scene = match &scene_path {
        Some(path) => match SceneConfig::load(path) {
            Ok(scene) => scene,
            Err(e) => {
                log::error!("Failed to load {}: {}. Using defaults", path.display(), e);
                SceneConfig::default()
            }
        },
        None => SceneConfig::default(),
    };

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {}", e);
            return;
        }
    };
    let mut app = App::new(scene, scene_path);

    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {}", e);
    }
}

/// Parse --scene argument from command line
fn parse_scene_arg(args: &[String]) -> Option<PathBuf> {
    for i in 0..args.len() {
        if args[i] == "--scene" || args[i] == "-s" {
            if let Some(path) = args.get(i + 1) {
                return Some(PathBuf::from(path));
            }
        }
    }
    None
}
