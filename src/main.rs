use std::any::Any;
use std::env;
use std::fmt;
use std::fs;
use std::num::NonZeroU32;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use glutin::config::{Config, ConfigTemplateBuilder};
use glutin::context::{ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use log::{info, warn};
use raw_window_handle::HasRawWindowHandle;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, Event, KeyboardInput, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::{CursorGrabMode, Window, WindowBuilder};

use lightbox::lighting::{bind_material, upload_lamp, upload_lighting, upload_model};
use lightbox::{
    scene_summary, AppContext, GlBackend, InputEvent, InputQueue, KeyCode, Mesh, ProgramBinder,
    Renderer, Scene, ShaderProgram, Texture2D, VertexLayout, Viewport,
};

const WINDOW_WIDTH: u32 = 800;
const WINDOW_HEIGHT: u32 = 600;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;
    let scene = match &options.scene {
        Some(path) => {
            let xml = fs::read_to_string(path)
                .with_context(|| format!("failed to read scene {}", path.display()))?;
            Scene::from_xml(&xml).context("failed to parse scene XML")?
        }
        None => Scene::default(),
    };

    println!("{}", scene_summary(&scene));
    for position in &scene.cubes {
        println!(
            " - cube at ({:.2}, {:.2}, {:.2})",
            position.x, position.y, position.z
        );
    }

    if options.summary_only {
        return Ok(());
    }

    match run_interactive(&options, scene) {
        Err(err) if err.downcast_ref::<WindowInitError>().is_some() => {
            eprintln!(
                "{err}. Falling back to --summary-only mode (set DISPLAY or install GL drivers to enable rendering)."
            );
            Ok(())
        }
        result => result,
    }
}

fn run_interactive(options: &CliOptions, scene: Scene) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let mut event_loop =
        event_loop.map_err(|panic| WindowInitError::from_panic("event loop", panic))?;

    let window_builder = WindowBuilder::new()
        .with_title("lightbox")
        .with_inner_size(LogicalSize::new(WINDOW_WIDTH as f64, WINDOW_HEIGHT as f64));
    let template = ConfigTemplateBuilder::new().with_depth_size(24);
    let display_builder = DisplayBuilder::new().with_window_builder(Some(window_builder));

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let built = panic::catch_unwind(AssertUnwindSafe(|| {
        display_builder.build(&event_loop, template, pick_config)
    }));
    panic::set_hook(default_hook);
    let (window, gl_config) = built
        .map_err(|panic| WindowInitError::from_panic("display", panic))?
        .map_err(|err| WindowInitError::from_error("display", err))?;
    let window = window.ok_or_else(|| WindowInitError::from_error("window", "no window was created"))?;

    let (surface, context) = create_gl_context(&window, &gl_config)?;
    let gl_display = gl_config.display();
    let gl = Rc::new(unsafe {
        glow::Context::from_loader_function_cstr(|symbol| gl_display.get_proc_address(symbol))
    });

    if let Err(err) = window
        .set_cursor_grab(CursorGrabMode::Confined)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked))
    {
        warn!("unable to capture the cursor: {err}");
    }
    window.set_cursor_visible(false);

    let size = window.inner_size();
    let viewport = Viewport::new(size.width, size.height);
    gl.viewport(size.width as i32, size.height as i32);
    gl.enable_depth_test();

    let mut viewer = Viewer::new(Rc::clone(&gl), options, scene)?;
    let input = Arc::new(InputQueue::new());
    let start = Instant::now();
    let mut last_error = None;

    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        match event {
            Event::WindowEvent { event, window_id } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => control_flow.set_exit(),
                WindowEvent::Resized(size) => {
                    resize(&gl, &surface, &context, &viewport, size);
                }
                WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                    resize(&gl, &surface, &context, &viewport, *new_inner_size);
                }
                WindowEvent::KeyboardInput { input: key, .. } => {
                    if let Some(event) = map_keyboard(&key) {
                        input.push(event);
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    input.push(InputEvent::CursorMoved(Vec2::new(
                        position.x as f32,
                        position.y as f32,
                    )));
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    let yoffset = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y,
                        MouseScrollDelta::PixelDelta(position) => position.y as f32 / 20.0,
                    };
                    input.push(InputEvent::Scrolled(yoffset));
                }
                _ => {}
            },
            Event::RedrawRequested(window_id) if window_id == window.id() => {
                let now = start.elapsed().as_secs_f32();
                viewer.app.step(now, input.drain());
                if viewer.app.close_requested() {
                    control_flow.set_exit();
                    return;
                }
                viewer.draw(viewport.aspect());
                if let Err(err) = surface.swap_buffers(&context) {
                    last_error = Some(anyhow!("failed to swap buffers: {err}"));
                    control_flow.set_exit();
                }
            }
            Event::MainEventsCleared => window.request_redraw(),
            _ => {}
        }
    });

    if let Some(err) = last_error {
        return Err(err);
    }
    info!("window closed");
    Ok(())
}

// `DisplayBuilder::build` forwards the `find_configs` error (`BadConfig`)
// when nothing matches the template, so the picker only ever sees a
// non-empty set. A panic here is caught as a `WindowInitError`.
fn pick_config(configs: Box<dyn Iterator<Item = Config> + '_>) -> Config {
    configs
        .reduce(|best, config| {
            if config.num_samples() > best.num_samples() {
                config
            } else {
                best
            }
        })
        .expect("no GL configs offered")
}

fn create_gl_context(
    window: &Window,
    gl_config: &Config,
) -> Result<(Surface<WindowSurface>, PossiblyCurrentContext)> {
    let gl_display = gl_config.display();
    let context_attributes = ContextAttributesBuilder::new()
        .with_profile(GlProfile::Core)
        .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
        .build(Some(window.raw_window_handle()));
    let not_current = unsafe { gl_display.create_context(gl_config, &context_attributes) }
        .map_err(|err| WindowInitError::from_error("GL 3.3 context", err))?;

    let surface_attributes =
        window.build_surface_attributes(SurfaceAttributesBuilder::<WindowSurface>::new());
    let surface = unsafe { gl_display.create_window_surface(gl_config, &surface_attributes) }
        .map_err(|err| WindowInitError::from_error("window surface", err))?;
    let context = not_current
        .make_current(&surface)
        .map_err(|err| WindowInitError::from_error("GL context", err))?;
    Ok((surface, context))
}

fn resize(
    gl: &glow::Context,
    surface: &Surface<WindowSurface>,
    context: &PossiblyCurrentContext,
    viewport: &Viewport,
    size: PhysicalSize<u32>,
) {
    viewport.update(size.width, size.height);
    let (width, height) = viewport.size();
    if let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) {
        surface.resize(context, w, h);
    }
    gl.viewport(width as i32, height as i32);
}

fn map_keyboard(input: &KeyboardInput) -> Option<InputEvent> {
    use winit::event::VirtualKeyCode as Key;
    let key = match input.virtual_keycode? {
        Key::W => KeyCode::W,
        Key::A => KeyCode::A,
        Key::S => KeyCode::S,
        Key::D => KeyCode::D,
        Key::Escape => KeyCode::Escape,
        _ => return None,
    };
    Some(match input.state {
        ElementState::Pressed => InputEvent::KeyPressed(key),
        ElementState::Released => InputEvent::KeyReleased(key),
    })
}

/// GPU resources and frame state for the lit-cubes scene.
struct Viewer {
    binder: ProgramBinder<glow::Context>,
    renderer: Renderer<glow::Context>,
    lighting: ShaderProgram<glow::Context>,
    lamp: ShaderProgram<glow::Context>,
    cube: Mesh<glow::Context>,
    lamp_cube: Mesh<glow::Context>,
    diffuse: Texture2D<glow::Context>,
    specular: Texture2D<glow::Context>,
    scene: Scene,
    app: AppContext,
}

impl Viewer {
    fn new(gl: Rc<glow::Context>, options: &CliOptions, scene: Scene) -> Result<Self> {
        let mut renderer = Renderer::new(Rc::clone(&gl));
        if let Err(err) = renderer.setup_default_graphics() {
            warn!("default program unavailable: {err}");
        }

        let shaders = &options.shaders;
        let lighting = ShaderProgram::from_files(
            Rc::clone(&gl),
            shaders.join("lighting.vert"),
            shaders.join("multilight.frag"),
        );
        let lamp = ShaderProgram::from_files(
            Rc::clone(&gl),
            shaders.join("source.vert"),
            shaders.join("source.frag"),
        );

        let diffuse = load_texture(&gl, &options.assets.join("diffuse_map.png"), [200, 200, 200])?;
        let specular = load_texture(&gl, &options.assets.join("specular_map.png"), [255, 255, 255])?;

        let cube = Mesh::cube(Rc::clone(&gl), &VertexLayout::lit())?;
        let lamp_cube = Mesh::cube(Rc::clone(&gl), &VertexLayout::position_only())?;

        Ok(Self {
            binder: ProgramBinder::new(Rc::clone(&gl)),
            renderer,
            lighting,
            lamp,
            cube,
            lamp_cube,
            diffuse,
            specular,
            scene,
            app: AppContext::default(),
        })
    }

    fn draw(&mut self, aspect: f32) {
        self.renderer.clear(self.scene.background);
        let view_projection = self.app.view_projection(aspect);

        if let Ok(active) = self.lighting.begin(&mut self.binder) {
            upload_lighting(&active, &self.scene, &self.app.camera);
            bind_material(&active, &self.diffuse, &self.specular);
            for index in 0..self.scene.cubes.len() {
                if let Some(model) = self.scene.cube_model(index) {
                    upload_model(&active, &model, &view_projection);
                    self.cube.draw(&active);
                }
            }
            active.end();
        }

        if let Ok(active) = self.lamp.begin(&mut self.binder) {
            for index in 0..self.scene.point_lights.len() {
                if let Some(model) = self.scene.lamp_model(index) {
                    upload_lamp(&active, &(view_projection * model));
                    self.lamp_cube.draw(&active);
                }
            }
            active.end();
        }
    }
}

fn load_texture(gl: &Rc<glow::Context>, path: &Path, fallback: [u8; 3]) -> Result<Texture2D<glow::Context>> {
    match Texture2D::load(Rc::clone(gl), path) {
        Ok(texture) => Ok(texture),
        Err(err) => {
            warn!("{err}; using a solid texture instead");
            Texture2D::solid(Rc::clone(gl), fallback).context("failed to create fallback texture")
        }
    }
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

#[derive(Debug, PartialEq)]
struct CliOptions {
    scene: Option<PathBuf>,
    shaders: PathBuf,
    assets: PathBuf,
    summary_only: bool,
}

impl CliOptions {
    const USAGE: &'static str =
        "Usage: lightbox [--scene <file.xml>] [--shaders <dir>] [--assets <dir>] [--summary-only]";

    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Self {
            scene: None,
            shaders: PathBuf::from("shaders"),
            assets: PathBuf::from("assets"),
            summary_only: false,
        };
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary-only" => options.summary_only = true,
                "--scene" | "--shaders" | "--assets" => {
                    let value = args
                        .next()
                        .map(PathBuf::from)
                        .ok_or_else(|| anyhow!("{arg} expects a path. {}", Self::USAGE))?;
                    match arg.as_str() {
                        "--scene" => options.scene = Some(value),
                        "--shaders" => options.shaders = value,
                        _ => options.assets = value,
                    }
                }
                other => return Err(anyhow!("Unknown argument: {other}. {}", Self::USAGE)),
            }
        }
        Ok(options)
    }
}
