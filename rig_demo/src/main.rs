//! Basic mesh demo
//!
//! Opens a window, draws a single triangle coloured by its position and
//! cycles the clear colour every frame. Escape closes the window.

mod window;

use std::rc::Rc;

use rig_engine::config::ConfigError;
use rig_engine::foundation::logging::{self, default_sink, DiagnosticSink, LogSeverity, LogSource};
use rig_engine::prelude::*;
use rig_engine::render::{log_debug_messages_and_flush, BufferComponentDataType};
use thiserror::Error;

use crate::window::{GlWindow, WindowError};

const WINDOW_TITLE: &str = "Window example application";
const WINDOW_WIDTH: u32 = 1280;
const WINDOW_HEIGHT: u32 = 720;

const VERTEX_SHADER: &str = r"#version 330

layout(location = 0) in vec3 pos;

smooth out vec3 posx;

void main(void)
{
    gl_Position = vec4(pos, 1.0);
    posx = pos;
}
";

const FRAGMENT_SHADER: &str = r"#version 330

smooth in vec3 posx;

out vec4 FragColor;

void main(void)
{
    FragColor = vec4(sin(posx.x), sin(posx.y), sin(posx.z), 1.0);
}
";

#[derive(Error, Debug)]
enum DemoError {
    #[error(transparent)]
    Window(#[from] WindowError),

    #[error("Renderer configuration rejected: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to create {0}")]
    Creation(&'static str),

    #[error(transparent)]
    Upload(#[from] ResourceError),
}

fn create_triangle(renderer: &dyn Renderer) -> Result<Box<dyn GpuBufferArrayObject>, DemoError> {
    let descriptors = [
        BufferDescriptor::index(BufferComponentDataType::Uint32),
        BufferDescriptor::vertex(3, BufferComponentDataType::Float32, 0),
    ];
    let mut triangle = renderer
        .create_buffer_array_object(&descriptors)
        .ok_or(DemoError::Creation("triangle buffers"))?;

    let indices: [u32; 3] = [0, 1, 2];
    let positions: [[f32; 3]; 3] = [[-1.0, 1.0, 0.0], [-1.0, -1.0, 0.0], [1.0, 1.0, 0.0]];
    triangle.update_slot(0, &indices)?;
    triangle.update_slot(1, &positions)?;
    Ok(triangle)
}

fn frame_color(frame: u32) -> [u8; 3] {
    let channel = |value: u32| u8::try_from(value % 255).unwrap_or(u8::MAX);
    [channel(frame), channel(frame / 2), channel(frame / 3)]
}

fn run() -> Result<(), DemoError> {
    let mut window = GlWindow::new(WINDOW_WIDTH, WINDOW_HEIGHT, WINDOW_TITLE, true)?;
    let api: Rc<dyn GlApi> = Rc::new(GlowApi::new(window.load_gl()));
    let sink = default_sink();
    let mut renderer = GlRenderer::new(api, RendererConfig::default().with_debug_output(true), Rc::clone(&sink))?;

    let program = renderer.create_program(VERTEX_SHADER, FRAGMENT_SHADER, "");
    match &program {
        Some(program) => program.bind(),
        None => sink.log(LogSource::Application, LogSeverity::Warn, "Failed to create program"),
    }
    if let Some(monitor) = renderer.debug_message_monitor() {
        log_debug_messages_and_flush(monitor, sink.as_ref());
    }

    let triangle = create_triangle(&renderer)?;

    let mut frame: u32 = 0;
    while !window.should_close() {
        renderer.set_clear_color(frame_color(frame));
        renderer.begin_frame();
        triangle.render(None);
        renderer.end_frame();
        frame = frame.wrapping_add(1);

        window.swap_buffers();
        window.poll_events();
    }

    log::info!("Rendered {} frames", frame);
    Ok(())
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}
