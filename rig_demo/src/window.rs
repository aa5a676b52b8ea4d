//! GLFW window with a current OpenGL 3.3 core context

use glfw::Context;
use thiserror::Error;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("Failed to initialize GLFW: {0}")]
    InitializationFailed(String),

    /// The window or its context could not be created
    #[error("Failed to create window")]
    CreationFailed,
}

/// Window owning the GL context the renderer draws into
pub struct GlWindow {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl GlWindow {
    /// Open a window and make its context current on this thread
    pub fn new(width: u32, height: u32, title: &str, debug_context: bool) -> Result<Self, WindowError> {
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|e| WindowError::InitializationFailed(format!("{e:?}")))?;

        glfw.window_hint(glfw::WindowHint::ContextVersion(3, 3));
        glfw.window_hint(glfw::WindowHint::OpenGlProfile(glfw::OpenGlProfileHint::Core));
        glfw.window_hint(glfw::WindowHint::OpenGlForwardCompat(true));
        glfw.window_hint(glfw::WindowHint::OpenGlDebugContext(debug_context));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.make_current();
        window.set_key_polling(true);
        window.set_framebuffer_size_polling(true);
        glfw.set_swap_interval(glfw::SwapInterval::Sync(1));

        log::info!("Created {}x{} window '{}'", width, height, title);
        Ok(Self { glfw, window, events })
    }

    /// Load the GL entry points of the current context
    #[allow(unsafe_code)]
    pub fn load_gl(&mut self) -> glow::Context {
        // SAFETY: the context was made current in `new` and stays current on this thread
        unsafe { glow::Context::from_loader_function(|name| self.window.get_proc_address(name) as *const _) }
    }

    /// Whether the user asked to close the window
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Present the back buffer
    pub fn swap_buffers(&mut self) {
        self.window.swap_buffers();
    }

    /// Pump the event queue; Escape closes the window
    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
        for (_, event) in glfw::flush_messages(&self.events) {
            match event {
                glfw::WindowEvent::Key(glfw::Key::Escape, _, glfw::Action::Press, _) => {
                    self.window.set_should_close(true);
                }
                glfw::WindowEvent::FramebufferSize(width, height) => {
                    log::debug!("Framebuffer resized to {}x{}", width, height);
                }
                _ => {}
            }
        }
    }
}
