//! Linked shader programs

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::api::{GlApi, NativeId, ShaderStage};
use super::handles::{OwnedHandle, ProgramHandle, ShaderHandle};
use crate::foundation::math::{flatten_matrices, Mat4};
use crate::render::api::GpuProgram;
use crate::render::ResourceError;

/// A program linked from up to three stages
#[derive(Debug)]
pub struct GlProgram {
    handle: OwnedHandle<ProgramHandle>,
    stages: Vec<ShaderStage>,
    locations: RefCell<HashMap<String, Option<u32>>>,
}

impl GlProgram {
    /// Compile every non-empty stage and link them
    ///
    /// Stage objects are deleted once the program is linked (or as soon as
    /// anything fails); compiler and linker logs are carried in the error.
    pub fn create(api: &Rc<dyn GlApi>, vert: &str, frag: &str, geom: &str) -> Result<Self, ResourceError> {
        let sources = [
            (ShaderStage::Vertex, vert),
            (ShaderStage::Fragment, frag),
            (ShaderStage::Geometry, geom),
        ];

        let mut shaders = Vec::new();
        for (stage, source) in sources {
            if source.trim().is_empty() {
                continue;
            }
            let shader = OwnedHandle::try_new(Rc::clone(api), ShaderHandle::create(api.as_ref(), stage))?;
            if !api.compile_shader(shader.id(), source) {
                return Err(ResourceError::ShaderCompilation {
                    stage: stage.name(),
                    log: api.shader_info_log(shader.id()),
                });
            }
            shaders.push(shader);
        }
        if shaders.is_empty() {
            return Err(ResourceError::InvalidDescriptor("program has no shader stages".to_owned()));
        }

        let program = OwnedHandle::try_new(Rc::clone(api), ProgramHandle::create(api.as_ref()))?;
        for shader in &shaders {
            api.attach_shader(program.id(), shader.id());
        }
        let linked = api.link_program(program.id());
        for shader in &shaders {
            api.detach_shader(program.id(), shader.id());
        }
        if !linked {
            return Err(ResourceError::ProgramLink(api.program_info_log(program.id())));
        }

        log::debug!("Linked program {} from {} stages", program.id(), shaders.len());
        Ok(Self {
            handle: program,
            stages: shaders.iter().map(|s| s.handle().stage()).collect(),
            locations: RefCell::new(HashMap::new()),
        })
    }

    /// Stages linked into this program
    pub fn stages(&self) -> &[ShaderStage] {
        &self.stages
    }

    /// Raw identifier
    pub fn id(&self) -> NativeId {
        self.handle.id()
    }

    fn location(&self, name: &str) -> Option<u32> {
        if let Some(cached) = self.locations.borrow().get(name) {
            return *cached;
        }
        let location = self.handle.api().uniform_location(self.handle.id(), name);
        self.locations.borrow_mut().insert(name.to_owned(), location);
        location
    }
}

impl GpuProgram for GlProgram {
    fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    fn bind(&self) {
        self.handle.bind();
    }

    fn set_mat4(&self, name: &str, matrices: &[Mat4]) -> bool {
        if !self.handle.is_valid() || matrices.is_empty() {
            return false;
        }
        let Some(location) = self.location(name) else {
            return false;
        };
        self.handle.bind();
        self.handle.api().uniform_matrix4(location, &flatten_matrices(matrices));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::gl::headless::{GlCall, HeadlessGl, ObjectKind};

    const VERT: &str = "uniform mat4 MVP; in vec3 position; void main() { gl_Position = MVP * vec4(position, 1.0); }";
    const FRAG: &str = "out vec4 color; void main() { color = vec4(1.0); }";

    fn headless() -> (Rc<HeadlessGl>, Rc<dyn GlApi>) {
        let gl = Rc::new(HeadlessGl::new());
        let api: Rc<dyn GlApi> = gl.clone();
        (gl, api)
    }

    #[test]
    fn test_empty_stages_are_skipped() {
        let (gl, api) = headless();
        let program = GlProgram::create(&api, VERT, FRAG, "").unwrap();
        assert!(program.is_valid());
        assert_eq!(program.stages(), &[ShaderStage::Vertex, ShaderStage::Fragment]);
        assert!(!gl
            .calls()
            .iter()
            .any(|c| matches!(c, GlCall::CreateShader(ShaderStage::Geometry, _))));

        // Stage objects do not outlive the link
        assert_eq!(gl.live_count(ObjectKind::Shader), 0);
        assert_eq!(gl.live_count(ObjectKind::Program), 1);
    }

    #[test]
    fn test_no_stages_is_rejected() {
        let (gl, api) = headless();
        let result = GlProgram::create(&api, "", "  ", "");
        assert!(matches!(result, Err(ResourceError::InvalidDescriptor(_))));
        assert_eq!(gl.allocation_count(ObjectKind::Program), 0);
    }

    #[test]
    fn test_compile_failure_reports_stage_and_cleans_up() {
        let (gl, api) = headless();
        let result = GlProgram::create(&api, VERT, "#error broken", "");
        match result {
            Err(ResourceError::ShaderCompilation { stage, log }) => {
                assert_eq!(stage, "fragment");
                assert!(!log.is_empty());
            }
            other => panic!("expected compile failure, got {other:?}"),
        }
        assert_eq!(gl.live_count(ObjectKind::Shader), 0);
        assert_eq!(gl.allocation_count(ObjectKind::Program), 0);
    }

    #[test]
    fn test_program_allocation_failure() {
        let (gl, api) = headless();
        gl.fail_next(ObjectKind::Program, 1);
        let result = GlProgram::create(&api, VERT, FRAG, "");
        assert!(matches!(result, Err(ResourceError::HandleCreation("program"))));
        assert_eq!(gl.live_count(ObjectKind::Shader), 0);
    }

    #[test]
    fn test_set_mat4_uploads_column_major() {
        let (gl, api) = headless();
        let program = GlProgram::create(&api, VERT, FRAG, "").unwrap();
        let mut mvp = Mat4::identity();
        mvp[(0, 3)] = 5.0;

        assert!(program.set_mat4("MVP", &[mvp]));
        assert!(!program.set_mat4("Bones", &[mvp]));

        let uploaded = gl.uniform(program.id(), "MVP").unwrap();
        assert_eq!(uploaded.len(), 16);
        // Translation lives in the fourth column
        assert_eq!(uploaded[12], 5.0);
        assert_eq!(gl.current_program(), program.id());
    }
}
