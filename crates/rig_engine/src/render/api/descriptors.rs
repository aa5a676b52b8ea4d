//! Declarative descriptors for GPU resource creation
//!
//! Descriptors describe layout and format, never ownership. They are consumed
//! by the [`Renderer`](super::Renderer) factory methods.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::resources::{RenderBufferObject, Texture};

/// Role of a buffer object inside a buffer array object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferObjectType {
    /// Element indices; at most one per buffer array object
    Index,
    /// Per-vertex attribute data
    Vertex,
}

/// Scalar type of one buffer component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferComponentDataType {
    /// Signed 8-bit integer
    Int8,
    /// Unsigned 8-bit integer
    Uint8,
    /// Signed 16-bit integer
    Int16,
    /// Unsigned 16-bit integer
    Uint16,
    /// Signed 32-bit integer
    Int32,
    /// Unsigned 32-bit integer
    Uint32,
    /// 32-bit float
    Float32,
}

impl BufferComponentDataType {
    /// Size of one component in bytes
    pub const fn byte_width(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
        }
    }

    /// Whether attributes of this type go through the float attribute path
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32)
    }

    /// Whether this type is a legal element index type
    pub const fn is_index_type(self) -> bool {
        matches!(self, Self::Uint8 | Self::Uint16 | Self::Uint32)
    }
}

/// Storage hint for buffer uploads
///
/// Applied uniformly: every upload of a given buffer uses the same hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BufferUsage {
    /// Written rarely, drawn many times
    #[default]
    Static,
    /// Rewritten most frames
    Stream,
}

/// Layout of one attribute slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferDescriptor {
    /// Components per element (1-4)
    pub component_count: u32,
    /// Index or vertex role
    pub buffer_type: BufferObjectType,
    /// Scalar component type
    pub data_type: BufferComponentDataType,
    /// Vertex attribute location; ignored for index buffers
    pub attribute_index: u32,
}

impl BufferDescriptor {
    /// Create a descriptor
    pub const fn new(
        component_count: u32,
        buffer_type: BufferObjectType,
        data_type: BufferComponentDataType,
        attribute_index: u32,
    ) -> Self {
        Self {
            component_count,
            buffer_type,
            data_type,
            attribute_index,
        }
    }

    /// Single-component index buffer
    pub const fn index(data_type: BufferComponentDataType) -> Self {
        Self::new(1, BufferObjectType::Index, data_type, 0)
    }

    /// Vertex attribute buffer
    pub const fn vertex(component_count: u32, data_type: BufferComponentDataType, attribute_index: u32) -> Self {
        Self::new(component_count, BufferObjectType::Vertex, data_type, attribute_index)
    }

    /// Size of one element (all components) in bytes
    pub const fn element_byte_width(&self) -> usize {
        self.data_type.byte_width() * self.component_count as usize
    }

    /// Whether this slot holds indices
    pub fn is_index(&self) -> bool {
        self.buffer_type == BufferObjectType::Index
    }
}

/// Pixel format of textures and render buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Single 8-bit channel
    R8,
    /// Two 8-bit channels
    Rg8,
    /// Three 8-bit channels
    Rgb8,
    /// Four 8-bit channels
    Rgba8,
    /// Packed 24-bit depth + 8-bit stencil
    Depth24Stencil8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::R8 => 1,
            Self::Rg8 => 2,
            Self::Rgb8 => 3,
            Self::Rgba8 | Self::Depth24Stencil8 => 4,
        }
    }

    /// Pick the 8-bit colour format with `channels` channels
    pub const fn from_channel_count(channels: u8) -> Option<Self> {
        match channels {
            1 => Some(Self::R8),
            2 => Some(Self::Rg8),
            3 => Some(Self::Rgb8),
            4 => Some(Self::Rgba8),
            _ => None,
        }
    }
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureFilter {
    /// Nearest texel
    Nearest,
    /// Bilinear
    #[default]
    Linear,
}

/// Texture coordinate wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureWrap {
    /// Tile
    #[default]
    Repeat,
    /// Clamp to the border texel
    ClampToEdge,
}

/// Raw pixels plus declared format and dimensions
///
/// `data` may be `None` for textures that are only ever rendered into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDescriptor {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: PixelFormat,
    /// Tightly packed rows, bottom row first
    pub data: Option<Vec<u8>>,
    /// Minification/magnification filter
    pub filter: TextureFilter,
    /// Coordinate wrapping
    pub wrap: TextureWrap,
}

impl TextureDescriptor {
    /// Descriptor for a texture initialised from pixel data
    pub fn with_data(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            data: Some(data),
            filter: TextureFilter::default(),
            wrap: TextureWrap::default(),
        }
    }

    /// Descriptor for an uninitialised render target texture
    pub fn render_target(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            data: None,
            filter: TextureFilter::Linear,
            wrap: TextureWrap::ClampToEdge,
        }
    }

    /// Expected pixel data length in bytes
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// Framebuffer binding point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameBufferTarget {
    /// Read operations only
    Read,
    /// Draw operations only
    Draw,
    /// Both read and draw
    ReadDraw,
}

/// Framebuffer attachment point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentPoint {
    /// Colour attachment N
    Color(u8),
    /// Depth only
    Depth,
    /// Combined depth/stencil
    DepthStencil,
}

/// Image attached to a framebuffer
#[derive(Clone)]
pub enum FrameBufferAttachment {
    /// A texture (sampleable afterwards)
    Texture(Rc<dyn Texture>),
    /// A render buffer (not sampleable)
    RenderBuffer(Rc<dyn RenderBufferObject>),
}

/// Framebuffer layout
#[derive(Clone, Default)]
pub struct FrameBufferObjectDescriptor {
    /// Attachments in binding order
    pub attachments: Vec<(AttachmentPoint, FrameBufferAttachment)>,
}

impl FrameBufferObjectDescriptor {
    /// Add a texture attachment
    pub fn with_texture(mut self, point: AttachmentPoint, texture: Rc<dyn Texture>) -> Self {
        self.attachments.push((point, FrameBufferAttachment::Texture(texture)));
        self
    }

    /// Add a render buffer attachment
    pub fn with_render_buffer(mut self, point: AttachmentPoint, buffer: Rc<dyn RenderBufferObject>) -> Self {
        self.attachments.push((point, FrameBufferAttachment::RenderBuffer(buffer)));
        self
    }
}

/// Render buffer layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderBufferObjectDescriptor {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Storage format
    pub format: PixelFormat,
}
