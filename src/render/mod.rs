pub mod context;
pub mod debug;
pub mod framebuffer;
pub mod mesh;
pub mod pipeline;
pub mod primitives;
pub mod shader;
pub mod shadow;
pub mod text;
pub mod texture;
pub mod uniforms;
pub mod vertex;

pub use context::{Depth, RenderContext};
pub use debug::DebugRenderer;
pub use framebuffer::{FrameBuffer, FrameBufferKind};
pub use mesh::Mesh;
pub use pipeline::{ForwardPipeline, FrameInputs};
pub use shader::{Shader, ShaderError};
pub use shadow::{ShadowArrays, ShadowBuffer, ShadowError, ShadowRegistry};
pub use text::{TextEntry, TextError, TextRenderer};
pub use texture::Texture;
