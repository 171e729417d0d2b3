use std::borrow::Cow;
use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Compiled WGSL module. Vertex and fragment entry points live in one
/// source file; validation failures surface through the device error
/// scope and are fatal.
pub struct Shader {
    pub module: wgpu::ShaderModule,
}

impl Shader {
    pub fn from_path(device: &wgpu::Device, path: impl AsRef<Path>) -> Result<Self, ShaderError> {
        let path = path.as_ref();
        log::info!("Loading shader: {:?}", path);
        let source = std::fs::read_to_string(path)?;
        Ok(Self::from_source(device, path.to_str(), &source))
    }

    pub fn from_source(device: &wgpu::Device, label: Option<&str>, source: &str) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label,
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
        });
        Self { module }
    }
}
