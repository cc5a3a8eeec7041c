pub mod config;
pub mod error;
pub mod plugin;

pub mod cpu {
    pub mod kernels;
    pub mod params;
    pub mod particle;
    pub mod pipeline;
    pub mod spawn;
    pub mod stages;
}

pub mod gpu {
    pub mod buffers;
    pub mod ffi;
}

pub use config::SimConfig;
pub use cpu::pipeline::{InstanceMesh, RenderView, SimStats, SphPipeline, VolumetricView};
pub use error::{SphError, SphResult};
pub use plugin::SphFluidPlugin;
