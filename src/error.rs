//! Error types for Celestial Canvas.
//!
//! The simulation core never fails: unknown names and out-of-range values
//! are soft-failed where they are used. Errors only come from the outer
//! surfaces (configuration files, GPU setup, the window event loop).

use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or write a configuration file.
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid JSON for the expected structure.
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
    /// No blueprint with the requested name exists in the catalog.
    #[error("unknown blueprint `{0}`")]
    UnknownBlueprint(String),
}

/// Errors that can occur during GPU initialization.
#[derive(Debug, Error)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found; a WebGPU/Vulkan/Metal/DX12 capable GPU is required")]
    NoAdapter,
    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
}

/// Errors that can occur when running the interactive canvas.
#[derive(Debug, Error)]
pub enum RunError {
    /// Failed to create or run the event loop.
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// The configuration or profile was rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// GPU initialization failed.
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::Invalid("width must be positive");
        assert_eq!(err.to_string(), "invalid configuration: width must be positive");

        let err = ConfigError::UnknownBlueprint("Nowhere".into());
        assert!(err.to_string().contains("Nowhere"));
    }

    #[test]
    fn test_json_error_converts() {
        let parse: Result<u32, _> = serde_json::from_str("not json");
        let err: ConfigError = parse.unwrap_err().into();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
