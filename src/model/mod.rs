pub mod artifact;
pub mod capsule;
pub mod config;
pub mod network;
pub mod routing;

pub use artifact::ModelArtifact;
pub use config::ModelConfig;
pub use network::{DgaNet, Label};
