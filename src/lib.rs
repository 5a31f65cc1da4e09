//! Library exports for the distillation pipeline binaries and tests.
/// Reference energy-proxy formula (distillation target).
pub mod oracle;
/// Seeded synthetic dataset generation.
pub mod dataset;
/// Network definition, trainer, and metrics.
pub mod ml;
/// Artifact export (checkpoint, tensorpack, interchange JSON).
pub mod export;
/// Cross-format artifact verification.
pub mod verify;
/// Logging setup.
pub mod logging;
