//! Host platform utility functions

use std::path::PathBuf;

/// Get the root directory of the arm software from the environment.
///
/// The `DEIMOS_ARM_SW_ROOT` environment variable shall point at the checkout
/// root, which contains the `params` and `sessions` directories.
pub fn get_deimos_arm_sw_root() -> Result<PathBuf, std::env::VarError> {
    let root = std::env::var("DEIMOS_ARM_SW_ROOT")?;
    Ok(PathBuf::from(root))
}
