//! Stable exit codes for bootstrap CLI commands.

use crate::core::types::FailureClass;

/// Command succeeded; for `launch`, the service itself exited cleanly.
pub const OK: i32 = 0;
/// Invalid usage, layout, config, or manifest (nothing was executed).
pub const INVALID: i32 = 1;
/// OS/runtime provisioning failed.
pub const PROVISION: i32 = 2;
/// Non-root identity could not be created.
pub const IDENTITY: i32 = 3;
/// A dependency manifest failed to resolve or install.
pub const DEPS: i32 = 4;
/// The client build failed or produced no artifact set.
pub const BUILD: i32 = 5;
/// The service failed to start or died during startup.
pub const LAUNCH: i32 = 6;

/// Exit code for a classified stage failure.
pub fn for_class(class: FailureClass) -> i32 {
    match class {
        FailureClass::Provisioning => PROVISION,
        FailureClass::Identity => IDENTITY,
        FailureClass::DependencyResolution => DEPS,
        FailureClass::Build => BUILD,
        FailureClass::Launch => LAUNCH,
    }
}
