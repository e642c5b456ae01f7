//! Casement: a reactive virtual-tree UI framework core.
//!
//! This umbrella crate re-exports the pieces most applications need; the
//! subsystems live in `casement-core` (reactivity, reconciler, instances),
//! `casement-ssr` (render-to-string) and `casement-compiler` (the
//! `.ui`/`.uix` dialect transformer).

pub use casement_core::*;

#[cfg(feature = "ssr")]
pub mod ssr {
    pub use casement_ssr::*;
}

#[cfg(feature = "compiler")]
pub mod compiler {
    pub use casement_compiler::*;
}

pub mod prelude {
    pub use casement_core::prelude::*;
}
