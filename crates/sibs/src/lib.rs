//! Top-level facade crate for sibs.
//!
//! Re-exports the wire contract and the terminal runtime so users can depend on a single crate.

pub mod core {
    pub use sibs_core::*;
}

pub mod terminal {
    pub use sibs_terminal::*;
}
