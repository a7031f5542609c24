//! External PDF toolchain adapter.

pub mod rendercv;
