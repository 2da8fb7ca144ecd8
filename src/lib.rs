pub use tabula_core::*;
