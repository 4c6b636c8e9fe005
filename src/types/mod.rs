pub mod horizon;
pub mod forecast;

pub use horizon::*;
pub use forecast::*;
