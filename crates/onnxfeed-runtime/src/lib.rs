pub mod error;
pub mod gate;
pub mod runner;
pub mod session;

pub use error::*;
pub use gate::*;
pub use runner::*;
pub use session::*;
