pub mod artifact;
pub mod backend;
pub mod error;
pub mod feed;
pub mod spec;
pub mod summary;
pub mod tensor;

pub use artifact::*;
pub use backend::*;
pub use error::*;
pub use feed::*;
pub use spec::*;
pub use summary::*;
pub use tensor::*;
