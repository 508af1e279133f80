pub mod acquisition;
pub mod errors;
pub mod model;
pub mod observation;
pub mod space;

pub use acquisition::*;
pub use errors::*;
pub use model::*;
pub use observation::*;
pub use space::*;
