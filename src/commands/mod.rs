pub mod deleted;
pub mod status;
pub mod store;
pub mod watch;

pub use deleted::*;
pub use status::*;
pub use store::*;
pub use watch::*;
