pub mod models;
pub mod services;
pub mod errors;
pub mod naming;
pub mod recorder;

pub use models::*;
pub use services::*;
pub use errors::*;
pub use naming::*;
pub use recorder::*;
