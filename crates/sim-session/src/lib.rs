pub mod controller;
pub mod export;
pub mod session;

pub use controller::SessionController;
pub use export::ExportFormat;
pub use session::{Session, SessionState};
