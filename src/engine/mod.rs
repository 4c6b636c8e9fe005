pub mod window;
pub mod requester;
pub mod session;

pub use window::WindowPolicy;
pub use requester::ForecastRequester;
pub use session::{ForecastSession, SessionSnapshot, SessionStatus};
