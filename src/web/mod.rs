pub mod server;
pub mod api;
pub mod state;

pub use server::start_dashboard_server;
pub use state::AppState;
