mod proxy;
mod session;

pub use proxy::forward;
pub use session::{current_session, logout};
