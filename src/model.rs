mod session;
mod user;

use tokio::sync::Mutex;

use crate::config::Config;

pub use session::Session;
pub use user::User;

pub struct AppState {
    pub config: Config,
    pub session: Mutex<Session>,
    pub client: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> AppState {
        // Upstream redirects are relayed to the browser, not followed here
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("client config is static");

        AppState {
            config,
            session: Mutex::new(Session::new()),
            client,
        }
    }
}
