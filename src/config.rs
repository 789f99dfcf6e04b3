use std::{
    fmt::{Display, Formatter},
    net::SocketAddr,
    path::{Path, PathBuf},
};

/// Runtime configuration for the gateway, read once at startup.
///
/// The defaults reproduce the development wiring: listen on port 3000,
/// serve assets from `public/`, and proxy everything under `/api/` to the
/// user-service on port 8080.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen: SocketAddr,
    pub static_dir: PathBuf,
    pub proxy: Vec<ProxyRule>,
    pub session: SessionConfig,
}

/// A path prefix and the upstream origin its requests are forwarded to.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct ProxyRule {
    pub prefix: String,
    pub upstream: String,
}

/// Paths of the proxied authentication flow the gateway watches to keep
/// the session store current.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub login_path: String,
    pub profile_path: String,
}

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, Error> {
        let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
        let mut config: Config = toml::from_str(&raw).map_err(Error::Parse)?;
        config.normalize();
        Ok(config)
    }

    /// The rule whose prefix matches `path`. The longest prefix wins.
    pub fn rule_for(&self, path: &str) -> Option<&ProxyRule> {
        self.proxy
            .iter()
            .filter(|rule| rule.matches(path))
            .max_by_key(|rule| rule.prefix.len())
    }

    fn normalize(&mut self) {
        for rule in &mut self.proxy {
            rule.normalize();
        }
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            listen: SocketAddr::from(([127, 0, 0, 1], 3000)),
            static_dir: PathBuf::from("public"),
            proxy: vec![ProxyRule {
                prefix: "/api/".to_string(),
                upstream: "http://localhost:8080".to_string(),
            }],
            session: SessionConfig::default(),
        }
    }
}

impl ProxyRule {
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    /// The upstream URL for a matched request, path and query preserved.
    pub fn target_for(&self, path_and_query: &str) -> String {
        format!("{}{}", self.upstream, path_and_query)
    }

    fn normalize(&mut self) {
        if !self.prefix.starts_with('/') {
            self.prefix.insert(0, '/');
        }
        if !self.prefix.ends_with('/') {
            self.prefix.push('/');
        }
        // Avoid a double slash when the path is appended
        while self.upstream.ends_with('/') {
            self.upstream.pop();
        }
    }
}

impl Default for SessionConfig {
    fn default() -> SessionConfig {
        SessionConfig {
            login_path: "/api/v1/users/login".to_string(),
            profile_path: "/api/v1/users/me".to_string(),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "failed to read config file: {}", err),
            Error::Parse(err) => write!(f, "failed to parse config file: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_proxy_api_to_user_service() {
        let config = Config::default();

        let rule = config.rule_for("/api/v1/users/login").expect("rule matches");
        assert_eq!(
            rule.target_for("/api/v1/users/login"),
            "http://localhost:8080/api/v1/users/login"
        );
    }

    #[test]
    fn paths_outside_the_prefix_have_no_rule() {
        let config = Config::default();

        assert!(config.rule_for("/session").is_none());
        assert!(config.rule_for("/index.html").is_none());
        // The bare prefix without a trailing segment does not match
        assert!(config.rule_for("/api").is_none());
    }

    #[test]
    fn longest_matching_prefix_wins() {
        let mut config = Config::default();
        config.proxy.push(ProxyRule {
            prefix: "/api/v1/videos/".to_string(),
            upstream: "http://localhost:8081".to_string(),
        });

        let rule = config.rule_for("/api/v1/videos/42").expect("rule matches");
        assert_eq!(rule.upstream, "http://localhost:8081");

        let rule = config.rule_for("/api/v1/users/me").expect("rule matches");
        assert_eq!(rule.upstream, "http://localhost:8080");
    }

    #[test]
    fn target_preserves_the_query_string() {
        let config = Config::default();

        let rule = config.rule_for("/api/v1/videos").expect("rule matches");
        assert_eq!(
            rule.target_for("/api/v1/videos?limit=10&offset=20"),
            "http://localhost:8080/api/v1/videos?limit=10&offset=20"
        );
    }

    #[test]
    fn normalize_repairs_prefix_and_upstream() {
        let mut rule = ProxyRule {
            prefix: "api".to_string(),
            upstream: "http://localhost:8080/".to_string(),
        };
        rule.normalize();

        assert_eq!(rule.prefix, "/api/");
        assert_eq!(rule.upstream, "http://localhost:8080");
        assert_eq!(rule.target_for("/api/v1/users/me"), "http://localhost:8080/api/v1/users/me");
    }

    #[test]
    fn parses_a_full_config_file() {
        let raw = r#"
            listen = "0.0.0.0:8000"
            static_dir = "dist"

            [[proxy]]
            prefix = "/api/"
            upstream = "http://user-service:8080"

            [session]
            login_path = "/api/v2/auth/login"
            profile_path = "/api/v2/auth/me"
        "#;

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(raw.as_bytes()).expect("write config");

        let config = Config::load(file.path()).expect("config loads");

        assert_eq!(config.listen, SocketAddr::from(([0, 0, 0, 0], 8000)));
        assert_eq!(config.static_dir, PathBuf::from("dist"));
        assert_eq!(config.proxy.len(), 1);
        assert_eq!(config.proxy[0].upstream, "http://user-service:8080");
        assert_eq!(config.session.login_path, "/api/v2/auth/login");
        assert_eq!(config.session.profile_path, "/api/v2/auth/me");
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: Config = toml::from_str(r#"listen = "127.0.0.1:4000""#).expect("parses");

        assert_eq!(config.listen, SocketAddr::from(([127, 0, 0, 1], 4000)));
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert_eq!(config.proxy.len(), 1);
        assert_eq!(config.session.login_path, "/api/v1/users/login");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");

        let err = Config::load(&dir.path().join("nope.toml")).expect_err("load fails");
        match err {
            Error::Io(err) => assert_eq!(err.kind(), std::io::ErrorKind::NotFound),
            Error::Parse(err) => panic!("expected an io error, got: {}", err),
        }
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"listen = [not toml").expect("write config");

        let err = Config::load(file.path()).expect_err("load fails");
        assert!(matches!(err, Error::Parse(_)));
    }
}
