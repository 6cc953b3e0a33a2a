use std::{env, net::SocketAddr, path::PathBuf};

use url::Url;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub media_root: PathBuf,
    /// Base URL this backend is reachable at; upload URLs are built on it.
    pub public_base_url: Url,
    /// Origin of the browser frontend, allowed through CORS.
    pub frontend_origin: String,
    pub cookie_secret: String,
    pub geo_api_url: Url,
    /// Empty key disables route preview and geocoding endpoints.
    pub geo_api_key: String,
    pub mail_api_url: Url,
    /// Empty key disables invite emails.
    pub mail_api_key: String,
    pub mail_from: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://flaira.db".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let media_root = env::var("MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("media"));

        let public_base_url = parse_url_var("PUBLIC_BASE_URL", "http://127.0.0.1:3000")?;
        let frontend_origin =
            env::var("FRONTEND_ORIGIN").unwrap_or_else(|_| "http://localhost:3001".to_string());

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-flaira-cookie-secret".to_string());

        let geo_api_url = parse_url_var("GEO_API_URL", "https://api.mapbox.com")?;
        let geo_api_key = env::var("GEO_API_KEY").unwrap_or_default();

        let mail_api_url = parse_url_var("MAIL_API_URL", "https://api.resend.com/emails")?;
        let mail_api_key = env::var("MAIL_API_KEY").unwrap_or_default();
        let mail_from =
            env::var("MAIL_FROM").unwrap_or_else(|_| "Flaira <trips@flaira.app>".to_string());

        Ok(Self {
            database_url,
            listen_addr,
            media_root,
            public_base_url,
            frontend_origin,
            cookie_secret,
            geo_api_url,
            geo_api_key,
            mail_api_url,
            mail_api_key,
            mail_from,
        })
    }
}

fn parse_url_var(name: &str, default: &str) -> Result<Url, AppError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|err| AppError::Config(format!("invalid {name}: {err}")))
}
