use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(s: &str) -> AppEnv {
        match s {
            "production" => AppEnv::Production,
            _ => AppEnv::Development,
        }
    }
}

/// Environment configuration. The signing secret and database URL are
/// required; everything else has a development-friendly default.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub app_env: AppEnv,
    pub base_domain: String,
    pub allowed_origins: Vec<String>,
    pub email_api_url: Option<String>,
    pub email_api_key: Option<String>,
    pub email_from: String,
    pub notify_email: Option<String>,
    pub breach_check_url: Option<String>,
    pub tenant_store_dir: PathBuf,
    pub dev_server_port: u16,
    pub use_httponly_cookies: bool,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set".to_string())?;

        let app_env = AppEnv::parse(&env::var("APP_ENV").unwrap_or_default());

        let base_domain = env::var("BASE_DOMAIN").unwrap_or_else(|_| "courtpass.dk".to_string());

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let email_api_url = env::var("EMAIL_API_URL").ok().filter(|s| !s.is_empty());
        let email_api_key = env::var("EMAIL_API_KEY").ok().filter(|s| !s.is_empty());
        let email_from = env::var("EMAIL_FROM")
            .unwrap_or_else(|_| "Courtpass <noreply@courtpass.dk>".to_string());
        let notify_email = env::var("NOTIFY_EMAIL").ok().filter(|s| !s.is_empty());

        let breach_check_url = env::var("BREACH_CHECK_URL").ok().filter(|s| !s.is_empty());

        let tenant_store_dir = env::var("TENANT_STORE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./tenants"));

        let dev_server_port = parse_port("DEV_SERVER_PORT", 5173)?;
        let port = parse_port("PORT", 3000)?;

        let use_httponly_cookies = env::var("USE_HTTPONLY_COOKIES")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            database_url,
            jwt_secret,
            app_env,
            base_domain,
            allowed_origins,
            email_api_url,
            email_api_key,
            email_from,
            notify_email,
            breach_check_url,
            tenant_store_dir,
            dev_server_port,
            use_httponly_cookies,
            port,
        })
    }
}

fn parse_port(var: &str, default: u16) -> Result<u16, String> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map_err(|_| format!("{var} must be a port number")),
        Err(_) => Ok(default),
    }
}
