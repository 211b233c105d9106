use onair_events::GatewayEndpoint;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Period of change-feed keep-alive pings in seconds (default: `30`).
    pub ws_heartbeat_secs: u64,
    /// Device gateways that receive every new timeline of their studio.
    pub gateway_endpoints: Vec<GatewayEndpoint>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            cors_origins: vec!["http://localhost:5173".into()],
            request_timeout_secs: 30,
            ws_heartbeat_secs: 30,
            gateway_endpoints: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `WS_HEARTBEAT_SECS`    | `30`                       |
    /// | `GATEWAY_ENDPOINTS`    | empty (`studio=url,...`)   |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("HOST").unwrap_or(defaults.host);

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.cors_origins);

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let ws_heartbeat_secs: u64 = std::env::var("WS_HEARTBEAT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("WS_HEARTBEAT_SECS must be a valid u64");

        let gateway_endpoints = std::env::var("GATEWAY_ENDPOINTS")
            .map(|raw| GatewayEndpoint::parse_list(&raw))
            .unwrap_or_default();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            ws_heartbeat_secs,
            gateway_endpoints,
        }
    }
}
