use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,
}

#[derive(Args, Debug, Clone)]
pub struct ServerConfig {
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    #[arg(long, env = "BIND_ADDRESS", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Origins allowed by CORS; `*` allows any origin
    #[arg(
        long = "cors-origin",
        env = "CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000"
    )]
    pub cors_origins: Vec<String>,

    /// Reported by `/api/test`
    #[arg(long, env = "APP_ENV", default_value = "development")]
    pub environment: String,
}

impl ServerConfig {
    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|origin| origin.trim() == "*")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            cors_origins: vec!["http://localhost:3000".to_string()],
            environment: "development".to_string(),
        }
    }
}
