//! Runtime configuration
//!
//! Everything comes from the environment; the config is built once in main
//! and passed explicitly into each component. No globals.

const SPOT_URL: &str = "https://api.binance.com";
const SPOT_TESTNET_URL: &str = "https://testnet.binance.vision";
const FUTURES_URL: &str = "https://fapi.binance.com";
const FUTURES_TESTNET_URL: &str = "https://testnet.binancefuture.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub testnet: bool,
}

impl Config {
    /// Read configuration from environment variables.
    ///
    /// `BINANCE_API_KEY` / `BINANCE_SECRET` are optional; public commands
    /// work without them. `BINANCE_TESTNET=1` switches both base URLs.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("BINANCE_API_KEY").ok().filter(|s| !s.is_empty()),
            api_secret: std::env::var("BINANCE_SECRET").ok().filter(|s| !s.is_empty()),
            testnet: std::env::var("BINANCE_TESTNET").map(|v| v == "1").unwrap_or(false),
        }
    }

    pub fn spot_base_url(&self) -> &'static str {
        if self.testnet {
            SPOT_TESTNET_URL
        } else {
            SPOT_URL
        }
    }

    pub fn futures_base_url(&self) -> &'static str {
        if self.testnet {
            FUTURES_TESTNET_URL
        } else {
            FUTURES_URL
        }
    }
}
