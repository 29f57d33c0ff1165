use std::env;
use std::fmt;
use std::str::FromStr;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const PORT: &str = "PORT";
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const AUTH_NONCE_TTL_SECS: &str = "AUTH_NONCE_TTL_SECS";
    pub const AUTH_MAX_CLOCK_SKEW_SECS: &str = "AUTH_MAX_CLOCK_SKEW_SECS";
    // Transaction confirmation ("trust" or "whatsonchain")
    pub const TX_CONFIRMER: &str = "TX_CONFIRMER";
    pub const WOC_API_URL: &str = "WOC_API_URL";
    pub const WOC_NETWORK: &str = "WOC_NETWORK";
    pub const MIN_CONFIRMATIONS: &str = "MIN_CONFIRMATIONS";
    // Seeding
    pub const SEED_ON_START: &str = "SEED_ON_START";
    pub const SEED_ARTICLES_PATH: &str = "SEED_ARTICLES_PATH";
    pub const DISABLE_CORS: &str = "DISABLE_CORS";
}

/// Default values
pub mod defaults {
    pub const PORT: u16 = 3001;
    pub const DATABASE_URL: &str = "./.db/paywall.db";
    pub const AUTH_NONCE_TTL_SECS: u64 = 300;
    pub const AUTH_MAX_CLOCK_SKEW_SECS: i64 = 300;
    pub const WOC_API_URL: &str = "https://api.whatsonchain.com/v1/bsv";
    pub const WOC_NETWORK: &str = "main";
    pub const MIN_CONFIRMATIONS: u64 = 0;
}

/// Which transaction confirmation strategy the purchase verifier uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmerKind {
    /// Accept claimed transactions without looking at the chain.
    Trust,
    /// Look the transaction up through the WhatsOnChain API.
    WhatsOnChain,
}

impl FromStr for ConfirmerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trust" | "none" => Ok(Self::Trust),
            "whatsonchain" | "woc" => Ok(Self::WhatsOnChain),
            other => Err(format!(
                "Unknown TX_CONFIRMER '{}'. Use 'trust' or 'whatsonchain'.",
                other
            )),
        }
    }
}

impl fmt::Display for ConfirmerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trust => write!(f, "trust"),
            Self::WhatsOnChain => write!(f, "whatsonchain"),
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false)
}

/// Parse an env var, falling back to the default (with a warning) when it is malformed.
fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid value '{}' for {}", raw, name);
            default
        }),
        Err(_) => default,
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub auth_nonce_ttl_secs: u64,
    pub auth_max_clock_skew_secs: i64,
    pub tx_confirmer: ConfirmerKind,
    pub woc_api_url: String,
    pub woc_network: String,
    pub min_confirmations: u64,
    pub seed_on_start: bool,
    pub seed_articles_path: Option<String>,
    pub disable_cors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: defaults::PORT,
            database_url: defaults::DATABASE_URL.to_string(),
            auth_nonce_ttl_secs: defaults::AUTH_NONCE_TTL_SECS,
            auth_max_clock_skew_secs: defaults::AUTH_MAX_CLOCK_SKEW_SECS,
            tx_confirmer: ConfirmerKind::Trust,
            woc_api_url: defaults::WOC_API_URL.to_string(),
            woc_network: defaults::WOC_NETWORK.to_string(),
            min_confirmations: defaults::MIN_CONFIRMATIONS,
            seed_on_start: false,
            seed_articles_path: None,
            disable_cors: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let tx_confirmer = env::var(env_vars::TX_CONFIRMER)
            .ok()
            .and_then(|raw| {
                raw.parse()
                    .map_err(|e: String| log::warn!("{}", e))
                    .ok()
            })
            .unwrap_or(ConfirmerKind::Trust);

        Self {
            port: env_parse(env_vars::PORT, defaults::PORT),
            database_url: env::var(env_vars::DATABASE_URL)
                .unwrap_or_else(|_| defaults::DATABASE_URL.to_string()),
            auth_nonce_ttl_secs: env_parse(
                env_vars::AUTH_NONCE_TTL_SECS,
                defaults::AUTH_NONCE_TTL_SECS,
            ),
            auth_max_clock_skew_secs: env_parse(
                env_vars::AUTH_MAX_CLOCK_SKEW_SECS,
                defaults::AUTH_MAX_CLOCK_SKEW_SECS,
            ),
            tx_confirmer,
            woc_api_url: env::var(env_vars::WOC_API_URL)
                .unwrap_or_else(|_| defaults::WOC_API_URL.to_string()),
            woc_network: env::var(env_vars::WOC_NETWORK)
                .unwrap_or_else(|_| defaults::WOC_NETWORK.to_string()),
            min_confirmations: env_parse(env_vars::MIN_CONFIRMATIONS, defaults::MIN_CONFIRMATIONS),
            seed_on_start: env_flag(env_vars::SEED_ON_START),
            seed_articles_path: env::var(env_vars::SEED_ARTICLES_PATH)
                .ok()
                .filter(|p| !p.trim().is_empty()),
            disable_cors: env_flag(env_vars::DISABLE_CORS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmer_kind_parsing() {
        assert_eq!("trust".parse::<ConfirmerKind>().unwrap(), ConfirmerKind::Trust);
        assert_eq!("WhatsOnChain".parse::<ConfirmerKind>().unwrap(), ConfirmerKind::WhatsOnChain);
        assert_eq!("woc".parse::<ConfirmerKind>().unwrap(), ConfirmerKind::WhatsOnChain);
        assert!("chainz".parse::<ConfirmerKind>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.tx_confirmer, ConfirmerKind::Trust);
        assert!(config.seed_articles_path.is_none());
    }
}
