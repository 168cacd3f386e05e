use std::env;

use chrono::Duration;
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use shop_common::{
    helpers::{parse_boolean_flag, parse_or_default},
    Money,
    Secret,
};
use shop_engine::policy::ShopPolicy;

use crate::errors::ServerError;

const DEFAULT_SHOP_HOST: &str = "127.0.0.1";
const DEFAULT_SHOP_PORT: u16 = 8360;
const DEFAULT_CURRENCY: &str = "INR";
const DEFAULT_SESSION_HOURS: i64 = 24;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    pub gateway: GatewayConfig,
    /// Business constants handed to every engine API
    pub policy: ShopPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SHOP_HOST.to_string(),
            port: DEFAULT_SHOP_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            gateway: GatewayConfig::default(),
            policy: ShopPolicy::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SHOP_HOST").ok().unwrap_or_else(|| DEFAULT_SHOP_HOST.into());
        let port = parse_or_default(env::var("SHOP_PORT").ok(), DEFAULT_SHOP_PORT, |s, e| {
            error!("🪛️ {s} is not a valid port for SHOP_PORT. {e} Using the default, {DEFAULT_SHOP_PORT}, instead.")
        });
        let database_url = env::var("SHOP_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SHOP_DATABASE_URL is not set. Please set it to the URL for the shop database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("SHOP_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SHOP_USE_FORWARDED").ok(), false);
        let gateway = GatewayConfig::from_env_or_default();
        let policy = policy_from_env();
        Self { host, port, database_url, auth, use_x_forwarded_for, use_forwarded, gateway, policy }
    }
}

fn money_var(name: &str, default: Money) -> Money {
    parse_or_default(env::var(name).ok(), default, |s, e| {
        warn!("🪛️ Invalid configuration value for {name} ({s}). {e}. Using the default, {default}.")
    })
}

fn percent_var(name: &str, default: i64) -> i64 {
    let value = parse_or_default(env::var(name).ok(), default, |s, e| {
        warn!("🪛️ Invalid configuration value for {name} ({s}). {e}. Using the default, {default}.")
    });
    if (1..=100).contains(&value) {
        value
    } else {
        warn!("🪛️ {name} must be between 1 and 100. Using the default, {default}.");
        default
    }
}

/// Reads overrides for the engine's business constants. Anything that is not set keeps its default.
pub fn policy_from_env() -> ShopPolicy {
    let defaults = ShopPolicy::default();
    let policy = ShopPolicy {
        cod_ceiling: money_var("SHOP_COD_CEILING", defaults.cod_ceiling),
        welcome_bonus: money_var("SHOP_WELCOME_BONUS", defaults.welcome_bonus),
        referrer_bonus: money_var("SHOP_REFERRER_BONUS", defaults.referrer_bonus),
        referee_bonus: money_var("SHOP_REFEREE_BONUS", defaults.referee_bonus),
        max_offer_percent: percent_var("SHOP_MAX_OFFER_PERCENT", defaults.max_offer_percent),
        max_coupon_percent: percent_var("SHOP_MAX_COUPON_PERCENT", defaults.max_coupon_percent),
        ..defaults
    };
    debug!("🪛️ Shop policy: {policy:?}");
    policy
}

//-------------------------------------------------  GatewayConfig  ----------------------------------------------------
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Base URL of the payment gateway's REST API
    pub url: String,
    pub key_id: String,
    pub key_secret: Secret<String>,
    /// Shared secret the gateway uses to sign its payment status callbacks
    pub webhook_secret: Secret<String>,
    pub currency: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: "https://api.razorpay.com/v1".to_string(),
            key_id: String::default(),
            key_secret: Secret::default(),
            webhook_secret: Secret::default(),
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl GatewayConfig {
    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let url = env::var("SHOP_GATEWAY_URL").ok().unwrap_or_else(|| {
            info!("🪛️ SHOP_GATEWAY_URL is not set. Using {}", defaults.url);
            defaults.url.clone()
        });
        let key_id = env::var("SHOP_GATEWAY_KEY_ID").ok().unwrap_or_else(|| {
            warn!("🪛️ SHOP_GATEWAY_KEY_ID is not set. Gateway charges will be rejected by the gateway.");
            String::default()
        });
        let key_secret = Secret::new(env::var("SHOP_GATEWAY_KEY_SECRET").ok().unwrap_or_default());
        let webhook_secret = Secret::new(env::var("SHOP_GATEWAY_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ SHOP_GATEWAY_WEBHOOK_SECRET is not set. Payment status callbacks cannot be verified and will all \
                 be refused."
            );
            String::default()
        }));
        let currency = env::var("SHOP_CURRENCY").ok().unwrap_or_else(|| defaults.currency.clone());
        Self { url, key_id, key_secret, webhook_secret, currency }
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The shared secret used to sign and verify session tokens.
    pub session_secret: Secret<String>,
    /// Lifetime of the session tokens this server issues
    pub session_duration: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The session signing secret has not been set. I'm using a random value for this session. DO NOT \
             operate on production like this since every session will be invalidated on restart. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        Self { session_secret: Secret::new(secret), session_duration: Duration::hours(DEFAULT_SESSION_HOURS) }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self { session_secret: Secret::new(secret.into()), session_duration: Duration::hours(DEFAULT_SESSION_HOURS) }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret = env::var("SHOP_SESSION_SECRET")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [SHOP_SESSION_SECRET]")))?;
        if secret.len() < 16 {
            return Err(ServerError::ConfigurationError(
                "SHOP_SESSION_SECRET must be at least 16 characters long".to_string(),
            ));
        }
        let hours = parse_or_default(env::var("SHOP_SESSION_HOURS").ok(), DEFAULT_SESSION_HOURS, |s, e| {
            warn!("🪛️ {s} is not a valid value for SHOP_SESSION_HOURS. {e} Using {DEFAULT_SESSION_HOURS} hours.")
        });
        Ok(Self { session_duration: Duration::hours(hours.max(1)), ..Self::new(secret) })
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn random_session_secret() {
        let a = AuthConfig::default();
        let b = AuthConfig::default();
        assert_eq!(a.session_secret.reveal().len(), 48);
        assert_ne!(a.session_secret, b.session_secret);
    }

    #[test]
    fn options_from_config() {
        let mut config = ServerConfig::new("0.0.0.0", 9000);
        config.use_forwarded = true;
        let options = ServerOptions::from_config(&config);
        assert!(options.use_forwarded);
        assert!(!options.use_x_forwarded_for);
        assert_eq!(config.policy, ShopPolicy::default());
    }
}
