use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Hosted Supabase project (PostgREST + GoTrue).
    Supabase,
    /// In-process store seeded with a demo catalog; nothing is persisted.
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "supabase" => Some(StoreBackend::Supabase),
            "memory" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    pub service_role_key: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompetitionConfig {
    pub window_cache_seconds: u64,
    pub tutorial_answer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountdownConfig {
    pub tick_interval_ms: u64,
    pub max_stream_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub store_backend: StoreBackend,
    pub supabase: SupabaseConfig,
    pub jwt_secret: String,
    pub cookie_secure: bool,
    pub competition: CompetitionConfig,
    pub countdown: CountdownConfig,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up), then the crate-local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        // Determine environment (defaults to dev)
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());
        let is_prod = app_env == "prod";

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or_else(|_| "0.0.0.0:8081".to_string());

        let backend_name = settings
            .get_string("store.backend")
            .or_else(|_| env::var("STORE_BACKEND"))
            .unwrap_or_else(|_| "supabase".to_string());
        let store_backend = StoreBackend::parse(&backend_name).ok_or_else(|| {
            config::ConfigError::Message(format!("Unknown store backend: {}", backend_name))
        })?;

        let supabase_url = settings
            .get_string("supabase.url")
            .or_else(|_| env::var("SUPABASE_URL"))
            .or_else(|_| env::var("NEXT_PUBLIC_SUPABASE_URL"))
            .unwrap_or_default();
        let anon_key = settings
            .get_string("supabase.anon_key")
            .or_else(|_| env::var("SUPABASE_ANON_KEY"))
            .or_else(|_| env::var("NEXT_PUBLIC_SUPABASE_ANON_KEY"))
            .unwrap_or_default();
        let service_role_key = settings
            .get_string("supabase.service_role_key")
            .or_else(|_| env::var("SUPABASE_SERVICE_ROLE_KEY"))
            .unwrap_or_default();

        if store_backend == StoreBackend::Supabase
            && (supabase_url.is_empty() || anon_key.is_empty() || service_role_key.is_empty())
        {
            return Err(config::ConfigError::Message(
                "SUPABASE_URL, SUPABASE_ANON_KEY and SUPABASE_SERVICE_ROLE_KEY must be set \
                 for the supabase store backend"
                    .to_string(),
            ));
        }

        let jwt_secret = match settings
            .get_string("auth.jwt_secret")
            .or_else(|_| env::var("SUPABASE_JWT_SECRET"))
        {
            Ok(secret) => secret,
            Err(_) if is_prod => {
                return Err(config::ConfigError::Message(
                    "SUPABASE_JWT_SECRET must be set in production".to_string(),
                ))
            }
            Err(_) => {
                eprintln!("WARNING: Using default JWT secret (dev mode only!)");
                "dev-secret-only-for-local-testing".to_string()
            }
        };

        let cookie_secure = settings.get_bool("cookie.secure").unwrap_or(is_prod);

        let request_timeout_seconds =
            positive_u64(&settings, "http.request_timeout_seconds", None).unwrap_or(10);
        let window_cache_seconds = settings
            .get_int("competition.window_cache_seconds")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(30);
        let tutorial_answer = settings
            .get_string("competition.tutorial_answer")
            .or_else(|_| env::var("TUTORIAL_ANSWER"))
            .unwrap_or_else(|_| "arcane".to_string());

        let tick_interval_ms =
            positive_u64(&settings, "countdown.tick_interval_ms", Some("SSE_TICK_INTERVAL_MS"))
                .unwrap_or(1000);
        let max_stream_seconds = positive_u64(
            &settings,
            "countdown.max_stream_seconds",
            Some("SSE_MAX_STREAM_SECONDS"),
        )
        .unwrap_or(3600);

        Ok(Config {
            bind_addr,
            store_backend,
            supabase: SupabaseConfig {
                url: supabase_url.trim_end_matches('/').to_string(),
                anon_key,
                service_role_key,
                request_timeout_seconds,
            },
            jwt_secret,
            cookie_secure,
            competition: CompetitionConfig {
                window_cache_seconds,
                tutorial_answer,
            },
            countdown: CountdownConfig {
                tick_interval_ms,
                max_stream_seconds,
            },
        })
    }

    /// In-memory configuration used by tests and offline demos.
    pub fn in_memory(jwt_secret: &str) -> Self {
        Config {
            bind_addr: "127.0.0.1:0".to_string(),
            store_backend: StoreBackend::Memory,
            supabase: SupabaseConfig {
                url: String::new(),
                anon_key: String::new(),
                service_role_key: String::new(),
                request_timeout_seconds: 10,
            },
            jwt_secret: jwt_secret.to_string(),
            cookie_secure: false,
            competition: CompetitionConfig {
                window_cache_seconds: 0,
                tutorial_answer: "arcane".to_string(),
            },
            countdown: CountdownConfig {
                tick_interval_ms: 1000,
                max_stream_seconds: 3600,
            },
        }
    }
}

fn positive_u64(settings: &config::Config, key: &str, legacy_env: Option<&str>) -> Option<u64> {
    settings
        .get_int(key)
        .ok()
        .and_then(|v| u64::try_from(v).ok())
        .or_else(|| {
            legacy_env
                .and_then(|name| env::var(name).ok())
                .and_then(|v| v.parse::<u64>().ok())
        })
        .filter(|v| *v > 0)
}
