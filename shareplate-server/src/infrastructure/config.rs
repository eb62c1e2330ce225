use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
    Appwrite,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" => Ok(Self::Postgres),
            "appwrite" => Ok(Self::Appwrite),
            other => Err(anyhow::anyhow!("unknown STORE_BACKEND: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppwriteConfig {
    pub endpoint: String,
    pub project_id: String,
    pub api_key: String,
    pub database_id: String,
    pub bucket_id: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Collections {
    pub posts: String,
    pub donations: String,
    pub users: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub cors_origins: Vec<String>,
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub appwrite: Option<AppwriteConfig>,
    pub collections: Collections,
    pub media_dir: Option<PathBuf>,
    pub like_max_retries: u32,
    pub max_image_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| var(key).ok_or_else(|| anyhow::anyhow!("{} must be set", key));

        let host = or("HOST", "127.0.0.1");
        let port = or("PORT", "8080")
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid PORT: {}", e))?;
        let jwt_secret = required("JWT_SECRET")?;
        let jwt_ttl_hours = or("JWT_TTL_HOURS", "24")
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid JWT_TTL_HOURS: {}", e))?;
        let cors_origins = or("CORS_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let backend: StoreBackend = or("STORE_BACKEND", "memory").parse()?;

        let database_url = var("DATABASE_URL");
        if backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set for the postgres backend");
        }

        let appwrite = if backend == StoreBackend::Appwrite {
            Some(AppwriteConfig {
                endpoint: or("APPWRITE_ENDPOINT", "https://cloud.appwrite.io/v1"),
                project_id: required("APPWRITE_PROJECT_ID")?,
                api_key: required("APPWRITE_API_KEY")?,
                database_id: required("APPWRITE_DATABASE_ID")?,
                bucket_id: required("APPWRITE_BUCKET_ID")?,
                timeout_secs: or("APPWRITE_TIMEOUT_SECS", "10")
                    .parse()
                    .map_err(|e| anyhow::anyhow!("invalid APPWRITE_TIMEOUT_SECS: {}", e))?,
            })
        } else {
            None
        };

        let collections = Collections {
            posts: or("POSTS_COLLECTION", "posts"),
            donations: or("DONATIONS_COLLECTION", "donations"),
            users: or("USERS_COLLECTION", "users"),
        };

        let like_max_retries = or("LIKE_MAX_RETRIES", "5")
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid LIKE_MAX_RETRIES: {}", e))?;
        let max_image_bytes = or("MAX_IMAGE_BYTES", "5242880")
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid MAX_IMAGE_BYTES: {}", e))?;

        Ok(Self {
            host,
            port,
            jwt_secret,
            jwt_ttl_hours,
            cors_origins,
            backend,
            database_url,
            appwrite,
            collections,
            media_dir: var("MEDIA_DIR").map(PathBuf::from),
            like_max_retries,
            max_image_bytes,
        })
    }
}
