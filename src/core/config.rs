use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub swagger: SwaggerConfig,
    pub inference: InferenceConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_request_body_size: usize,
    pub environment: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

/// Model files and decision constants for the issue pipeline.
///
/// File names are resolved relative to `models_dir`. The second issue
/// detector is optional: without it the detector runs as a single model.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub models_dir: PathBuf,
    pub issue_models: Vec<String>,
    pub class_models: Vec<String>,
    pub garbage_segmentation_model: String,
    pub pothole_segmentation_model: String,
    pub issue_weights: Vec<f32>,
    pub class_weights: Vec<f32>,
    pub issue_threshold: f32,
    pub segment_score_threshold: f32,
}

/// Local directory where annotated images are written
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub image_dir: PathBuf,
    /// URL path under which `image_dir` is served (e.g. "/static/segmented")
    pub public_prefix: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
            inference: InferenceConfig::from_env()?,
            storage: StorageConfig::from_env()?,
        })
    }
}

impl AppConfig {
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 12 * 1024 * 1024; // 12MB
    const DEFAULT_PORT: u16 = 6969;

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|e| format!("Invalid PORT: {}", e))?,
            Err(_) => Self::DEFAULT_PORT,
        };

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = parse_list(
            &env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()),
        );

        let max_request_body_size = env::var("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_REQUEST_BODY_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_REQUEST_BODY_SIZE must be a valid number".to_string())?;

        // FLASK_ENV is accepted as a fallback for older deployment files
        let environment = env::var("APP_ENV")
            .or_else(|_| env::var("FLASK_ENV"))
            .unwrap_or_else(|_| "production".to_string());

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_request_body_size,
            environment,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

impl DatabaseConfig {
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MAX_CONNECTIONS must be a valid number".to_string())?;

        let min_connections = env::var("DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MIN_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MIN_CONNECTIONS must be a valid number".to_string())?;

        let acquire_timeout_secs = env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_ACQUIRE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_ACQUIRE_TIMEOUT_SECS must be a valid number".to_string())?;

        let idle_timeout_secs = env::var("DB_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_IDLE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_IDLE_TIMEOUT_SECS must be a valid number".to_string())?;

        let max_lifetime_secs = env::var("DB_MAX_LIFETIME_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_LIFETIME_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_MAX_LIFETIME_SECS must be a valid number".to_string())?;

        Ok(Self {
            url,
            max_connections,
            min_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
        })
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Civic Issue API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION").unwrap_or_else(|_| {
            "Garbage and pothole reports with ML triage and admin review".to_string()
        });

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl InferenceConfig {
    const DEFAULT_MODELS_DIR: &'static str = "models";
    const DEFAULT_ISSUE_MODELS: &'static str = "issue_detector1.onnx";
    const DEFAULT_CLASS_MODELS: &'static str = "gar_pot1.onnx,gar_pot2.onnx";
    const DEFAULT_GARBAGE_SEGMENTATION_MODEL: &'static str = "garbage_seg.onnx";
    const DEFAULT_POTHOLE_SEGMENTATION_MODEL: &'static str = "pothole_seg.onnx";
    const DEFAULT_ISSUE_WEIGHTS: &'static str = "0.5,0.5";
    const DEFAULT_CLASS_WEIGHTS: &'static str = "0.6,0.4";
    const DEFAULT_ISSUE_THRESHOLD: f32 = 0.5;
    const DEFAULT_SEGMENT_SCORE_THRESHOLD: f32 = 0.25;

    /// Ensembles combine at most this many members
    pub const MAX_ENSEMBLE_MEMBERS: usize = 2;

    pub fn from_env() -> Result<Self, String> {
        let models_dir = PathBuf::from(
            env::var("MODELS_DIR").unwrap_or_else(|_| Self::DEFAULT_MODELS_DIR.to_string()),
        );

        let issue_models = parse_list(
            &env::var("ISSUE_MODELS").unwrap_or_else(|_| Self::DEFAULT_ISSUE_MODELS.to_string()),
        );
        let class_models = parse_list(
            &env::var("CLASS_MODELS").unwrap_or_else(|_| Self::DEFAULT_CLASS_MODELS.to_string()),
        );

        let garbage_segmentation_model = env::var("GARBAGE_SEGMENTATION_MODEL")
            .unwrap_or_else(|_| Self::DEFAULT_GARBAGE_SEGMENTATION_MODEL.to_string());
        let pothole_segmentation_model = env::var("POTHOLE_SEGMENTATION_MODEL")
            .unwrap_or_else(|_| Self::DEFAULT_POTHOLE_SEGMENTATION_MODEL.to_string());

        let issue_weights = parse_weights(
            "ISSUE_ENSEMBLE_WEIGHTS",
            &env::var("ISSUE_ENSEMBLE_WEIGHTS")
                .unwrap_or_else(|_| Self::DEFAULT_ISSUE_WEIGHTS.to_string()),
        )?;
        let class_weights = parse_weights(
            "CLASS_ENSEMBLE_WEIGHTS",
            &env::var("CLASS_ENSEMBLE_WEIGHTS")
                .unwrap_or_else(|_| Self::DEFAULT_CLASS_WEIGHTS.to_string()),
        )?;

        let issue_threshold = parse_probability(
            "ISSUE_THRESHOLD",
            env::var("ISSUE_THRESHOLD").ok(),
            Self::DEFAULT_ISSUE_THRESHOLD,
        )?;
        let segment_score_threshold = parse_probability(
            "SEGMENT_SCORE_THRESHOLD",
            env::var("SEGMENT_SCORE_THRESHOLD").ok(),
            Self::DEFAULT_SEGMENT_SCORE_THRESHOLD,
        )?;

        let config = Self {
            models_dir,
            issue_models,
            class_models,
            garbage_segmentation_model,
            pothole_segmentation_model,
            issue_weights,
            class_weights,
            issue_threshold,
            segment_score_threshold,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        for (name, models) in [
            ("ISSUE_MODELS", &self.issue_models),
            ("CLASS_MODELS", &self.class_models),
        ] {
            if models.is_empty() || models.len() > Self::MAX_ENSEMBLE_MEMBERS {
                return Err(format!(
                    "{} must list between 1 and {} model files",
                    name,
                    Self::MAX_ENSEMBLE_MEMBERS
                ));
            }
        }
        if self.issue_weights.len() < self.issue_models.len() {
            return Err("ISSUE_ENSEMBLE_WEIGHTS needs one weight per issue model".to_string());
        }
        if self.class_weights.len() < self.class_models.len() {
            return Err("CLASS_ENSEMBLE_WEIGHTS needs one weight per class model".to_string());
        }
        Ok(())
    }

    /// Weights for the configured issue detectors, one per model
    pub fn issue_members(&self) -> Vec<(PathBuf, f32)> {
        self.members(&self.issue_models, &self.issue_weights)
    }

    /// Weights for the configured garbage/pothole classifiers, one per model
    pub fn class_members(&self) -> Vec<(PathBuf, f32)> {
        self.members(&self.class_models, &self.class_weights)
    }

    pub fn model_path(&self, file_name: &str) -> PathBuf {
        self.models_dir.join(file_name)
    }

    fn members(&self, files: &[String], weights: &[f32]) -> Vec<(PathBuf, f32)> {
        files
            .iter()
            .zip(weights.iter())
            .map(|(file, weight)| (self.model_path(file), *weight))
            .collect()
    }
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, String> {
        let image_dir = PathBuf::from(
            env::var("SEGMENTED_IMAGE_DIR").unwrap_or_else(|_| "data/segmented".to_string()),
        );
        let public_prefix = env::var("SEGMENTED_IMAGE_PUBLIC_PREFIX")
            .unwrap_or_else(|_| "/static/segmented".to_string());

        if !public_prefix.starts_with('/') {
            return Err("SEGMENTED_IMAGE_PUBLIC_PREFIX must start with '/'".to_string());
        }

        Ok(Self {
            image_dir,
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        })
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_weights(name: &str, raw: &str) -> Result<Vec<f32>, String> {
    let weights = parse_list(raw)
        .iter()
        .map(|w| w.parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| format!("{} must be a comma-separated list of numbers", name))?;

    if weights.is_empty() {
        return Err(format!("{} must not be empty", name));
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(format!("{} must only contain non-negative numbers", name));
    }
    if weights.iter().sum::<f32>() <= 0.0 {
        return Err(format!("{} must not sum to zero", name));
    }
    Ok(weights)
}

fn parse_probability(name: &str, raw: Option<String>, default: f32) -> Result<f32, String> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value = raw
        .parse::<f32>()
        .map_err(|_| format!("{} must be a valid number", name))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("{} must be between 0 and 1", name));
    }
    Ok(value)
}
