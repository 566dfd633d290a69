use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub auth: AuthConfig,
    pub llm: LlmConfig,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_ttl_secs: i64,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub chat_model: String,
    pub title_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Outbound mail settings. Absent entirely in development; verification
/// links are logged instead of sent.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub verify_base_url: String,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    database: DatabaseSection,
    #[serde(default)]
    auth: AuthSection,
    #[serde(default)]
    llm: LlmSection,
    smtp: Option<SmtpConfig>,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DatabaseSection {
    #[serde(default = "default_database_path")]
    path: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthSection {
    #[serde(default)]
    jwt_secret: Option<String>,
    #[serde(default = "default_session_ttl")]
    session_ttl_secs: i64,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            session_ttl_secs: default_session_ttl(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LlmSection {
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default = "default_chat_model")]
    chat_model: String,
    #[serde(default = "default_title_model")]
    title_model: String,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
    #[serde(default = "default_temperature")]
    temperature: f32,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            chat_model: default_chat_model(),
            title_model: default_title_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_path() -> String {
    "codemate.db".to_string()
}

fn default_session_ttl() -> i64 {
    86_400
}

fn default_base_url() -> String {
    "https://api.together.xyz/v1".to_string()
}

fn default_chat_model() -> String {
    "meta-llama/Meta-Llama-3-8B-Instruct-Turbo".to_string()
}

fn default_title_model() -> String {
    "meta-llama/Llama-3-70b-chat-hf".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.3
}

impl ServerConfig {
    /// Load configuration from a TOML file when present, falling back to
    /// environment variables. Secrets (JWT signing key, provider API key)
    /// always come from the environment when the file omits them.
    pub fn load() -> anyhow::Result<Self> {
        let file_config = load_from_file()?.unwrap_or_default();

        let jwt_secret = file_config
            .auth
            .jwt_secret
            .or_else(|| env::var("CODEMATE_JWT_SECRET").ok())
            .ok_or_else(|| anyhow::anyhow!("CODEMATE_JWT_SECRET is not set"))?;
        let api_key = file_config
            .llm
            .api_key
            .or_else(|| env::var("CODEMATE_LLM_API_KEY").ok())
            .ok_or_else(|| anyhow::anyhow!("CODEMATE_LLM_API_KEY is not set"))?;

        Ok(Self {
            host: env::var("CODEMATE_HOST").unwrap_or(file_config.server.host),
            port: env::var("CODEMATE_PORT")
                .ok()
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(file_config.server.port),
            database_path: env::var("CODEMATE_DB_PATH").unwrap_or(file_config.database.path),
            auth: AuthConfig {
                jwt_secret,
                session_ttl_secs: file_config.auth.session_ttl_secs,
            },
            llm: LlmConfig {
                base_url: file_config.llm.base_url,
                api_key,
                chat_model: file_config.llm.chat_model,
                title_model: file_config.llm.title_model,
                max_tokens: file_config.llm.max_tokens,
                temperature: file_config.llm.temperature,
            },
            smtp: file_config.smtp,
        })
    }

    /// Fixed configuration for in-process test setups.
    pub fn for_tests(database_path: &str) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_path: database_path.to_string(),
            auth: AuthConfig {
                jwt_secret: "test-secret".to_string(),
                session_ttl_secs: default_session_ttl(),
            },
            llm: LlmConfig {
                base_url: default_base_url(),
                api_key: "test-key".to_string(),
                chat_model: "chat-model".to_string(),
                title_model: "title-model".to_string(),
                max_tokens: default_max_tokens(),
                temperature: default_temperature(),
            },
            smtp: None,
        }
    }
}

fn load_from_file() -> anyhow::Result<Option<FileConfig>> {
    let config_path = env::var("CODEMATE_CONFIG").ok();
    let path = if let Some(path) = config_path {
        Some(path)
    } else if Path::new("codemate.toml").exists() {
        Some("codemate.toml".to_string())
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(None);
    };

    let contents = fs::read_to_string(&path)
        .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path, err))?;
    let parsed: FileConfig = toml::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path, err))?;
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_provider() {
        let section = LlmSection::default();
        assert_eq!(section.base_url, "https://api.together.xyz/v1");
        assert_eq!(section.max_tokens, 1024);
        assert_eq!(section.temperature, 0.3);
    }

    #[test]
    fn test_parse_full_file() {
        let parsed: FileConfig = toml::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            path = "/tmp/chats.db"

            [auth]
            jwt_secret = "file-secret"

            [llm]
            api_key = "file-key"
            chat_model = "some/model"

            [smtp]
            host = "smtp.example.com"
            username = "mailer"
            password = "hunter2"
            from_address = "noreply@example.com"
            verify_base_url = "https://app.example.com/verify"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.server.port, 9000);
        assert_eq!(parsed.database.path, "/tmp/chats.db");
        assert_eq!(parsed.auth.jwt_secret.as_deref(), Some("file-secret"));
        assert_eq!(parsed.llm.chat_model, "some/model");
        assert_eq!(parsed.llm.title_model, default_title_model());
        assert!(parsed.smtp.is_some());
    }

    #[test]
    fn test_missing_sections_keep_session_ttl() {
        // The env-only path starts from FileConfig::default(), and a file
        // may omit [auth] entirely; the session TTL must survive both.
        assert_eq!(FileConfig::default().auth.session_ttl_secs, 86_400);

        let parsed: FileConfig = toml::from_str("").unwrap();
        assert_eq!(parsed.auth.session_ttl_secs, 86_400);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: FileConfig = toml::from_str("[server]\nport = 3001\n").unwrap();
        assert_eq!(parsed.server.host, default_host());
        assert_eq!(parsed.server.port, 3001);
        assert_eq!(parsed.auth.session_ttl_secs, 86_400);
    }
}
