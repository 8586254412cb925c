/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub filter: String,
    pub format: LogFormat,
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        let filter = std::env::var("YAML_LS_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "yaml_ls=info".to_string());

        let format = std::env::var("YAML_LS_LOG_FORMAT")
            .map(|value| LogFormat::parse(&value))
            .unwrap_or_default();

        Self { filter, format }
    }
}
