use chrono::NaiveDate;

/// Engine configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | PRICING_OPEN_VALID_FROM | 2000-01-01 | Lower bound for rules without valid_from |
/// | PRICING_OPEN_VALID_UPTO | 2500-12-31 | Upper bound for rules without valid_upto |
/// | PRICING_DEFAULT_PRIORITY | 1 | Priority assumed when stacking rules without one |
/// | PRICING_LOG_LEVEL | info | Log level (overridden by RUST_LOG) |
/// | PRICING_LOG_JSON | false | Emit JSON log lines |
///
/// # Example
///
/// ```ignore
/// PRICING_LOG_LEVEL=debug PRICING_DEFAULT_PRIORITY=5 ./host-app
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub open_valid_from: NaiveDate,
    pub open_valid_upto: NaiveDate,
    pub default_priority: i32,
    pub log_level: String,
    pub log_json: bool,
}

const DATE_FORMAT: &str = "%Y-%m-%d";

fn default_valid_from() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn default_valid_upto() -> NaiveDate {
    NaiveDate::from_ymd_opt(2500, 12, 31).unwrap_or(NaiveDate::MAX)
}

fn env_date(key: &str) -> Option<NaiveDate> {
    std::env::var(key)
        .ok()
        .and_then(|v| NaiveDate::parse_from_str(v.trim(), DATE_FORMAT).ok())
}

impl EngineConfig {
    /// Load configuration from the environment
    ///
    /// Unset or unparsable variables fall back to defaults.
    pub fn from_env() -> Self {
        Self {
            open_valid_from: env_date("PRICING_OPEN_VALID_FROM").unwrap_or_else(default_valid_from),
            open_valid_upto: env_date("PRICING_OPEN_VALID_UPTO").unwrap_or_else(default_valid_upto),
            default_priority: std::env::var("PRICING_DEFAULT_PRIORITY")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1),
            log_level: std::env::var("PRICING_LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("PRICING_LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }

    /// Override the open-ended validity bounds
    ///
    /// Mostly used by tests
    pub fn with_overrides(open_valid_from: NaiveDate, open_valid_upto: NaiveDate) -> Self {
        let mut config = Self::from_env();
        config.open_valid_from = open_valid_from;
        config.open_valid_upto = open_valid_upto;
        config
    }

    /// Whether `date` falls inside the rule window, open bounds included
    pub fn within_validity(
        &self,
        date: NaiveDate,
        valid_from: Option<NaiveDate>,
        valid_upto: Option<NaiveDate>,
    ) -> bool {
        let from = valid_from.unwrap_or(self.open_valid_from);
        let upto = valid_upto.unwrap_or(self.open_valid_upto);
        from <= date && date <= upto
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
