use std::env;

use crate::services::aggregate::{DEFAULT_TOP_TIMES, DEFAULT_TREND_WINDOW};
use crate::services::insights::AnalyticsSettings;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    /// Shared HS256 secret of the identity provider that issues access tokens.
    pub jwt_secret: String,

    // Analytics
    pub trend_window_days: usize,
    pub top_times_limit: usize,
    pub record_fetch_limit: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),

            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),

            trend_window_days: positive(env::var("TREND_WINDOW_DAYS").ok())
                .unwrap_or(DEFAULT_TREND_WINDOW),
            top_times_limit: env::var("TOP_TIMES_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TOP_TIMES),
            record_fetch_limit: positive(env::var("RECORD_FETCH_LIMIT").ok()).unwrap_or(5000),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn analytics(&self) -> AnalyticsSettings {
        AnalyticsSettings {
            trend_window: self.trend_window_days,
            top_times_limit: self.top_times_limit,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/synchrolog_test".into(),
        host: "127.0.0.1".into(),
        port: 8080,
        frontend_url: "http://localhost:3000".into(),
        jwt_secret: "test-secret".into(),
        trend_window_days: DEFAULT_TREND_WINDOW,
        top_times_limit: DEFAULT_TOP_TIMES,
        record_fetch_limit: 5000,
    }
}

/// Parses an optional env value, discarding anything that is not a positive number.
fn positive<T>(raw: Option<String>) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    raw.and_then(|v| v.trim().parse().ok())
        .filter(|v: &T| *v > T::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_rejects_zero_negative_and_garbage() {
        assert_eq!(positive::<i64>(Some("250".into())), Some(250));
        assert_eq!(positive::<i64>(Some("-5".into())), None);
        assert_eq!(positive::<i64>(Some("0".into())), None);
        assert_eq!(positive::<i64>(Some("lots".into())), None);
        assert_eq!(positive::<usize>(None), None);
        assert_eq!(positive::<i64>(Some("-5".into())).unwrap_or(5000), 5000);
    }

    #[test]
    fn test_listen_addr() {
        assert_eq!(test_config().listen_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_analytics_settings_follow_config() {
        let mut config = test_config();
        config.trend_window_days = 14;
        config.top_times_limit = 3;
        let settings = config.analytics();
        assert_eq!(settings.trend_window, 14);
        assert_eq!(settings.top_times_limit, 3);
    }
}
