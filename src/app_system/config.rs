use std::env;
use std::str::FromStr;
use std::time::Duration;
use dotenvy::dotenv;
use crate::domain::TransitionPolicy;
use super::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Mailbox size for every actor and the query cache.
    pub actor_buffer_size: usize,
    pub poll_interval: Duration,
    /// Pointer travel, in pixels, before a press becomes a drag.
    pub drag_activation_distance: f64,
    pub transition_policy: TransitionPolicy,
    pub restaurant_id: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            actor_buffer_size: 32,
            poll_interval: Duration::from_secs(10),
            drag_activation_distance: 8.0,
            transition_policy: TransitionPolicy::Permissive,
            restaurant_id: "restaurant_1".to_string(),
        }
    }
}

impl AppConfig {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from any variable source; unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();

        let actor_buffer_size = parse_var(&lookup, "ACTOR_BUFFER_SIZE", defaults.actor_buffer_size)?;
        if actor_buffer_size == 0 {
            return Err(AppError::Config("ACTOR_BUFFER_SIZE must be positive".to_string()));
        }
        let poll_secs = parse_var(&lookup, "BOARD_POLL_INTERVAL_SECS", defaults.poll_interval.as_secs())?;
        if poll_secs == 0 {
            return Err(AppError::Config("BOARD_POLL_INTERVAL_SECS must be positive".to_string()));
        }
        let drag_activation_distance =
            parse_var(&lookup, "DRAG_ACTIVATION_DISTANCE", defaults.drag_activation_distance)?;
        if !drag_activation_distance.is_finite() || drag_activation_distance < 0.0 {
            return Err(AppError::Config("DRAG_ACTIVATION_DISTANCE must be a non-negative number".to_string()));
        }
        let transition_policy = match lookup("ORDER_TRANSITION_POLICY") {
            Some(raw) => raw.parse::<TransitionPolicy>()
                .map_err(|e| AppError::Config(format!("Invalid ORDER_TRANSITION_POLICY: {}", e)))?,
            None => defaults.transition_policy,
        };
        let restaurant_id = lookup("RESTAURANT_ID")
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(defaults.restaurant_id);

        tracing::info!("Application configuration loaded successfully.");
        Ok(Self {
            actor_buffer_size,
            poll_interval: Duration::from_secs(poll_secs),
            drag_activation_distance,
            transition_policy,
            restaurant_id,
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse::<T>()
            .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e))),
        None => Ok(default),
    }
}
