use std::env;

use crate::error::AnalyticsError;
use crate::pass_network::NetworkConfig;
use crate::spatial::GridSpec;
use crate::xg_timeline::TimelineConfig;

pub const DEFAULT_OPEN_DATA_URL: &str =
    "https://raw.githubusercontent.com/statsbomb/open-data/master/data";
const DEFAULT_CACHE_CAPACITY: usize = 16;

/// Tunables for the aggregators and the data-source cache.
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    pub network: NetworkConfig,
    pub heatmap_grid: GridSpec,
    pub timeline: TimelineConfig,
    pub cache_capacity: usize,
    pub open_data_url: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            heatmap_grid: GridSpec::TOUCH,
            timeline: TimelineConfig::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            open_data_url: DEFAULT_OPEN_DATA_URL.to_string(),
        }
    }
}

impl AnalyticsConfig {
    /// Defaults overridden by `PITCHLENS_*` variables. Unparseable values fall
    /// back to the default; out-of-range ones are clamped.
    pub fn from_env() -> Result<Self, AnalyticsError> {
        let mut cfg = Self::default();

        if let Some(q) = env_parse::<f64>("PITCHLENS_EDGE_QUANTILE") {
            cfg.network.edge_quantile = q.clamp(0.0, 1.0);
        }
        let cols = env_parse::<usize>("PITCHLENS_HEATMAP_COLS")
            .unwrap_or(cfg.heatmap_grid.cols)
            .clamp(1, 120);
        let rows = env_parse::<usize>("PITCHLENS_HEATMAP_ROWS")
            .unwrap_or(cfg.heatmap_grid.rows)
            .clamp(1, 80);
        cfg.heatmap_grid = GridSpec::new(cols, rows)?;
        if let Some(xg) = env_parse::<f64>("PITCHLENS_DEFAULT_XG") {
            cfg.timeline.default_xg = xg.clamp(0.0, 1.0);
        }
        cfg.cache_capacity = env_parse::<usize>("PITCHLENS_CACHE_CAPACITY")
            .unwrap_or(DEFAULT_CACHE_CAPACITY)
            .max(1);
        if let Ok(url) = env::var("PITCHLENS_OPEN_DATA_URL")
            && !url.trim().is_empty()
        {
            cfg.open_data_url = url.trim().trim_end_matches('/').to_string();
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        self.network.validate()?;
        self.timeline.validate()?;
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|val| val.trim().parse::<T>().ok())
}
