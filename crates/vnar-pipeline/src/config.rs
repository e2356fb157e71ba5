//! Pipeline configuration.

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Largest allowed silence between consecutive timeline events (seconds).
    /// The even-subdivision fallback places roughly one synthetic event per
    /// 7 seconds, so values below 7 are only met on a best-effort basis.
    pub max_gap_secs: u32,
    /// Speaking-time allowance for the last event (seconds)
    pub trailing_allowance_secs: u32,
    /// Frame sampling interval (seconds)
    pub sample_interval_secs: u32,
    /// Retry budget for each remote call (retries beyond the first attempt)
    pub max_retries: u32,
    /// Work directory for sampled frames and scratch files
    pub work_dir: String,
    /// Requested narration voice, validated against the service's catalog
    pub voice: Option<String>,
    /// Generation model override
    pub model: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_gap_secs: 10,
            trailing_allowance_secs: 8,
            sample_interval_secs: 10,
            max_retries: 5,
            work_dir: "/tmp/vnar".to_string(),
            voice: None,
            model: None,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_gap_secs: std::env::var("VNAR_MAX_GAP_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            trailing_allowance_secs: std::env::var("VNAR_TRAILING_ALLOWANCE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8),
            sample_interval_secs: std::env::var("VNAR_SAMPLE_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            max_retries: std::env::var("VNAR_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            work_dir: std::env::var("VNAR_WORK_DIR").unwrap_or_else(|_| "/tmp/vnar".to_string()),
            voice: std::env::var("VNAR_VOICE").ok().filter(|v| !v.is_empty()),
            model: std::env::var("VNAR_MODEL").ok().filter(|m| !m.is_empty()),
        }
    }
}
