//! Configuration validation

use super::RunConfig;
use anyhow::Result;

/// Validate a run configuration before the target is opened
pub fn validate_config(config: &RunConfig) -> Result<()> {
    if config.count == 0 {
        anyhow::bail!("count must be at least 1");
    }

    if config.workers == 0 {
        anyhow::bail!("parallel worker count must be at least 1");
    }

    if config.buffer_size == 0 {
        anyhow::bail!("block size must be at least 1 byte");
    }

    if config.direct {
        if config.alignment == 0 || !config.alignment.is_power_of_two() {
            anyhow::bail!(
                "alignment must be a power of 2 with -nocache, got {}",
                config.alignment
            );
        }
        if config.buffer_size as u64 % config.alignment != 0 {
            anyhow::bail!(
                "block size {} is not a multiple of the alignment {}",
                config.buffer_size,
                config.alignment
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedMode;
    use std::path::PathBuf;

    fn config() -> RunConfig {
        RunConfig {
            target: PathBuf::from("f"),
            count: 10,
            workers: 1,
            direct: true,
            alignment: 4096,
            seed_mode: SeedMode::Reproducible,
            scan: None,
            buffer_size: 4096,
            latency_histogram: false,
            json_output: None,
            debug: false,
        }
    }

    #[test]
    fn test_valid() {
        assert!(validate_config(&config()).is_ok());
    }

    #[test]
    fn test_zero_count() {
        let mut c = config();
        c.count = 0;
        assert!(validate_config(&c).is_err());
    }

    #[test]
    fn test_zero_workers() {
        let mut c = config();
        c.workers = 0;
        assert!(validate_config(&c).is_err());
    }

    #[test]
    fn test_alignment_power_of_two() {
        let mut c = config();
        c.alignment = 3000;
        assert!(validate_config(&c).is_err());
    }

    #[test]
    fn test_buffer_multiple_of_alignment() {
        let mut c = config();
        c.buffer_size = 1000;
        assert!(validate_config(&c).is_err());
    }

    #[test]
    fn test_alignment_ignored_without_direct() {
        let mut c = config();
        c.direct = false;
        c.alignment = 3000;
        c.buffer_size = 1;
        assert!(validate_config(&c).is_ok());
    }
}
