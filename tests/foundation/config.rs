//! Configuration tests

use tabula_foundation::StoreConfig;
use tabula_foundation::config::{DEFAULT_BUFFER_SIZE, DEFAULT_INIT_RETRIES, DEFAULT_MAX_RETRIES};

#[test]
fn defaults_match_constants() {
    let config = StoreConfig::default();
    assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    assert_eq!(config.init_retries, DEFAULT_INIT_RETRIES);
    assert_eq!(config.default_buffer_size, DEFAULT_BUFFER_SIZE);
    assert_eq!(StoreConfig::new(), config);
}

#[test]
fn builders_compose() {
    let config = StoreConfig::new()
        .with_max_retries(2)
        .with_init_retries(5)
        .with_default_buffer_size(16);
    assert_eq!(
        (config.max_retries, config.init_retries, config.default_buffer_size),
        (2, 5, 16)
    );
}
