//! Property-based tests for client settings validation and persistence

use proptest::prelude::*;
use rdpdrive_core::config::{
    parse_settings, render_settings, MAX_PERIOD_SECS, MAX_WAIT_TIMEOUT_MS,
};
use rdpdrive_core::{ClientSettings, ConfigError, MAX_EVENT_SOURCES};

// Strategy for generating valid hostnames
fn arb_host() -> impl Strategy<Value = String> {
    prop_oneof![
        // Simple hostnames
        "[a-z][a-z0-9]{0,15}".prop_map(|s| s),
        // IP addresses
        (1u8..=254, 0u8..=255, 0u8..=255, 1u8..=254)
            .prop_map(|(a, b, c, d)| format!("{a}.{b}.{c}.{d}")),
        // Domain names
        "[a-z][a-z0-9]{0,10}\\.[a-z]{2,4}".prop_map(|s| s),
    ]
}

// Strategy for generating valid ports
fn arb_port() -> impl Strategy<Value = u16> {
    prop_oneof![Just(3389u16), 1024u16..=65535u16]
}

// Strategy for generating valid color depths
fn arb_color_depth() -> impl Strategy<Value = u8> {
    prop_oneof![Just(8u8), Just(15u8), Just(16u8), Just(24u8), Just(32u8)]
}

// Strategy for generating valid client settings
fn arb_settings() -> impl Strategy<Value = ClientSettings> {
    (
        arb_host(),
        arb_port(),
        prop_oneof![Just(None), "[a-zA-Z][a-zA-Z0-9_]{0,15}".prop_map(Some)],
        (640u16..=7680, 480u16..=4320),
        arb_color_depth(),
        1u64..=MAX_PERIOD_SECS,
        1u64..=MAX_WAIT_TIMEOUT_MS,
        1usize..=MAX_EVENT_SOURCES,
        0u64..=MAX_PERIOD_SECS,
    )
        .prop_map(
            |(host, port, username, (width, height), depth, timeout, wait_ms, capacity, keepalive)| {
                let mut settings = ClientSettings::new(host)
                    .with_port(port)
                    .with_resolution(width, height)
                    .with_color_depth(depth)
                    .with_timeout_secs(timeout)
                    .with_wait_timeout_ms(wait_ms)
                    .with_max_event_sources(capacity)
                    .with_keepalive_secs(keepalive);
                settings.username = username;
                settings
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Generated settings within the documented bounds always validate.
    #[test]
    fn prop_valid_settings_pass_validation(settings in arb_settings()) {
        prop_assert!(settings.validate().is_ok());
    }

    /// Settings survive a trip through the TOML settings file format, minus the
    /// password, across the full validated range of every duration.
    #[test]
    fn prop_settings_file_preserves_settings(settings in arb_settings(), password in "[a-z]{1,12}") {
        let settings = settings.with_password(password.clone());
        let text = render_settings(&settings).unwrap();
        let quoted_password = format!("\"{password}\"");
        prop_assert!(!text.contains(&quoted_password));

        let parsed = parse_settings(&text).unwrap();
        prop_assert_eq!(&parsed, &settings);
        prop_assert!(parsed.password.is_none());
    }

    /// Capacities above the fixed maximum are rejected by name.
    #[test]
    fn prop_capacity_above_maximum_rejected(capacity in (MAX_EVENT_SOURCES + 1)..1024) {
        let result = ClientSettings::new("host").with_max_event_sources(capacity).validate();
        let rejected = matches!(
            result,
            Err(ConfigError::Validation { ref field, .. }) if field == "max_event_sources"
        );
        prop_assert!(rejected);
    }

    /// Durations beyond their bounds are rejected by name.
    #[test]
    fn prop_out_of_range_periods_rejected(excess in 1u64..=u64::MAX - MAX_WAIT_TIMEOUT_MS) {
        let base = ClientSettings::new("host");
        let cases = [
            (
                "keepalive_secs",
                base.clone().with_keepalive_secs(MAX_PERIOD_SECS.saturating_add(excess)),
            ),
            (
                "timeout_secs",
                base.clone().with_timeout_secs(MAX_PERIOD_SECS.saturating_add(excess)),
            ),
            (
                "wait_timeout_ms",
                base.with_wait_timeout_ms(MAX_WAIT_TIMEOUT_MS + excess),
            ),
        ];
        for (name, settings) in cases {
            let rejected = matches!(
                settings.validate(),
                Err(ConfigError::Validation { ref field, .. }) if field == name
            );
            prop_assert!(rejected, "{} was accepted", name);
        }
    }
}

#[test]
fn test_unrepresentable_timeouts_rejected() {
    let settings = ClientSettings::new("host")
        .with_timeout_secs(u64::MAX)
        .with_wait_timeout_ms(u64::MAX);
    assert!(settings.validate().is_err());

    let settings = ClientSettings::new("host").with_keepalive_secs(u64::MAX);
    assert!(matches!(
        settings.validate(),
        Err(ConfigError::Validation { ref field, .. }) if field == "keepalive_secs"
    ));
}
