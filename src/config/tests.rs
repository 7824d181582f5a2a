use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.endpoint_port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.revalidate.secret = Some("from-file".to_string());

    let overrides = ServeOverrides {
        endpoint_port: Some(4321),
        log_level: Some("debug".to_string()),
        revalidate: RevalidateOverrides {
            secret: Some("from-cli".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.endpoint_addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.revalidate.secret.as_deref(), Some("from-cli"));
}

#[test]
fn defaults_leave_relay_unconfigured() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.endpoint_addr.port(), DEFAULT_ENDPOINT_PORT);
    assert_eq!(settings.server.relay_addr.port(), DEFAULT_RELAY_PORT);
    assert!(settings.revalidate.secret.is_none());
    assert!(settings.revalidate.endpoint_url.is_none());
    assert_eq!(settings.revalidate.timeout, Duration::from_secs(5));
    assert!(settings.cache.enabled);
    assert_eq!(
        settings.cache.response_limit.get(),
        DEFAULT_CACHE_RESPONSE_LIMIT
    );
}

#[test]
fn blank_secret_counts_as_unset() {
    let mut raw = RawSettings::default();
    raw.revalidate.secret = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.revalidate.secret.is_none());
}

#[test]
fn secret_is_kept_verbatim() {
    let mut raw = RawSettings::default();
    raw.revalidate.secret = Some(" Padded-Secret ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(
        settings.revalidate.secret.as_deref(),
        Some(" Padded-Secret ")
    );
}

#[test]
fn endpoint_url_must_be_http() {
    let mut raw = RawSettings::default();
    raw.revalidate.endpoint_url = Some("ftp://example.com".to_string());

    let err = Settings::from_raw(raw).expect_err("ftp should be rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "revalidate.endpoint_url",
            ..
        }
    ));
}

#[test]
fn zero_timeout_is_rejected() {
    let mut raw = RawSettings::default();
    raw.revalidate.timeout_ms = Some(0);

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn zero_cache_limit_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.response_limit = Some(0);

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn debug_output_redacts_secret() {
    let mut raw = RawSettings::default();
    raw.revalidate.secret = Some("super-secret-value".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    let rendered = format!("{:?}", settings.revalidate);
    assert!(!rendered.contains("super-secret-value"));
    assert!(rendered.contains("<redacted>"));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["revalidator"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_revalidate_arguments() {
    let args = CliArgs::parse_from([
        "revalidator",
        "revalidate",
        "--endpoint-url",
        "http://localhost:3000",
        "--path",
        "/posts",
        "--tag",
        "posts",
    ]);

    match args.command.expect("revalidate command") {
        Command::Revalidate(revalidate) => {
            assert_eq!(
                revalidate.overrides.endpoint_url.as_deref(),
                Some("http://localhost:3000")
            );
            assert_eq!(revalidate.path.as_deref(), Some("/posts"));
            assert_eq!(revalidate.tag.as_deref(), Some("posts"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_relay_overrides() {
    let args = CliArgs::parse_from([
        "revalidator",
        "relay",
        "--server-host",
        "0.0.0.0",
        "--server-relay-port",
        "8081",
        "--relay-timeout-ms",
        "250",
    ]);

    match args.command.expect("relay command") {
        Command::Relay(relay) => {
            assert_eq!(relay.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(relay.overrides.relay_port, Some(8081));
            assert_eq!(relay.overrides.revalidate.timeout_ms, Some(250));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn bare_invocation_reads_revalidation_env() {
    // SAFETY: no other test in this crate writes these variables.
    unsafe {
        std::env::set_var("REVALIDATE_SECRET", "env-secret");
        std::env::set_var("NEXTJS_URL", "http://localhost:3000");
    }

    let args = CliArgs::parse_from(["revalidator"]);
    let result = load(&args);

    unsafe {
        std::env::remove_var("REVALIDATE_SECRET");
        std::env::remove_var("NEXTJS_URL");
    }

    assert!(args.command.is_none());
    let settings = result.expect("valid settings");
    assert_eq!(settings.revalidate.secret.as_deref(), Some("env-secret"));
    assert_eq!(
        settings.revalidate.endpoint_url.as_ref().map(Url::as_str),
        Some("http://localhost:3000/")
    );
}
