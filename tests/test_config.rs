use muni::{Bus, BusConfig, Error, ThreadEnforcer, ThreadPolicy, DEFAULT_IDENTIFIER};

#[test]
fn test_config_from_json() -> anyhow::Result<()> {
    let config: BusConfig = serde_json::from_str(r#"{"identifier":"ui","thread_policy":"main"}"#)?;

    assert_eq!(config.identifier, "ui");
    assert_eq!(config.thread_policy, ThreadPolicy::Main);

    let bus = Bus::build().config(config).build()?;
    assert_eq!(bus.identifier(), "ui");
    assert!(matches!(bus.thread_enforcer(), ThreadEnforcer::MainThread));

    Ok(())
}

#[test]
fn test_missing_fields_take_defaults() -> anyhow::Result<()> {
    let config: BusConfig = serde_json::from_str("{}")?;

    assert_eq!(config, BusConfig::default());
    assert_eq!(config.identifier, DEFAULT_IDENTIFIER);
    assert_eq!(config.thread_policy, ThreadPolicy::Any);

    Ok(())
}

#[test]
fn test_unknown_policy_is_rejected() {
    let res = serde_json::from_str::<BusConfig>(r#"{"thread_policy":"sometimes"}"#);

    assert!(res.is_err());
}

#[test]
fn test_config_serializes_policy_in_snake_case() -> anyhow::Result<()> {
    let json = serde_json::to_value(BusConfig {
        identifier: "worker".into(),
        thread_policy: ThreadPolicy::Any,
    })?;

    assert_eq!(
        json,
        serde_json::json!({"identifier": "worker", "thread_policy": "any"})
    );

    Ok(())
}

#[test]
fn test_empty_identifier_from_config_is_rejected() -> anyhow::Result<()> {
    let config: BusConfig = serde_json::from_str(r#"{"identifier":""}"#)?;

    assert!(matches!(
        Bus::build().config(config).build(),
        Err(Error::InvalidArgument(_))
    ));

    Ok(())
}
