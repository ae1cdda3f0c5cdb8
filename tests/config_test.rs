use anyhow::Result;
use std::time::Duration;
use walletlink::config::WalletConfig;
use walletlink::network::{parse_chain_id, UNSUPPORTED_NETWORK_NAME};

#[test]
fn test_load_config_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "providerUrl": "http://127.0.0.1:8545",
            "sessionFile": "/tmp/walletlink-test/session.json",
            "rpcOverrides": { "137": "http://127.0.0.1:8546" },
            "connectTimeoutSecs": 5
        }"#,
    )?;

    let config = WalletConfig::load(&path)?;
    assert_eq!(config.provider_url.as_deref(), Some("http://127.0.0.1:8545"));
    assert_eq!(config.connect_timeout(), Duration::from_secs(5));
    assert_eq!(config.rpc_timeout(), Duration::from_secs(30));
    assert_eq!(
        config.session_path(),
        std::path::PathBuf::from("/tmp/walletlink-test/session.json")
    );

    let registry = config.registry();
    assert_eq!(registry.describe(137).unwrap().rpc_url, "http://127.0.0.1:8546");
    assert_eq!(registry.describe(1).unwrap().name, "Ethereum Mainnet");
    Ok(())
}

#[test]
fn test_invalid_config_names_the_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ nope")?;

    let err = WalletConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("broken.json"));
    assert!(WalletConfig::load(&dir.path().join("absent.json")).is_err());
    Ok(())
}

#[test]
fn test_registry_lookups() -> Result<()> {
    let registry = WalletConfig::default().registry();
    let ids: Vec<u64> = registry.networks().map(|n| n.chain_id).collect();
    assert_eq!(ids, vec![1, 56, 137]);

    for id in &ids {
        assert_eq!(registry.describe(*id).unwrap().chain_id, *id);
    }
    assert!(registry.describe(999).is_none());
    assert_eq!(registry.name_of(999), UNSUPPORTED_NETWORK_NAME);

    assert_eq!(parse_chain_id("0x89")?, 137);
    assert_eq!(parse_chain_id("56")?, 56);
    assert!(parse_chain_id("polygon").is_err());
    Ok(())
}
