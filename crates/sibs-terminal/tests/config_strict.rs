#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use sibs_terminal::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
session:
  reply_timeout_ms: 5000
  replay_timeout_ms: 10 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.terminal.listen, "0.0.0.0:10005");
    assert_eq!(cfg.session.reply_timeout_ms, 30000);
    assert!(cfg.bootstrap.credentials_path.is_none());
    assert!(cfg.bootstrap.auto_payment.is_none());
}

#[test]
fn full_config() {
    let ok = r#"
version: 1
terminal:
  listen: "127.0.0.1:9000"
  path: "/pos"
  ping_interval_ms: 10000
  idle_timeout_ms: 30000
session:
  reply_timeout_ms: 2000
  pairing_timeout_ms: 60000
  event_buffer: 32
bootstrap:
  credentials_path: "credentials.json"
  auto_payment:
    amount: 0.01
    reference: "bootstrap"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.terminal.path, "/pos");
    assert_eq!(cfg.session.reply_timeout().as_millis(), 2000);
    assert_eq!(cfg.bootstrap.credentials_path.as_deref(), Some("credentials.json"));
    assert_eq!(cfg.bootstrap.auto_payment.unwrap().amount, 0.01);
}

#[test]
fn out_of_range_values_fail_validation() {
    for bad in [
        "version: 2\n",
        "version: 1\nsession:\n  reply_timeout_ms: 10\n",
        "version: 1\nsession:\n  event_buffer: 0\n",
        "version: 1\nterminal:\n  path: \"pos\"\n",
        "version: 1\nterminal:\n  ping_interval_ms: 30000\n  idle_timeout_ms: 20000\n",
        "version: 1\nbootstrap:\n  auto_payment:\n    amount: -1\n",
    ] {
        let err = config::load_from_str(bad).expect_err(bad);
        assert_eq!(err.code().as_str(), "CONFIG", "{bad}");
    }
}
