#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use pushwire_core::PushwireError;
use pushwire_server::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
server:
  listen: "0.0.0.0:8080"
  chunk_byte: 1024 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(matches!(err, PushwireError::BadRequest(_)), "{err}");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.server.listen, "0.0.0.0:8080");
    assert_eq!(cfg.server.keepalive_secs, 10);
    assert_eq!(cfg.server.chunk_bytes, 32 * 1024);
}

#[test]
fn rejects_other_versions() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert!(matches!(err, PushwireError::UnsupportedVersion));
}

#[test]
fn rejects_out_of_range_values() {
    for bad in [
        "version: 1\nserver:\n  keepalive_secs: 0\n",
        "version: 1\nserver:\n  chunk_bytes: 16\n",
        "version: 1\nserver:\n  listen: \"not-an-addr\"\n",
    ] {
        let err = config::load_from_str(bad).expect_err("must fail");
        assert!(matches!(err, PushwireError::BadRequest(_)), "{bad}");
    }
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let cfg = config::load_or_default("does/not/exist/pushwire.yaml").expect("defaults");
    assert_eq!(cfg.server.listen, "0.0.0.0:8080");
}
