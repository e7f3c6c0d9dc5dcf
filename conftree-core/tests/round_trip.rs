use std::fs;
use std::path::PathBuf;

use conftree_core::{from_json, parse, parse_file, to_json, Platform};

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

const FIXTURES: &[(&str, Platform)] = &[
    ("fixtures/ios_current.cfg", Platform::CiscoIos),
    ("fixtures/ios_target.cfg", Platform::CiscoIos),
    ("fixtures/huawei_current.cfg", Platform::Huawei),
    ("fixtures/huawei_target.cfg", Platform::Huawei),
    ("fixtures/arista_current.cfg", Platform::Arista),
    ("fixtures/arista_target.cfg", Platform::Arista),
];

#[test]
fn config_render_reparses_to_equal_tree() {
    for &(path, platform) in FIXTURES {
        let first = parse_file(&fixture(path), platform).expect("initial parse should succeed");
        let rendered = first.config();
        let second = parse(&rendered, platform).expect("re-parse should succeed");
        assert_eq!(first, second, "round trip changed {path}");
    }
}

#[test]
fn written_config_file_round_trips() {
    let node = parse_file(&fixture("fixtures/huawei_current.cfg"), Platform::Huawei)
        .expect("parse should succeed");
    let out_dir = tempfile::tempdir().expect("tempdir should be created");
    let out_path = out_dir.path().join("roundtrip.cfg");

    fs::write(&out_path, node.config()).expect("write should succeed");
    let reparsed = parse_file(&out_path, Platform::Huawei).expect("parse_file should succeed");
    assert_eq!(node, reparsed);
}

#[test]
fn json_dict_form_round_trips() {
    for &(path, platform) in FIXTURES {
        let node = parse_file(&fixture(path), platform).expect("parse");
        let json = to_json(&node);
        let back = from_json(platform, &json).expect("from_json");
        assert_eq!(node, back, "json round trip changed {path}");
        assert_eq!(node.config(), back.config());
    }
}

#[test]
fn ranges_and_banners_are_normalized_once() {
    let ios = parse_file(&fixture("fixtures/ios_current.cfg"), Platform::CiscoIos).expect("parse");
    for vty in 0..=4 {
        let section = ios
            .child(&format!("line vty {vty}"))
            .expect("expanded vty section");
        assert!(section.child("transport input ssh").is_some());
    }
    assert!(ios.child("line vty 0 4").is_none());

    let config = ios.config();
    assert!(config.contains("banner motd ^C\nAuthorized access only\n^C\n"));
    assert!(!config.contains("Building configuration"));

    let huawei = parse_file(&fixture("fixtures/huawei_current.cfg"), Platform::Huawei).expect("parse");
    assert!(huawei.child("user-interface vty 4").is_some());
    assert!(huawei.child("return").is_none());
}

#[test]
fn missing_file_is_an_io_error() {
    let err = parse_file(&fixture("fixtures/does_not_exist.cfg"), Platform::CiscoIos)
        .expect_err("missing file");
    assert!(err.to_string().starts_with("failed to read config file"));
}
