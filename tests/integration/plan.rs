//! Tests for `wiring plan`

use super::common::{TestContext, SERVICE_MANIFEST};
use predicates::prelude::*;

#[test]
fn plan_prints_text_by_default() {
    let ctx = TestContext::new();
    let manifest = ctx.write_manifest("wiring.yaml", SERVICE_MANIFEST);

    ctx.wiring()
        .arg("plan")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("Import stages:\n  1. config\n  2. system"))
        .stdout(predicate::str::contains("svc.cfg <- cfg"))
        .stdout(predicate::str::contains("Bootstrap:\n  1. svc"));
}

#[test]
fn plan_prints_json() {
    let ctx = TestContext::new();
    let manifest = ctx.write_manifest("wiring.yaml", SERVICE_MANIFEST);

    let output = ctx
        .wiring()
        .arg("plan")
        .arg(&manifest)
        .arg("--format")
        .arg("json")
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["import_stages"][1][0], "system");
    assert_eq!(report["modules"][1]["assignments"][0]["sources"][0], "cfg");
}

#[test]
fn plan_format_defaults_from_config() {
    let ctx = TestContext::new();
    let manifest = ctx.write_manifest("wiring.yaml", SERVICE_MANIFEST);
    let config = ctx.write_config("report_format: json\n");

    ctx.wiring()
        .arg("--config")
        .arg(&config)
        .arg("plan")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{"));
}

#[test]
fn plan_shows_aggregation() {
    let ctx = TestContext::new();
    let manifest = ctx.write_manifest(
        "wiring.yaml",
        r#"
classes:
  - name: Plugin
  - name: Host
modules:
  - name: plugins
    elements:
      - { label: audio, provides: Plugin, export: true }
      - { label: video, provides: Plugin, export: true }
  - name: host
    imports: [plugins]
    elements:
      - label: host
        provides: Host
        args:
          - { name: plugins, type: "FrozenSet[Plugin]" }
aggregation:
  args: [plugins]
"#,
    );

    ctx.wiring()
        .arg("plan")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("host.plugins <= frozenset[audio, video]"));
}
