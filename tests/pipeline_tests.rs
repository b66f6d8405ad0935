mod common;

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind};
use pretty_assertions::assert_eq;
use serde_yaml::Value;
use seriorch::cli::config::{Config, DbConfig};
use seriorch::error::Error;
use seriorch::manifest::{
    MANIFEST_FILE, build_manifest, read_manifest, rebuild_records, write_manifest,
};
use seriorch::pipeline::inject::{inject_project, statements};
use seriorch::pipeline::{
    LOCATION_LINK, ScriptSink, StatementSink, Watcher, build, init, inject, parse_document,
    render_document, unravel,
};

use crate::common::utils::{SCENARIO_ID, Workspace, offline_config, sample_source};

fn wrap(records: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<odoo><data>\n{}\n</data></odoo>",
        records
    )
}

const MINIMAL_SCENARIO: &str = r#"<record id="S" model="ir.ui.menu.ionic">
    <field name="name">S</field>
    <field name="icon">fa-s</field>
    <field name="sequence" eval="1"/>
    <field name="view_id" ref="S_home"/>
</record>"#;

// ============================================================================
// parse_document
// ============================================================================

#[test]
fn parse_sample_document() {
    let records = parse_document(&sample_source()).unwrap();
    assert_eq!(records.scenario.xml_id, SCENARIO_ID);
    assert_eq!(records.onchanges.len(), 3);
    assert_eq!(records.views.len(), 2);
    assert_eq!(records.styles.len(), 1);
    assert_eq!(records.labels.len(), 1);
    assert_eq!(records.params.len(), 1);
    assert_eq!(
        records.scenario.onchanges,
        vec!["scn_stock_oc_init", "scn_stock_oc_check", "legacy_oc", "ext_shared_oc"]
    );
}

#[test]
fn duplicate_ids_keep_the_last_definition_in_first_position() {
    let xml = wrap(&format!(
        "{}\n{}\n{}\n{}",
        r#"<record id="S_a" model="ir.ui.menu.ionic.label"><field name="name">a</field><field name="value">first</field></record>"#,
        r#"<record id="S_b" model="ir.ui.menu.ionic.label"><field name="name">b</field><field name="value">b</field></record>"#,
        r#"<record id="S_a" model="ir.ui.menu.ionic.label"><field name="name">a</field><field name="value">second</field></record>"#,
        MINIMAL_SCENARIO,
    ));
    let records = parse_document(&xml).unwrap();
    let values: Vec<(&str, &str)> = records
        .labels
        .iter()
        .map(|l| (l.xml_id.as_str(), l.value.as_str()))
        .collect();
    assert_eq!(values, vec![("S_a", "second"), ("S_b", "b")]);
}

#[test]
fn document_needs_exactly_one_scenario() {
    let none = wrap("");
    assert!(matches!(
        parse_document(&none).unwrap_err(),
        Error::ScenarioCount { count: 0 }
    ));

    let two = wrap(&format!(
        "{}\n{}",
        MINIMAL_SCENARIO,
        MINIMAL_SCENARIO.replace(r#"id="S""#, r#"id="T""#)
    ));
    assert!(matches!(
        parse_document(&two).unwrap_err(),
        Error::ScenarioCount { count: 2 }
    ));
}

#[test]
fn structural_error_aborts_parsing() {
    let xml = wrap(&format!(
        "{}\n{}",
        r#"<record id="S_p" model="ir.ui.menu.ionic.param"><field name="name">p</field></record>"#,
        MINIMAL_SCENARIO
    ));
    match parse_document(&xml).unwrap_err() {
        Error::MissingField { kind, id, field } => {
            assert_eq!(kind, "param");
            assert_eq!(id, "S_p");
            assert_eq!(field, "value");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn invalid_xml_is_reported() {
    assert!(matches!(
        parse_document("<odoo><data>").unwrap_err(),
        Error::Xml(_)
    ));
}

// ============================================================================
// render_document
// ============================================================================

#[test]
fn rendered_document_layout() {
    let records = parse_document(&sample_source()).unwrap();
    let document = render_document(&records, "openerp");

    assert!(document.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<openerp>\n<data>\n"));
    assert!(document.ends_with("</data>\n</openerp>\n"));

    let position = |needle: &str| document.find(needle).unwrap();
    assert!(position(r#"id="scn_stock_oc_init""#) < position(r#"id="scn_stock_home""#));
    assert!(position(r#"id="scn_stock_detail""#) < position(r#"id="scn_stock_css""#));
    assert!(position(r#"id="scn_stock_css""#) < position(r#"id="scn_stock" "#));
    assert!(position(r#"id="scn_stock" "#) < position(r#"id="scn_stock_lbl_title""#));
    assert!(position(r#"id="scn_stock_lbl_title""#) < position(r#"id="scn_stock_max_qty""#));
    assert!(!document.contains("menu_unrelated"));
}

#[test]
fn rendered_document_parses_back_to_the_same_records() {
    let records = parse_document(&sample_source()).unwrap();
    let document = render_document(&records, "odoo");
    assert_eq!(parse_document(&document).unwrap(), records);
}

#[test]
fn scenario_reference_order_survives_the_manifest() {
    let onchange = r#"<record id="S_oc1" model="manual.onchange">
    <field name="raw_code"><![CDATA[result = 1]]></field>
</record>"#;

    for refs in [
        vec!["ext_oc2", "S_oc1"],
        vec!["S_oc1", "ext_oc2", "S_oc1"],
    ] {
        let calls: Vec<String> = refs.iter().map(|id| format!("ref('{}')", id)).collect();
        let scenario = MINIMAL_SCENARIO.replace(
            "</record>",
            &format!(
                "    <field name=\"onchange_ids\" eval=\"[(6, 0, [{}])]\"/>\n</record>",
                calls.join(", ")
            ),
        );
        let records = parse_document(&wrap(&format!("{}\n{}", onchange, scenario))).unwrap();
        assert_eq!(records.scenario.onchanges, refs);

        let skeleton = build_manifest(&records);
        let files: HashMap<String, String> = skeleton
            .side_cars
            .into_iter()
            .map(|s| (s.file_name, s.content))
            .collect();
        let text = serde_yaml::to_string(&skeleton.manifest).unwrap();
        let rebuilt = rebuild_records(&serde_yaml::from_str(&text).unwrap(), |name| {
            Ok(files[name].clone())
        })
        .unwrap();

        let reparsed = parse_document(&render_document(&rebuilt, "odoo")).unwrap();
        assert_eq!(reparsed.scenario.onchanges, refs);
    }
}

// ============================================================================
// init
// ============================================================================

#[test]
fn init_lays_out_project() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        build_name: "out.xml".into(),
        ..offline_config()
    };
    init(dir.path(), &config).unwrap();

    let manifest = read_manifest(&dir.path().join(MANIFEST_FILE)).unwrap();
    assert!(manifest.contains_key("prefix"));
    assert!(manifest.contains_key("db"));
    assert_eq!(std::fs::read_to_string(dir.path().join(".gitignore")).unwrap(), "out.xml\n");
    assert_eq!(
        std::fs::read_link(dir.path().join(LOCATION_LINK)).unwrap(),
        Path::new(".")
    );
    assert!(!dir.path().join(".git").exists());
}

#[test]
fn init_keeps_existing_manifest() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(MANIFEST_FILE), "db: keep_me\n").unwrap();
    init(dir.path(), &offline_config()).unwrap();
    assert_eq!(
        std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap(),
        "db: keep_me\n"
    );
}

// ============================================================================
// unravel
// ============================================================================

#[test]
fn unravel_writes_manifest_and_side_cars() {
    let ws = Workspace::new();
    let records = unravel(ws.project(), &ws.data_file(), &offline_config()).unwrap();
    assert_eq!(records.scenario.xml_id, SCENARIO_ID);

    for name in ["oc_init.py", "oc_check.py", "legacy_oc.py", "home.xml", "detail.xml", "css.css"] {
        assert!(ws.project().join(name).is_file(), "missing {}", name);
    }
    assert_eq!(ws.read("oc_check.py"), "result = qty <= 10 and qty > 0\n");
    assert_eq!(ws.read("css.css"), "page > .title { color: red; }\n");

    let manifest = read_manifest(&ws.project().join(MANIFEST_FILE)).unwrap();
    assert_eq!(manifest.get("prefix"), Some(&Value::from(SCENARIO_ID)));
    // template placeholder survives as an operator key
    assert_eq!(manifest.get("db"), Some(&Value::Null));
    let first: Vec<&str> = manifest.keys().take(2).filter_map(Value::as_str).collect();
    assert_eq!(first, vec!["db", "prefix"]);
    assert_eq!(manifest.keys().last().and_then(Value::as_str), Some("help"));
}

#[test]
fn unravel_points_location_at_data_directory() {
    let ws = Workspace::new();
    unravel(ws.project(), &ws.data_file(), &offline_config()).unwrap();

    let target = std::fs::read_link(ws.project().join(LOCATION_LINK)).unwrap();
    assert_eq!(target, ws.data_dir.path().canonicalize().unwrap());
}

#[test]
fn unravel_preserves_operator_keys() {
    let ws = Workspace::new();
    unravel(ws.project(), &ws.data_file(), &offline_config()).unwrap();

    let path = ws.project().join(MANIFEST_FILE);
    let mut manifest = read_manifest(&path).unwrap();
    manifest.insert("db".into(), "stock_prod".into());
    manifest.insert("config".into(), serde_yaml::from_str("{keep_build: true}").unwrap());
    write_manifest(&path, &manifest).unwrap();

    unravel(ws.project(), &ws.data_file(), &offline_config()).unwrap();
    let manifest = read_manifest(&path).unwrap();
    assert_eq!(manifest.get("db"), Some(&Value::from("stock_prod")));
    assert!(manifest.get("config").is_some());
}

#[test]
fn unravel_missing_file() {
    let ws = Workspace::new();
    let err = unravel(ws.project(), &ws.project().join("nope.xml"), &offline_config()).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

// ============================================================================
// build
// ============================================================================

#[test]
fn build_moves_artifact_into_location() {
    let ws = Workspace::new();
    let config = offline_config();
    let records = unravel(ws.project(), &ws.data_file(), &config).unwrap();

    let delivered = build(ws.project(), &config).unwrap();
    assert_eq!(delivered, ws.project().join(LOCATION_LINK).join("data_scn_stock.xml"));
    assert!(!ws.project().join(&config.build_name).exists());

    // the delivered file replaced the original data file
    let content = std::fs::read_to_string(ws.data_file()).unwrap();
    assert_eq!(parse_document(&content).unwrap(), records);
}

#[test]
fn build_keeps_artifact_when_configured() {
    let ws = Workspace::new();
    let config = Config {
        keep_build: true,
        ..offline_config()
    };
    unravel(ws.project(), &ws.data_file(), &config).unwrap();
    build(ws.project(), &config).unwrap();

    assert_eq!(ws.read(&config.build_name), std::fs::read_to_string(ws.data_file()).unwrap());
}

#[test]
fn build_picks_up_side_car_edits() {
    let ws = Workspace::new();
    let config = offline_config();
    unravel(ws.project(), &ws.data_file(), &config).unwrap();

    std::fs::write(ws.project().join("oc_check.py"), "result = True\n").unwrap();
    build(ws.project(), &config).unwrap();

    let records = parse_document(&std::fs::read_to_string(ws.data_file()).unwrap()).unwrap();
    let check = records
        .onchanges
        .iter()
        .find(|oc| oc.xml_id == "scn_stock_oc_check")
        .unwrap();
    assert_eq!(check.code, "result = True");
}

#[test]
fn build_uses_scenario_file_name() {
    let ws = Workspace::new();
    let config = offline_config();
    unravel(ws.project(), &ws.data_file(), &config).unwrap();

    let path = ws.project().join(MANIFEST_FILE);
    let mut manifest = read_manifest(&path).unwrap();
    manifest.insert("file_name".into(), "renamed".into());
    write_manifest(&path, &manifest).unwrap();

    let delivered = build(ws.project(), &config).unwrap();
    assert!(delivered.ends_with("data_renamed.xml"));
    assert!(ws.data_dir.path().join("data_renamed.xml").is_file());
}

#[test]
fn build_fails_on_missing_side_car() {
    let ws = Workspace::new();
    let config = offline_config();
    unravel(ws.project(), &ws.data_file(), &config).unwrap();
    std::fs::remove_file(ws.project().join("home.xml")).unwrap();

    match build(ws.project(), &config).unwrap_err() {
        Error::MissingSideCar { path, .. } => assert!(path.ends_with("home.xml")),
        other => panic!("unexpected error: {}", other),
    }
}

// ============================================================================
// inject
// ============================================================================

#[derive(Default)]
struct RecordingSink {
    statements: Vec<String>,
    commits: usize,
}

impl StatementSink for RecordingSink {
    fn execute(&mut self, statement: &str) -> seriorch::Result<()> {
        self.statements.push(statement.to_string());
        Ok(())
    }

    fn commit(&mut self) -> seriorch::Result<()> {
        self.commits += 1;
        Ok(())
    }
}

#[test]
fn inject_sends_every_child_then_commits_once() {
    let records = parse_document(&sample_source()).unwrap();
    let mut sink = RecordingSink::default();
    let count = inject(&records, &mut sink).unwrap();

    assert_eq!(count, 8);
    assert_eq!(sink.statements, statements(&records));
    assert_eq!(sink.commits, 1);
    assert_eq!(
        sink.statements[1],
        "UPDATE manual_onchange SET code = 'result = qty <= 10 and qty > 0', \
         is_translatable_code = FALSE WHERE name = 'Check quantities';"
    );
    assert!(sink.statements[0].contains("''picking_id''"));
    assert_eq!(
        sink.statements[7],
        "UPDATE ir_ui_menu_ionic_param SET value = '10' WHERE name = 'max_qty';"
    );
}

#[test]
fn script_sink_layout() {
    let db = DbConfig {
        host: Some("localhost".into()),
        port: Some(5432),
        user: None,
    };
    let mut sink = ScriptSink::connect(Vec::new(), "<memory>", "stock", &db).unwrap();
    sink.execute("SELECT 1;").unwrap();
    sink.commit().unwrap();

    let script = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(script, "\\connect stock - localhost 5432\nSELECT 1;\nCOMMIT;\n");
}

#[test]
fn inject_project_requires_db() {
    let ws = Workspace::new();
    let config = offline_config();
    unravel(ws.project(), &ws.data_file(), &config).unwrap();

    let err = inject_project(ws.project(), &config, Vec::new(), "<memory>").unwrap_err();
    assert!(matches!(err, Error::ManifestField { ref field } if field == "db"));
}

#[test]
fn inject_project_renders_script() {
    let ws = Workspace::new();
    let config = offline_config();
    unravel(ws.project(), &ws.data_file(), &config).unwrap();

    let path = ws.project().join(MANIFEST_FILE);
    let mut manifest = read_manifest(&path).unwrap();
    manifest.insert("db".into(), "stock_prod".into());
    write_manifest(&path, &manifest).unwrap();

    let mut out = Vec::new();
    let count = inject_project(ws.project(), &config, &mut out, "<memory>").unwrap();
    let script = String::from_utf8(out).unwrap();

    assert_eq!(count, 8);
    assert!(script.starts_with("\\connect stock_prod - - -\n"));
    assert!(script.ends_with("COMMIT;\n"));
    assert_eq!(script.matches("UPDATE ").count(), 8);
}

// ============================================================================
// watch
// ============================================================================

#[test]
fn watcher_counts_closed_writes_only() {
    let dir = tempfile::tempdir().unwrap();
    let watcher = Watcher::new(dir.path(), &["build.xml"]).unwrap();
    let closed = || Event::new(EventKind::Access(AccessKind::Close(AccessMode::Write)));

    let event = closed()
        .add_path(dir.path().join("oc1.py"))
        .add_path(dir.path().join("build.xml"))
        .add_path(dir.path().join(".skeleton.yaml.swp"));
    assert_eq!(watcher.saved(&event), vec![dir.path().join("oc1.py")]);

    let opened = Event::new(EventKind::Access(AccessKind::Open(AccessMode::Any)))
        .add_path(dir.path().join("oc1.py"));
    assert!(watcher.saved(&opened).is_empty());
}

#[cfg(target_os = "linux")]
#[test]
fn watcher_sees_saves_and_drains_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let watcher = Watcher::new(dir.path(), &["build.xml"]).unwrap();

    std::fs::write(dir.path().join("build.xml"), "x").unwrap();
    std::fs::write(dir.path().join("home.xml"), "<data/>").unwrap();
    let saved = watcher.wait_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(saved, vec![dir.path().join("home.xml")]);

    assert!(watcher.wait_timeout(Duration::from_millis(200)).unwrap().is_empty());
    std::fs::write(dir.path().join("css.css"), "a {}").unwrap();
    std::thread::sleep(Duration::from_millis(200));
    assert!(watcher.drain() > 0);
    assert!(watcher.wait_timeout(Duration::from_millis(200)).unwrap().is_empty());
}
