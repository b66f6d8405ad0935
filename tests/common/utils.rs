use std::path::{Path, PathBuf};

use roxmltree::Document;
use seriorch::cli::config::Config;
use seriorch::record::{ChildRecord, Scenario};
use tempfile::TempDir;

pub const SCENARIO_ID: &str = "scn_stock";

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn sample_source() -> String {
    std::fs::read_to_string(fixture("sample.xml")).unwrap()
}

/// Config that never shells out to git.
pub fn offline_config() -> Config {
    Config {
        git: false,
        unravel_commit: false,
        ..Config::default()
    }
}

/// Parses the first `<record>` of `xml` as a child record.
pub fn parse_record<R: ChildRecord>(xml: &str) -> R {
    let doc = Document::parse(xml).unwrap();
    let node = doc.descendants().find(|n| n.has_tag_name("record")).unwrap();
    R::from_xml(node, xml).unwrap()
}

pub fn try_parse_record<R: ChildRecord>(xml: &str) -> seriorch::Result<R> {
    let doc = Document::parse(xml).unwrap();
    let node = doc.descendants().find(|n| n.has_tag_name("record")).unwrap();
    R::from_xml(node, xml)
}

pub fn parse_scenario(xml: &str) -> seriorch::Result<Scenario> {
    let doc = Document::parse(xml).unwrap();
    let node = doc.descendants().find(|n| n.has_tag_name("record")).unwrap();
    Scenario::from_xml(node)
}

/// A project directory and a separate directory holding a copy of the
/// sample data file, as `unravel` expects them.
pub struct Workspace {
    pub project: TempDir,
    pub data_dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let project = tempfile::tempdir().unwrap();
        let data_dir = tempfile::tempdir().unwrap();
        std::fs::copy(fixture("sample.xml"), data_dir.path().join("data_scn_stock.xml")).unwrap();
        Self { project, data_dir }
    }

    pub fn project(&self) -> &Path {
        self.project.path()
    }

    pub fn data_file(&self) -> PathBuf {
        self.data_dir.path().join("data_scn_stock.xml")
    }

    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.project().join(name)).unwrap()
    }
}
