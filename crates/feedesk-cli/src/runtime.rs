// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use feedesk_app::{FeeScope, IdSource, NormalizeReport, ScopeDocument, demo_document};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Where the fee document is read from at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Demo,
}

impl DataSource {
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Demo, Self::File)
    }

    pub fn read(&self) -> Result<ScopeDocument> {
        match self {
            Self::File(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("read fee document {}", path.display()))?;
                ScopeDocument::from_json(&raw).with_context(|| {
                    format!(
                        "load fee document {} -- expected a JSON object with serviceFeesByDeliveryScope",
                        path.display()
                    )
                })
            }
            Self::Demo => demo_document(),
        }
    }

    pub fn load<I: IdSource>(&self, ids: &mut I) -> Result<(FeeScope, NormalizeReport)> {
        let (scope, report) = self.read()?.normalize(ids)?;
        info!(
            source = %self,
            tabs = report.tabs,
            cards = report.cards,
            records = report.records,
            "loaded fee document"
        );
        if report.record_ids_assigned > 0 || report.card_ids_assigned > 0 {
            info!(
                records = report.record_ids_assigned,
                cards = report.card_ids_assigned,
                "assigned missing ids"
            );
        }
        Ok((scope, report))
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Demo => f.write_str("built-in demo"),
        }
    }
}

/// Save sink for the UI: the whole scope is serialized and written to the log.
#[derive(Debug, Default)]
pub struct LogRuntime {
    saves: usize,
}

impl LogRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(scope: &FeeScope) -> Result<String> {
        ScopeDocument::from_scope(scope).to_json_pretty()
    }
}

impl feedesk_tui::AppRuntime for LogRuntime {
    fn save(&mut self, scope: &FeeScope) -> Result<()> {
        let payload = Self::render(scope)?;
        self.saves += 1;
        info!(save = self.saves, %payload, "saved service fee data");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DataSource, LogRuntime};
    use anyhow::Result;
    use feedesk_app::{FeeScope, ScopeDocument};
    use feedesk_testkit::{FeeFaker, SequentialIds, domestic_delivery_tab, temp_document_path};
    use feedesk_tui::AppRuntime;
    use std::path::PathBuf;

    #[test]
    fn missing_path_falls_back_to_demo() {
        assert_eq!(DataSource::from_path(None), DataSource::Demo);
        assert_eq!(
            DataSource::from_path(Some(PathBuf::from("/tmp/fees.json"))),
            DataSource::File(PathBuf::from("/tmp/fees.json"))
        );
    }

    #[test]
    fn demo_source_loads_with_generated_ids() -> Result<()> {
        let mut ids = SequentialIds::default();
        let (scope, report) = DataSource::Demo.load(&mut ids)?;
        assert_eq!(scope.tabs().len(), report.tabs);
        assert!(report.record_ids_assigned > 0);
        assert_eq!(scope.active_name(), scope.tabs().first().map(|tab| tab.name.as_str()));
        Ok(())
    }

    #[test]
    fn file_source_reads_saved_document() -> Result<()> {
        let mut ids = SequentialIds::default();
        let mut faker = FeeFaker::new(7);
        let scope = FeeScope::new(vec![
            domestic_delivery_tab(&mut ids),
            faker.card_tab(&mut ids, "VN", "US", 2),
        ]);
        let (_temp, path) = temp_document_path(&ScopeDocument::from_scope(&scope))?;

        let (loaded, report) = DataSource::File(path).load(&mut ids)?;
        assert_eq!(report.record_ids_assigned, 0);
        assert_eq!(report.card_ids_assigned, 0);
        assert_eq!(loaded.tabs(), scope.tabs());
        Ok(())
    }

    #[test]
    fn file_source_reports_missing_file() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("absent.json");
        let error = DataSource::File(path)
            .read()
            .expect_err("missing file should fail");
        assert!(error.to_string().contains("read fee document"));
        Ok(())
    }

    #[test]
    fn file_source_reports_malformed_json() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("fees.json");
        std::fs::write(&path, "[1, 2, 3]")?;
        let error = DataSource::File(path)
            .read()
            .expect_err("array is not a fee document");
        assert!(format!("{error:#}").contains("serviceFeesByDeliveryScope"));
        Ok(())
    }

    #[test]
    fn save_serializes_full_scope() -> Result<()> {
        let mut ids = SequentialIds::default();
        let scope = FeeScope::new(vec![domestic_delivery_tab(&mut ids)]);
        let mut runtime = LogRuntime::new();
        runtime.save(&scope)?;
        runtime.save(&scope)?;
        assert_eq!(runtime.saves, 2);

        let payload = LogRuntime::render(&scope)?;
        assert!(payload.contains("\"nameTab\": \"Domestic Delivery\""));
        let reparsed = ScopeDocument::from_json(&payload)?;
        assert_eq!(reparsed, ScopeDocument::from_scope(&scope));
        Ok(())
    }
}
