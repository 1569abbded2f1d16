// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};

use crate::ScopeDocument;

const DEMO_DOCUMENT: &str = include_str!("demo.json");

/// Built-in data used when no document path is configured.
pub fn demo_document() -> Result<ScopeDocument> {
    ScopeDocument::from_json(DEMO_DOCUMENT).context("load built-in demo document")
}
