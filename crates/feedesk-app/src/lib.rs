// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod document;
pub mod forms;
pub mod grid;
pub mod ids;
pub mod model;
pub mod scope;
pub mod seed;
pub mod state;

pub use document::*;
pub use forms::*;
pub use grid::{CommitOutcome, EditSlot, GridState};
pub use ids::*;
pub use model::*;
pub use scope::*;
pub use seed::*;
pub use state::*;
