// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use feedesk_app::{
    AppCommand, AppEvent, AppMode, AppState, EditSlot, FeeField, FeeRecord, FeeScope, GridRef,
    NamedTabInput, PendingRemoval, RouteTabInput, ScopeDocument, ScopeError, Tab, TabBody,
    TabForm, TabFormKind, demo_document,
};
use feedesk_testkit::{FeeFaker, SequentialIds, domestic_delivery_tab};
use std::collections::BTreeSet;

fn records<'a>(state: &'a AppState<SequentialIds>, grid: &GridRef) -> &'a [FeeRecord] {
    state
        .scope()
        .records(grid)
        .expect("grid should exist in test scope")
}

fn named(name: &str, currency: &str) -> TabForm {
    TabForm::Named(NamedTabInput {
        name: name.to_owned(),
        currency: currency.to_owned(),
    })
}

#[test]
fn add_row_on_empty_grid_yields_distinct_ids() {
    let mut state = AppState::with_ids(
        FeeScope::new(vec![Tab::flat("Empty", "VND")]),
        SequentialIds::new(),
    );
    let grid = GridRef::tab("Empty");
    for _ in 0..25 {
        state.dispatch(AppCommand::AddRow(grid.clone()));
    }

    let rows = records(&state, &grid);
    assert_eq!(rows.len(), 25);
    let ids: BTreeSet<_> = rows.iter().map(|record| record.id.clone()).collect();
    assert_eq!(ids.len(), 25);
}

#[test]
fn non_numeric_commit_stores_zero() {
    let mut ids = SequentialIds::new();
    let tab = domestic_delivery_tab(&mut ids);
    let mut state = AppState::with_ids(FeeScope::new(vec![tab]), ids);
    let grid = GridRef::tab("Domestic Delivery");
    let record = records(&state, &grid)[0].id.clone();

    state.dispatch(AppCommand::EnterEdit {
        grid: grid.clone(),
        record: record.clone(),
        field: FeeField::Fee,
    });
    let events = state.dispatch(AppCommand::CommitEdit {
        grid: grid.clone(),
        record,
        field: FeeField::Fee,
        raw: "not a number".to_owned(),
    });

    assert!(events.contains(&AppEvent::RecordsChanged(grid.clone())));
    assert_eq!(records(&state, &grid)[0].fee, 0.0);
    assert_eq!(state.mode, AppMode::Browse);
}

#[test]
fn remove_row_removes_exactly_one_record() {
    let mut ids = SequentialIds::new();
    let mut faker = FeeFaker::new(11);
    let tab = faker.flat_tab(&mut ids, "Bulk", "USD", 6);
    let mut state = AppState::with_ids(FeeScope::new(vec![tab]), ids);
    let grid = GridRef::tab("Bulk");
    let before = records(&state, &grid).to_vec();

    state.dispatch(AppCommand::RequestRemoval(PendingRemoval::Row {
        grid: grid.clone(),
        record: before[3].id.clone(),
    }));
    state.dispatch(AppCommand::Confirm);

    let mut expected = before.clone();
    expected.remove(3);
    assert_eq!(records(&state, &grid), expected.as_slice());
}

#[test]
fn duplicate_tab_leaves_scope_unchanged() {
    let scope = FeeScope::new(vec![Tab::flat("A", "VND")]);
    let error = scope
        .add_tab(Tab::flat("A", "USD"))
        .expect_err("duplicate tab should fail");
    assert_eq!(error, ScopeError::DuplicateTab("A".to_owned()));

    let mut state = AppState::with_ids(scope.clone(), SequentialIds::new());
    state.dispatch(AppCommand::OpenTabForm(TabFormKind::Named));
    state.dispatch(AppCommand::SubmitTab(named("A", "USD")));
    assert_eq!(state.scope(), &scope);
    assert_eq!(
        state.status_line.as_deref(),
        Some("tab with this name already exists")
    );
}

#[test]
fn duplicate_route_tab_names_the_country_combination() {
    let mut state = AppState::with_ids(FeeScope::default(), SequentialIds::new());
    let route = TabForm::Route(RouteTabInput {
        from_country: "VN".to_owned(),
        to_country: "CN".to_owned(),
        currency: "CNY".to_owned(),
    });
    state.dispatch(AppCommand::SubmitTab(route.clone()));
    assert_eq!(state.scope().active_name(), Some("International (VN - CN)"));

    state.dispatch(AppCommand::SubmitTab(route));
    assert_eq!(state.scope().tabs().len(), 1);
    assert_eq!(
        state.status_line.as_deref(),
        Some("tab with this country combination already exists")
    );
}

#[test]
fn removing_active_tab_activates_first_remaining() {
    let mut state = AppState::with_ids(
        FeeScope::new(vec![
            Tab::flat("A", "VND"),
            Tab::flat("B", "VND"),
            Tab::flat("C", "VND"),
        ]),
        SequentialIds::new(),
    );
    state.dispatch(AppCommand::SelectTab("B".to_owned()));
    state.dispatch(AppCommand::RequestRemoval(PendingRemoval::Tab {
        name: "B".to_owned(),
    }));
    let events = state.dispatch(AppCommand::Confirm);

    assert!(events.contains(&AppEvent::TabRemoved("B".to_owned())));
    assert_eq!(state.scope().active_name(), Some("A"));
    let names: Vec<_> = state.scope().tabs().iter().map(|tab| tab.name.as_str()).collect();
    assert_eq!(names, vec!["A", "C"]);
}

#[test]
fn removing_inactive_tab_keeps_selection() {
    let mut state = AppState::with_ids(
        FeeScope::new(vec![Tab::flat("A", "VND"), Tab::flat("B", "VND")]),
        SequentialIds::new(),
    );
    state.dispatch(AppCommand::SelectTab("B".to_owned()));
    state.dispatch(AppCommand::RequestRemoval(PendingRemoval::Tab {
        name: "A".to_owned(),
    }));
    state.dispatch(AppCommand::Confirm);
    assert_eq!(state.scope().active_name(), Some("B"));
}

#[test]
fn re_adding_removed_tab_starts_empty() {
    let mut ids = SequentialIds::new();
    let tab = domestic_delivery_tab(&mut ids);
    let mut state = AppState::with_ids(FeeScope::new(vec![tab]), ids);

    state.dispatch(AppCommand::RequestRemoval(PendingRemoval::Tab {
        name: "Domestic Delivery".to_owned(),
    }));
    state.dispatch(AppCommand::Confirm);
    assert!(state.scope().tabs().is_empty());

    state.dispatch(AppCommand::SubmitTab(named("Domestic Delivery", "VND")));
    let tab = state
        .scope()
        .tab("Domestic Delivery")
        .expect("tab should be re-added");
    assert_eq!(tab.body, TabBody::Fees(Vec::new()));
    assert_eq!(state.scope().active_name(), Some("Domestic Delivery"));
}

#[test]
fn domestic_delivery_add_then_remove_second() {
    let mut ids = SequentialIds::new();
    let tab = domestic_delivery_tab(&mut ids);
    let mut state = AppState::with_ids(FeeScope::new(vec![tab]), ids);
    let grid = GridRef::tab("Domestic Delivery");
    let original = records(&state, &grid).to_vec();

    state.dispatch(AppCommand::AddRow(grid.clone()));
    let after_add = records(&state, &grid).to_vec();
    assert_eq!(after_add.len(), 3);
    assert_eq!(after_add[2].service_type, "NEW_SERVICE");
    assert_eq!(after_add[2].fee, 0.0);

    state.dispatch(AppCommand::RequestRemoval(PendingRemoval::Row {
        grid: grid.clone(),
        record: original[1].id.clone(),
    }));
    state.dispatch(AppCommand::Confirm);

    let remaining = records(&state, &grid);
    assert_eq!(remaining.len(), 2);
    assert_eq!(remaining[0], original[0]);
    assert_eq!(remaining[1], after_add[2]);
}

#[test]
fn operations_never_mutate_the_previous_root() -> Result<()> {
    let mut ids = SequentialIds::new();
    let mut faker = FeeFaker::new(5);
    let scope = FeeScope::new(vec![
        domestic_delivery_tab(&mut ids),
        faker.card_tab(&mut ids, "VN", "VN", 2),
    ]);
    let snapshot = scope.clone();
    let card = scope.tabs()[1].cards()[0].id.clone();

    let _ = scope.add_tab(Tab::flat("New", "USD"))?;
    let _ = scope.remove_tab("Domestic Delivery")?;
    let _ = scope.set_currency(&GridRef::tab("Domestic Delivery"), "USD")?;
    let _ = scope.toggle_city("Domestic (VN - VN)", &card, "CT")?;
    let _ = scope.replace_records(&GridRef::card("Domestic (VN - VN)", card.clone()), Vec::new())?;
    let _ = scope.remove_card("Domestic (VN - VN)", &card)?;
    let _ = scope.add_card("Domestic (VN - VN)", &mut ids)?;

    assert_eq!(scope, snapshot);
    Ok(())
}

#[test]
fn second_commit_trigger_is_a_no_op() {
    let mut ids = SequentialIds::new();
    let tab = domestic_delivery_tab(&mut ids);
    let mut state = AppState::with_ids(FeeScope::new(vec![tab]), ids);
    let grid = GridRef::tab("Domestic Delivery");
    let record = records(&state, &grid)[0].id.clone();

    state.dispatch(AppCommand::EnterEdit {
        grid: grid.clone(),
        record: record.clone(),
        field: FeeField::ZoneToCode,
    });
    state.dispatch(AppCommand::CommitEdit {
        grid: grid.clone(),
        record: record.clone(),
        field: FeeField::ZoneToCode,
        raw: "DN".to_owned(),
    });
    let events = state.dispatch(AppCommand::CommitEdit {
        grid: grid.clone(),
        record,
        field: FeeField::ZoneToCode,
        raw: "CT".to_owned(),
    });

    assert!(events.is_empty());
    assert_eq!(records(&state, &grid)[0].zone_to_code, "DN");
}

#[test]
fn deleting_the_edited_row_drops_the_stale_commit() {
    let mut ids = SequentialIds::new();
    let tab = domestic_delivery_tab(&mut ids);
    let mut state = AppState::with_ids(FeeScope::new(vec![tab]), ids);
    let grid = GridRef::tab("Domestic Delivery");
    let record = records(&state, &grid)[0].id.clone();

    state.dispatch(AppCommand::EnterEdit {
        grid: grid.clone(),
        record: record.clone(),
        field: FeeField::Category,
    });
    state.dispatch(AppCommand::RequestRemoval(PendingRemoval::Row {
        grid: grid.clone(),
        record: record.clone(),
    }));
    state.dispatch(AppCommand::Confirm);
    let before = state.scope().clone();

    state.dispatch(AppCommand::CommitEdit {
        grid,
        record,
        field: FeeField::Category,
        raw: "GOODS".to_owned(),
    });
    assert_eq!(state.scope(), &before);
    assert_eq!(state.edit_slot(), &EditSlot::Idle);
}

#[test]
fn card_currency_and_cities_leave_edit_slot_alone() {
    let mut ids = SequentialIds::new();
    let tab = FeeFaker::new(9).card_tab(&mut ids, "VN", "VN", 1);
    let card = tab.cards()[0].clone();
    let mut state = AppState::with_ids(FeeScope::new(vec![tab]), ids);
    let grid = GridRef::card("Domestic (VN - VN)", card.id.clone());
    state.dispatch(AppCommand::AddRow(grid.clone()));
    let record = records(&state, &grid)
        .last()
        .expect("row was just added")
        .id
        .clone();

    state.dispatch(AppCommand::EnterEdit {
        grid: grid.clone(),
        record: record.clone(),
        field: FeeField::Fee,
    });
    state.dispatch(AppCommand::SetCurrency {
        grid: grid.clone(),
        currency: "USD".to_owned(),
    });
    state.dispatch(AppCommand::ToggleCity {
        tab: "Domestic (VN - VN)".to_owned(),
        card: card.id.clone(),
        city: "CT".to_owned(),
    });

    assert_eq!(
        state.edit_slot(),
        &EditSlot::Editing {
            record,
            field: FeeField::Fee,
        }
    );
    assert_eq!(state.scope().currency(&grid), Ok("USD"));
    let cities = &state.scope().tabs()[0].cards()[0].cities;
    assert_eq!(cities.contains("CT"), !card.cities.contains("CT"));
}

#[test]
fn add_card_requires_card_tab() {
    let mut state = AppState::with_ids(
        FeeScope::new(vec![Tab::flat("Flat", "VND")]),
        SequentialIds::new(),
    );
    let events = state.dispatch(AppCommand::AddCard {
        tab: "Flat".to_owned(),
    });
    assert!(matches!(events.as_slice(), [AppEvent::StatusUpdated(_)]));
    assert!(state.scope().tabs()[0].cards().is_empty());
}

#[test]
fn normalization_assigns_ids_only_where_missing() -> Result<()> {
    let mut ids = SequentialIds::new();
    let (scope, report) = demo_document()?.normalize(&mut ids)?;
    assert_eq!(report.record_ids_assigned as u64, ids.issued_records());

    let exported = ScopeDocument::from_scope(&scope);
    let mut again = SequentialIds::new();
    let (reloaded, report) = exported.normalize(&mut again)?;
    assert_eq!(report.record_ids_assigned, 0);
    assert_eq!(again.issued_records(), 0);
    assert_eq!(reloaded, scope);
    Ok(())
}
