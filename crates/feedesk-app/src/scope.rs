// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

use crate::{Card, CardId, FeeRecord, IdSource, Tab, TabBody, TabLayout};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("tab {0:?} already exists")]
    DuplicateTab(String),
    #[error("no tab named {0:?}")]
    UnknownTab(String),
    #[error("tab {tab:?} has no card {card}")]
    UnknownCard { tab: String, card: CardId },
    #[error("tab {0:?} is organized in cards; choose a card")]
    CardsOnly(String),
    #[error("tab {0:?} has no cards")]
    FlatOnly(String),
}

/// Address of one record sequence: a flat tab, or one card inside a card tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GridRef {
    pub tab: String,
    pub card: Option<CardId>,
}

impl GridRef {
    pub fn tab(name: impl Into<String>) -> Self {
        Self {
            tab: name.into(),
            card: None,
        }
    }

    pub fn card(name: impl Into<String>, card: CardId) -> Self {
        Self {
            tab: name.into(),
            card: Some(card),
        }
    }
}

/// Root of the editable tree. Every operation borrows the current scope and
/// returns a replacement; the original is never touched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeeScope {
    tabs: Vec<Tab>,
    active: Option<String>,
}

impl FeeScope {
    pub fn new(tabs: Vec<Tab>) -> Self {
        let active = tabs.first().map(|tab| tab.name.clone());
        Self { tabs, active }
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn into_tabs(self) -> Vec<Tab> {
        self.tabs
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.active.as_deref().and_then(|name| self.tab(name))
    }

    pub fn tab(&self, name: &str) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.name == name)
    }

    fn tab_index(&self, name: &str) -> Result<usize, ScopeError> {
        self.tabs
            .iter()
            .position(|tab| tab.name == name)
            .ok_or_else(|| ScopeError::UnknownTab(name.to_owned()))
    }

    pub fn set_active(&self, name: &str) -> Result<Self, ScopeError> {
        self.tab_index(name)?;
        Ok(Self {
            tabs: self.tabs.clone(),
            active: Some(name.to_owned()),
        })
    }

    /// Appends `tab` and activates it. Names are unique, so a clash leaves the
    /// scope as it was.
    pub fn add_tab(&self, tab: Tab) -> Result<Self, ScopeError> {
        if self.tab(&tab.name).is_some() {
            return Err(ScopeError::DuplicateTab(tab.name));
        }
        let active = Some(tab.name.clone());
        let mut tabs = self.tabs.clone();
        tabs.push(tab);
        Ok(Self { tabs, active })
    }

    pub fn remove_tab(&self, name: &str) -> Result<Self, ScopeError> {
        let index = self.tab_index(name)?;
        let mut tabs = self.tabs.clone();
        tabs.remove(index);
        let active = if self.active.as_deref() == Some(name) {
            tabs.first().map(|tab| tab.name.clone())
        } else {
            self.active.clone()
        };
        Ok(Self { tabs, active })
    }

    pub fn update_tab(&self, name: &str, tab: Tab) -> Result<Self, ScopeError> {
        let index = self.tab_index(name)?;
        if tab.name != name && self.tab(&tab.name).is_some() {
            return Err(ScopeError::DuplicateTab(tab.name));
        }
        let active = if self.active.as_deref() == Some(name) {
            Some(tab.name.clone())
        } else {
            self.active.clone()
        };
        let mut tabs = self.tabs.clone();
        tabs[index] = tab;
        Ok(Self { tabs, active })
    }

    fn existing_tab(&self, name: &str) -> Result<&Tab, ScopeError> {
        self.tab(name)
            .ok_or_else(|| ScopeError::UnknownTab(name.to_owned()))
    }

    fn existing_card<'a>(&'a self, tab: &'a Tab, card: &CardId) -> Result<&'a Card, ScopeError> {
        if tab.body.layout() == TabLayout::Flat {
            return Err(ScopeError::FlatOnly(tab.name.clone()));
        }
        tab.card(card).ok_or_else(|| ScopeError::UnknownCard {
            tab: tab.name.clone(),
            card: card.clone(),
        })
    }

    pub fn add_card<I: IdSource + ?Sized>(
        &self,
        name: &str,
        ids: &mut I,
    ) -> Result<(Self, CardId), ScopeError> {
        let tab = self.existing_tab(name)?;
        let TabBody::Cards(cards) = &tab.body else {
            return Err(ScopeError::FlatOnly(name.to_owned()));
        };
        let id = ids.next_card_id();
        let mut cards = cards.clone();
        cards.push(Card::empty(id.clone(), tab.currency.clone()));
        let next = self.update_tab(
            name,
            Tab {
                body: TabBody::Cards(cards),
                ..tab.clone()
            },
        )?;
        Ok((next, id))
    }

    pub fn remove_card(&self, name: &str, card: &CardId) -> Result<Self, ScopeError> {
        let tab = self.existing_tab(name)?;
        self.existing_card(tab, card)?;
        let cards = tab
            .cards()
            .iter()
            .filter(|candidate| &candidate.id != card)
            .cloned()
            .collect();
        self.update_tab(
            name,
            Tab {
                body: TabBody::Cards(cards),
                ..tab.clone()
            },
        )
    }

    pub fn update_card(&self, name: &str, card: Card) -> Result<Self, ScopeError> {
        let tab = self.existing_tab(name)?;
        self.existing_card(tab, &card.id)?;
        let cards = tab
            .cards()
            .iter()
            .map(|candidate| {
                if candidate.id == card.id {
                    card.clone()
                } else {
                    candidate.clone()
                }
            })
            .collect();
        self.update_tab(
            name,
            Tab {
                body: TabBody::Cards(cards),
                ..tab.clone()
            },
        )
    }

    pub fn records(&self, grid: &GridRef) -> Result<&[FeeRecord], ScopeError> {
        let tab = self.existing_tab(&grid.tab)?;
        match (&tab.body, &grid.card) {
            (TabBody::Fees(fees), None) => Ok(fees.as_slice()),
            (TabBody::Cards(_), Some(card)) => {
                Ok(self.existing_card(tab, card)?.fees.as_slice())
            }
            (TabBody::Cards(_), None) => Err(ScopeError::CardsOnly(tab.name.clone())),
            (TabBody::Fees(_), Some(_)) => Err(ScopeError::FlatOnly(tab.name.clone())),
        }
    }

    pub fn currency(&self, grid: &GridRef) -> Result<&str, ScopeError> {
        let tab = self.existing_tab(&grid.tab)?;
        match &grid.card {
            None if tab.body.layout() == TabLayout::Flat => Ok(tab.currency.as_str()),
            None => Err(ScopeError::CardsOnly(tab.name.clone())),
            Some(card) => Ok(self.existing_card(tab, card)?.currency.as_str()),
        }
    }

    /// Swaps the whole record sequence behind `grid`.
    pub fn replace_records(
        &self,
        grid: &GridRef,
        records: Vec<FeeRecord>,
    ) -> Result<Self, ScopeError> {
        self.records(grid)?;
        let tab = self.existing_tab(&grid.tab)?;
        match &grid.card {
            None => self.update_tab(
                &grid.tab,
                Tab {
                    body: TabBody::Fees(records),
                    ..tab.clone()
                },
            ),
            Some(card) => {
                let card = self.existing_card(tab, card)?;
                self.update_card(
                    &grid.tab,
                    Card {
                        fees: records,
                        ..card.clone()
                    },
                )
            }
        }
    }

    pub fn set_currency(&self, grid: &GridRef, currency: &str) -> Result<Self, ScopeError> {
        self.currency(grid)?;
        let tab = self.existing_tab(&grid.tab)?;
        match &grid.card {
            None => self.update_tab(
                &grid.tab,
                Tab {
                    currency: currency.to_owned(),
                    ..tab.clone()
                },
            ),
            Some(card) => {
                let card = self.existing_card(tab, card)?;
                self.update_card(
                    &grid.tab,
                    Card {
                        currency: currency.to_owned(),
                        ..card.clone()
                    },
                )
            }
        }
    }

    pub fn toggle_city(&self, name: &str, card: &CardId, city: &str) -> Result<Self, ScopeError> {
        let tab = self.existing_tab(name)?;
        let mut card = self.existing_card(tab, card)?.clone();
        if !card.cities.remove(city) {
            card.cities.insert(city.to_owned());
        }
        self.update_card(name, card)
    }
}

#[cfg(test)]
mod tests {
    use super::{FeeScope, GridRef, ScopeError};
    use crate::{Card, CardId, ClockIds, FeeRecord, RecordId, Tab, TabBody};

    fn card_tab() -> Tab {
        Tab {
            name: "International (VN - US)".to_owned(),
            from_country: Some("VN".to_owned()),
            to_country: Some("US".to_owned()),
            currency: "USD".to_owned(),
            body: TabBody::Cards(vec![Card::empty(CardId::new("c1"), "USD")]),
        }
    }

    #[test]
    fn new_scope_activates_first_tab() {
        let scope = FeeScope::new(vec![Tab::flat("A", "VND"), Tab::flat("B", "USD")]);
        assert_eq!(scope.active_name(), Some("A"));
        assert_eq!(FeeScope::new(Vec::new()).active_name(), None);
    }

    #[test]
    fn update_tab_rejects_rename_onto_existing_name() {
        let scope = FeeScope::new(vec![Tab::flat("A", "VND"), Tab::flat("B", "USD")]);
        let error = scope
            .update_tab("A", Tab::flat("B", "VND"))
            .expect_err("rename onto B should fail");
        assert_eq!(error, ScopeError::DuplicateTab("B".to_owned()));
    }

    #[test]
    fn update_tab_follows_active_rename() {
        let scope = FeeScope::new(vec![Tab::flat("A", "VND")]);
        let next = scope
            .update_tab("A", Tab::flat("A2", "VND"))
            .expect("rename active tab");
        assert_eq!(next.active_name(), Some("A2"));
    }

    #[test]
    fn card_tab_requires_a_card_address() {
        let scope = FeeScope::new(vec![card_tab()]);
        let tab_only = GridRef::tab("International (VN - US)");
        assert!(matches!(
            scope.records(&tab_only),
            Err(ScopeError::CardsOnly(_))
        ));
        let card = GridRef::card("International (VN - US)", CardId::new("c1"));
        assert_eq!(scope.records(&card).map(<[FeeRecord]>::len), Ok(0));
    }

    #[test]
    fn flat_tab_rejects_card_operations() {
        let scope = FeeScope::new(vec![Tab::flat("A", "VND")]);
        let mut ids = ClockIds::new();
        assert!(matches!(
            scope.add_card("A", &mut ids),
            Err(ScopeError::FlatOnly(_))
        ));
        assert!(matches!(
            scope.toggle_city("A", &CardId::new("c1"), "HN"),
            Err(ScopeError::FlatOnly(_))
        ));
    }

    #[test]
    fn new_card_inherits_tab_currency() {
        let scope = FeeScope::new(vec![card_tab()]);
        let mut ids = ClockIds::new();
        let (next, id) = scope
            .add_card("International (VN - US)", &mut ids)
            .expect("add card");
        let tab = next.tab("International (VN - US)").expect("tab present");
        assert_eq!(tab.cards().len(), 2);
        let card = tab.card(&id).expect("new card present");
        assert_eq!(card.currency, "USD");
        assert!(card.cities.is_empty());
        assert!(card.fees.is_empty());
    }

    #[test]
    fn toggle_city_adds_then_removes() {
        let scope = FeeScope::new(vec![card_tab()]);
        let name = "International (VN - US)";
        let card = CardId::new("c1");
        let added = scope.toggle_city(name, &card, "NYC").expect("add city");
        assert!(added.tab(name).and_then(|tab| tab.card(&card)).is_some_and(
            |card| card.cities.contains("NYC")
        ));
        let removed = added.toggle_city(name, &card, "NYC").expect("remove city");
        assert_eq!(removed, scope);
    }

    #[test]
    fn card_currency_is_independent_of_tab_currency() {
        let scope = FeeScope::new(vec![card_tab()]);
        let grid = GridRef::card("International (VN - US)", CardId::new("c1"));
        let next = scope.set_currency(&grid, "EUR").expect("set card currency");
        assert_eq!(next.currency(&grid), Ok("EUR"));
        assert_eq!(
            next.tab("International (VN - US)").map(|tab| tab.currency.as_str()),
            Some("USD")
        );
    }

    #[test]
    fn replace_records_in_card_keeps_siblings() {
        let mut tab = card_tab();
        if let TabBody::Cards(cards) = &mut tab.body {
            cards.push(Card::empty(CardId::new("c2"), "USD"));
        }
        let scope = FeeScope::new(vec![tab]);
        let grid = GridRef::card("International (VN - US)", CardId::new("c2"));
        let records = vec![FeeRecord::blank(RecordId::new("r1"), 0)];
        let next = scope
            .replace_records(&grid, records.clone())
            .expect("replace card records");
        assert_eq!(next.records(&grid), Ok(records.as_slice()));
        let first = GridRef::card("International (VN - US)", CardId::new("c1"));
        assert_eq!(next.records(&first).map(<[FeeRecord]>::len), Ok(0));
    }

    #[test]
    fn remove_unknown_card_is_an_error() {
        let scope = FeeScope::new(vec![card_tab()]);
        let error = scope
            .remove_card("International (VN - US)", &CardId::new("nope"))
            .expect_err("unknown card should fail");
        assert!(error.to_string().contains("has no card nope"));
    }
}
