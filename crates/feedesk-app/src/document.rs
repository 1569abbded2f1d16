// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::{Card, CardId, FeeRecord, FeeScope, IdSource, RecordId, Tab, TabBody};

/// Wire shape of the pricing payload, used for initial data and for "save".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeDocument {
    pub service_fees_by_delivery_scope: Vec<TabDocument>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabDocument {
    pub name_tab: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_country: Option<String>,
    #[serde(default)]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_fees: Option<Vec<FeeRecordDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<CardDocument>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CardId>,
    #[serde(default)]
    pub cities: Vec<String>,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub service_fees: Vec<FeeRecordDocument>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeeRecordDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub service_type: String,
    pub calc_fee_type: String,
    pub fee: f64,
    pub weight_from: f64,
    pub weight_to: f64,
    pub distance_from: f64,
    pub distance_to: f64,
    pub package_type: String,
    pub category: String,
    pub zone_from_code: String,
    pub zone_to_code: String,
    pub shipping_type: String,
    pub calc_condition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fees: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalizeReport {
    pub tabs: usize,
    pub cards: usize,
    pub records: usize,
    pub record_ids_assigned: usize,
    pub card_ids_assigned: usize,
}

struct Normalizer<'a, I: IdSource + ?Sized> {
    ids: &'a mut I,
    seen_records: BTreeSet<RecordId>,
    seen_cards: BTreeSet<CardId>,
    report: NormalizeReport,
}

impl<I: IdSource + ?Sized> Normalizer<'_, I> {
    fn record_id(&mut self, id: Option<RecordId>) -> RecordId {
        match id {
            Some(id) if !id.is_blank() && !self.seen_records.contains(&id) => {
                self.seen_records.insert(id.clone());
                id
            }
            previous => {
                if let Some(duplicate) = previous.filter(|id| !id.is_blank()) {
                    warn!(%duplicate, "record id repeats; assigning a fresh one");
                }
                let id = self.ids.next_record_id();
                self.seen_records.insert(id.clone());
                self.report.record_ids_assigned += 1;
                id
            }
        }
    }

    fn card_id(&mut self, id: Option<CardId>) -> CardId {
        match id {
            Some(id) if !id.is_blank() && !self.seen_cards.contains(&id) => {
                self.seen_cards.insert(id.clone());
                id
            }
            _ => {
                let id = self.ids.next_card_id();
                self.seen_cards.insert(id.clone());
                self.report.card_ids_assigned += 1;
                id
            }
        }
    }

    fn records(&mut self, records: Vec<FeeRecordDocument>) -> Vec<FeeRecord> {
        self.report.records += records.len();
        records
            .into_iter()
            .map(|record| FeeRecord {
                id: self.record_id(record.id),
                service_type: record.service_type,
                calc_fee_type: record.calc_fee_type,
                fee: record.fee,
                weight_from: record.weight_from,
                weight_to: record.weight_to,
                distance_from: record.distance_from,
                distance_to: record.distance_to,
                package_type: record.package_type,
                category: record.category,
                zone_from_code: record.zone_from_code,
                zone_to_code: record.zone_to_code,
                shipping_type: record.shipping_type,
                calc_condition: record.calc_condition,
                fees: record.fees.unwrap_or_default(),
            })
            .collect()
    }

    fn tab(&mut self, tab: TabDocument) -> Result<Tab> {
        let body = match (tab.cards, tab.service_fees) {
            (Some(_), Some(fees)) if !fees.is_empty() => {
                bail!(
                    "tab {:?} has both cards and serviceFees; keep one of them",
                    tab.name_tab
                );
            }
            (Some(cards), _) => {
                self.report.cards += cards.len();
                let cards = cards
                    .into_iter()
                    .map(|card| {
                        let currency = if card.currency.trim().is_empty() {
                            tab.currency.clone()
                        } else {
                            card.currency
                        };
                        Card {
                            id: self.card_id(card.id),
                            cities: card.cities.into_iter().collect(),
                            currency,
                            fees: self.records(card.service_fees),
                        }
                    })
                    .collect();
                TabBody::Cards(cards)
            }
            (None, fees) => TabBody::Fees(self.records(fees.unwrap_or_default())),
        };
        Ok(Tab {
            name: tab.name_tab,
            from_country: tab.from_country,
            to_country: tab.to_country,
            currency: tab.currency,
            body,
        })
    }
}

impl ScopeDocument {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("decode service fee document")
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("encode service fee document")
    }

    /// Builds the scope, giving every record and card without a usable id a
    /// generated one. Ids already present are kept; a repeated id counts as
    /// missing for the later occurrence.
    pub fn normalize<I: IdSource + ?Sized>(
        self,
        ids: &mut I,
    ) -> Result<(FeeScope, NormalizeReport)> {
        let mut names = BTreeSet::new();
        for tab in &self.service_fees_by_delivery_scope {
            if tab.name_tab.trim().is_empty() {
                bail!("tab names cannot be empty -- set nameTab on every tab");
            }
            if !names.insert(tab.name_tab.as_str()) {
                bail!(
                    "tab name {:?} appears more than once -- tab names must be unique",
                    tab.name_tab
                );
            }
        }

        let mut normalizer = Normalizer {
            ids,
            seen_records: BTreeSet::new(),
            seen_cards: BTreeSet::new(),
            report: NormalizeReport::default(),
        };
        let tabs = self
            .service_fees_by_delivery_scope
            .into_iter()
            .map(|tab| normalizer.tab(tab))
            .collect::<Result<Vec<_>>>()?;
        normalizer.report.tabs = tabs.len();
        let report = normalizer.report;
        debug!(?report, "normalized service fee document");
        Ok((FeeScope::new(tabs), report))
    }

    pub fn from_scope(scope: &FeeScope) -> Self {
        let export_records = |records: &[FeeRecord]| -> Vec<FeeRecordDocument> {
            records
                .iter()
                .map(|record| FeeRecordDocument {
                    id: Some(record.id.clone()),
                    service_type: record.service_type.clone(),
                    calc_fee_type: record.calc_fee_type.clone(),
                    fee: record.fee,
                    weight_from: record.weight_from,
                    weight_to: record.weight_to,
                    distance_from: record.distance_from,
                    distance_to: record.distance_to,
                    package_type: record.package_type.clone(),
                    category: record.category.clone(),
                    zone_from_code: record.zone_from_code.clone(),
                    zone_to_code: record.zone_to_code.clone(),
                    shipping_type: record.shipping_type.clone(),
                    calc_condition: record.calc_condition.clone(),
                    fees: (!record.fees.is_empty()).then(|| record.fees.clone()),
                })
                .collect()
        };

        let tabs = scope
            .tabs()
            .iter()
            .map(|tab| {
                let (service_fees, cards) = match &tab.body {
                    TabBody::Fees(fees) => (Some(export_records(fees)), None),
                    TabBody::Cards(cards) => (
                        None,
                        Some(
                            cards
                                .iter()
                                .map(|card| CardDocument {
                                    id: Some(card.id.clone()),
                                    cities: card.cities.iter().cloned().collect(),
                                    currency: card.currency.clone(),
                                    service_fees: export_records(&card.fees),
                                })
                                .collect(),
                        ),
                    ),
                };
                TabDocument {
                    name_tab: tab.name.clone(),
                    from_country: tab.from_country.clone(),
                    to_country: tab.to_country.clone(),
                    currency: tab.currency.clone(),
                    service_fees,
                    cards,
                }
            })
            .collect();

        Self {
            service_fees_by_delivery_scope: tabs,
        }
    }
}
