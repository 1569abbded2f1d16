// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use feedesk_app::{
    CITY_OPTIONS, Card, CardId, FeeRecord, IdSource, RecordId, SERVICE_TYPE_OPTIONS,
    ScopeDocument, Tab, TabBody, route_tab_name,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use time::macros::datetime;

const CALC_FEE_TYPES: [&str; 4] = [
    "BY_WEIGHT",
    "BY_DISTANCE",
    "BY_WEIGHT_AND_ZONE",
    "CALCULATE_FEE_TYPE_UNSPECIFIED",
];
const PACKAGE_TYPES: [&str; 3] = ["STANDARD", "PREMIUM", "PACKAGE_TYPE_UNSPECIFIED"];
const CATEGORIES: [&str; 4] = ["DOCUMENTS", "GOODS", "ELECTRONICS", "FRAGILE"];
const SHIPPING_TYPES: [&str; 4] = ["AIR", "ROAD", "AIR_EXPRESS", "SEA"];
const CALC_CONDITIONS: [&str; 3] = ["WEIGHT_BASED", "DISTANCE_BASED", "WEIGHT_ZONE_BASED"];
const SURCHARGE_LABELS: [&str; 4] = ["base", "additional", "fuel_surcharge", "handling"];

/// Predictable ids for assertions: `fee-1`, `fee-2`, ... and `card-1`, ...
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    records: u64,
    cards: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issued_records(&self) -> u64 {
        self.records
    }
}

impl IdSource for SequentialIds {
    fn next_record_id(&mut self) -> RecordId {
        self.records += 1;
        RecordId::new(format!("fee-{}", self.records))
    }

    fn next_card_id(&mut self) -> CardId {
        self.cards += 1;
        CardId::new(format!("card-{}", self.cards))
    }

    fn now_millis(&mut self) -> i128 {
        fixture_millis()
    }
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator of plausible fee rows, tabs and cards.
#[derive(Debug, Clone)]
pub struct FeeFaker {
    rng: DeterministicRng,
}

impl FeeFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn record(&mut self, ids: &mut impl IdSource) -> FeeRecord {
        let weight_from = self.int_range(0, 5) as f64;
        let distance_from = (self.int_range(0, 20) * 10) as f64;
        let from = self.city();
        let to = self.city();
        let mut fees = BTreeMap::new();
        for _ in 0..self.rng.int_n(3) {
            let label = self.pick(&SURCHARGE_LABELS);
            fees.insert(label.to_owned(), (self.int_range(1, 50) * 1000) as f64);
        }

        FeeRecord {
            id: ids.next_record_id(),
            service_type: self.pick(&SERVICE_TYPE_OPTIONS).to_owned(),
            calc_fee_type: self.pick(&CALC_FEE_TYPES).to_owned(),
            fee: (self.int_range(5, 200) * 1000) as f64,
            weight_from,
            weight_to: weight_from + self.int_range(1, 20) as f64,
            distance_from,
            distance_to: distance_from + (self.int_range(1, 50) * 10) as f64,
            package_type: self.pick(&PACKAGE_TYPES).to_owned(),
            category: self.pick(&CATEGORIES).to_owned(),
            zone_from_code: from.to_owned(),
            zone_to_code: to.to_owned(),
            shipping_type: self.pick(&SHIPPING_TYPES).to_owned(),
            calc_condition: self.pick(&CALC_CONDITIONS).to_owned(),
            fees,
        }
    }

    pub fn records(&mut self, ids: &mut impl IdSource, count: usize) -> Vec<FeeRecord> {
        (0..count).map(|_| self.record(ids)).collect()
    }

    pub fn flat_tab(
        &mut self,
        ids: &mut impl IdSource,
        name: &str,
        currency: &str,
        rows: usize,
    ) -> Tab {
        Tab {
            body: TabBody::Fees(self.records(ids, rows)),
            ..Tab::flat(name, currency)
        }
    }

    /// Route tab with `cards` cards, each covering one or two cities.
    pub fn card_tab(
        &mut self,
        ids: &mut impl IdSource,
        from_country: &str,
        to_country: &str,
        cards: usize,
    ) -> Tab {
        let cards = (0..cards)
            .map(|_| {
                let mut card = Card::empty(ids.next_card_id(), "VND");
                for _ in 0..=self.rng.int_n(2) {
                    card.cities.insert(self.city().to_owned());
                }
                let rows = self.rng.int_n(4);
                card.fees = self.records(ids, rows);
                card
            })
            .collect();
        Tab {
            name: route_tab_name(from_country, to_country),
            from_country: Some(from_country.to_owned()),
            to_country: Some(to_country.to_owned()),
            currency: "VND".to_owned(),
            body: TabBody::Cards(cards),
        }
    }

    fn city(&mut self) -> &'static str {
        CITY_OPTIONS[self.rng.int_n(CITY_OPTIONS.len())].0
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }
}

/// The "Domestic Delivery" tab with its two well-known rows.
pub fn domestic_delivery_tab(ids: &mut impl IdSource) -> Tab {
    let express = FeeRecord {
        service_type: "EXPRESS".to_owned(),
        calc_fee_type: "BY_WEIGHT".to_owned(),
        fee: 50_000.0,
        weight_to: 5.0,
        distance_to: 50.0,
        package_type: "STANDARD".to_owned(),
        category: "DOCUMENTS".to_owned(),
        zone_from_code: "HN".to_owned(),
        zone_to_code: "HCM".to_owned(),
        shipping_type: "AIR".to_owned(),
        calc_condition: "WEIGHT_BASED".to_owned(),
        fees: BTreeMap::from([
            ("base".to_owned(), 30_000.0),
            ("additional".to_owned(), 20_000.0),
        ]),
        ..FeeRecord::blank(ids.next_record_id(), fixture_millis())
    };
    let standard = FeeRecord {
        service_type: "STANDARD".to_owned(),
        calc_fee_type: "BY_DISTANCE".to_owned(),
        fee: 35_000.0,
        weight_to: 10.0,
        distance_from: 50.0,
        distance_to: 200.0,
        package_type: "STANDARD".to_owned(),
        category: "GOODS".to_owned(),
        zone_from_code: "HN".to_owned(),
        zone_to_code: "DN".to_owned(),
        shipping_type: "ROAD".to_owned(),
        calc_condition: "DISTANCE_BASED".to_owned(),
        fees: BTreeMap::from([
            ("base".to_owned(), 25_000.0),
            ("additional".to_owned(), 10_000.0),
        ]),
        ..FeeRecord::blank(ids.next_record_id(), fixture_millis())
    };
    Tab {
        body: TabBody::Fees(vec![express, standard]),
        ..Tab::flat("Domestic Delivery", "VND")
    }
}

/// Writes `document` as JSON into a fresh temp dir.
pub fn temp_document_path(document: &ScopeDocument) -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("fees.json");
    std::fs::write(&path, document.to_json_pretty()?)
        .with_context(|| format!("write {}", path.display()))?;
    Ok((dir, path))
}

pub fn fixture_millis() -> i128 {
    datetime!(2026-02-19 12:34:56 UTC).unix_timestamp_nanos() / 1_000_000
}
