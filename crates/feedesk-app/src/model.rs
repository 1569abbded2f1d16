// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::ids::*;

pub const SERVICE_TYPE_OPTIONS: [&str; 4] = [
    "SERVICE_TYPE_UNSPECIFIED",
    "EXPRESS",
    "STANDARD",
    "EXPRESS_INTERNATIONAL",
];

pub const CITY_OPTIONS: [(&str, &str); 11] = [
    ("HN", "Hanoi"),
    ("HCM", "Ho Chi Minh"),
    ("DN", "Da Nang"),
    ("HP", "Hai Phong"),
    ("CT", "Can Tho"),
    ("NYC", "New York"),
    ("LA", "Los Angeles"),
    ("CHI", "Chicago"),
    ("BJ", "Beijing"),
    ("SH", "Shanghai"),
    ("GZ", "Guangzhou"),
];

pub const COUNTRY_OPTIONS: [(&str, &str); 3] = [
    ("VN", "Vietnam"),
    ("US", "United States"),
    ("CN", "China"),
];

pub const NEW_SERVICE_TYPE: &str = "NEW_SERVICE";

pub fn city_label(code: &str) -> Option<&'static str> {
    CITY_OPTIONS
        .iter()
        .find(|(candidate, _)| *candidate == code)
        .map(|(_, label)| *label)
}

pub fn country_label(code: &str) -> Option<&'static str> {
    COUNTRY_OPTIONS
        .iter()
        .find(|(candidate, _)| *candidate == code)
        .map(|(_, label)| *label)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRecord {
    pub id: RecordId,
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
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fees: BTreeMap<String, f64>,
}

impl FeeRecord {
    /// The row appended by "add row". The zone-from placeholder keeps fresh rows
    /// visually distinct until someone fills the zone codes in.
    pub fn blank(id: RecordId, created_millis: i128) -> Self {
        Self {
            id,
            service_type: NEW_SERVICE_TYPE.to_owned(),
            calc_fee_type: "CALCULATE_FEE_TYPE_UNSPECIFIED".to_owned(),
            fee: 0.0,
            weight_from: 0.0,
            weight_to: 0.0,
            distance_from: 0.0,
            distance_to: 0.0,
            package_type: "PACKAGE_TYPE_UNSPECIFIED".to_owned(),
            category: "CATEGORY_OF_SHIPMENT_UNSPECIFIED".to_owned(),
            zone_from_code: format!("temp_{created_millis}"),
            zone_to_code: String::new(),
            shipping_type: "SHIPPING_TYPE_UNSPECIFIED".to_owned(),
            calc_condition: "CALC_CONDITION_UNSPECIFIED".to_owned(),
            fees: BTreeMap::new(),
        }
    }

    pub fn number(&self, field: FeeField) -> Option<f64> {
        match field {
            FeeField::Fee => Some(self.fee),
            FeeField::WeightFrom => Some(self.weight_from),
            FeeField::WeightTo => Some(self.weight_to),
            FeeField::DistanceFrom => Some(self.distance_from),
            FeeField::DistanceTo => Some(self.distance_to),
            _ => None,
        }
    }

    pub fn text(&self, field: FeeField) -> Option<&str> {
        let value = match field {
            FeeField::ServiceType => &self.service_type,
            FeeField::CalcFeeType => &self.calc_fee_type,
            FeeField::PackageType => &self.package_type,
            FeeField::Category => &self.category,
            FeeField::ZoneFromCode => &self.zone_from_code,
            FeeField::ZoneToCode => &self.zone_to_code,
            FeeField::ShippingType => &self.shipping_type,
            FeeField::CalcCondition => &self.calc_condition,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Raw value as an inline editor would prefill it.
    pub fn raw_value(&self, field: FeeField) -> String {
        match (self.number(field), self.text(field)) {
            (Some(number), _) => number.to_string(),
            (None, Some(text)) => text.to_owned(),
            (None, None) => String::new(),
        }
    }

    /// Copy of this record with one field replaced. A value whose shape does
    /// not fit the field leaves the copy unchanged.
    pub fn with_value(&self, field: FeeField, value: FieldValue) -> Self {
        let mut next = self.clone();
        match (field, value) {
            (FeeField::Fee, FieldValue::Number(v)) => next.fee = v,
            (FeeField::WeightFrom, FieldValue::Number(v)) => next.weight_from = v,
            (FeeField::WeightTo, FieldValue::Number(v)) => next.weight_to = v,
            (FeeField::DistanceFrom, FieldValue::Number(v)) => next.distance_from = v,
            (FeeField::DistanceTo, FieldValue::Number(v)) => next.distance_to = v,
            (FeeField::ServiceType, FieldValue::Text(v)) => next.service_type = v,
            (FeeField::CalcFeeType, FieldValue::Text(v)) => next.calc_fee_type = v,
            (FeeField::PackageType, FieldValue::Text(v)) => next.package_type = v,
            (FeeField::Category, FieldValue::Text(v)) => next.category = v,
            (FeeField::ZoneFromCode, FieldValue::Text(v)) => next.zone_from_code = v,
            (FeeField::ZoneToCode, FieldValue::Text(v)) => next.zone_to_code = v,
            (FeeField::ShippingType, FieldValue::Text(v)) => next.shipping_type = v,
            (FeeField::CalcCondition, FieldValue::Text(v)) => next.calc_condition = v,
            _ => {}
        }
        next
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Select(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeeField {
    ServiceType,
    CalcFeeType,
    Fee,
    WeightFrom,
    WeightTo,
    DistanceFrom,
    DistanceTo,
    PackageType,
    Category,
    ZoneFromCode,
    ZoneToCode,
    ShippingType,
    CalcCondition,
}

impl FeeField {
    pub const ALL: [Self; 13] = [
        Self::ServiceType,
        Self::CalcFeeType,
        Self::Fee,
        Self::WeightFrom,
        Self::WeightTo,
        Self::DistanceFrom,
        Self::DistanceTo,
        Self::PackageType,
        Self::Category,
        Self::ZoneFromCode,
        Self::ZoneToCode,
        Self::ShippingType,
        Self::CalcCondition,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Self::ServiceType => "serviceType",
            Self::CalcFeeType => "calcFeeType",
            Self::Fee => "fee",
            Self::WeightFrom => "weightFrom",
            Self::WeightTo => "weightTo",
            Self::DistanceFrom => "distanceFrom",
            Self::DistanceTo => "distanceTo",
            Self::PackageType => "packageType",
            Self::Category => "category",
            Self::ZoneFromCode => "zoneFromCode",
            Self::ZoneToCode => "zoneToCode",
            Self::ShippingType => "shippingType",
            Self::CalcCondition => "calcCondition",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ServiceType => "Service Type",
            Self::CalcFeeType => "Calc Fee Type",
            Self::Fee => "Fee",
            Self::WeightFrom => "Weight From (kg)",
            Self::WeightTo => "Weight To (kg)",
            Self::DistanceFrom => "Distance From (km)",
            Self::DistanceTo => "Distance To (km)",
            Self::PackageType => "Package Type",
            Self::Category => "Category",
            Self::ZoneFromCode => "Zone From",
            Self::ZoneToCode => "Zone To",
            Self::ShippingType => "Shipping Type",
            Self::CalcCondition => "Calc Condition",
        }
    }

    pub const fn kind(self) -> FieldKind {
        match self {
            Self::ServiceType => FieldKind::Select(&SERVICE_TYPE_OPTIONS),
            Self::Fee
            | Self::WeightFrom
            | Self::WeightTo
            | Self::DistanceFrom
            | Self::DistanceTo => FieldKind::Number,
            Self::CalcFeeType
            | Self::PackageType
            | Self::Category
            | Self::ZoneFromCode
            | Self::ZoneToCode
            | Self::ShippingType
            | Self::CalcCondition => FieldKind::Text,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub cities: BTreeSet<String>,
    pub currency: String,
    pub fees: Vec<FeeRecord>,
}

impl Card {
    pub fn empty(id: CardId, currency: impl Into<String>) -> Self {
        Self {
            id,
            cities: BTreeSet::new(),
            currency: currency.into(),
            fees: Vec::new(),
        }
    }

    pub fn cities_label(&self) -> String {
        if self.cities.is_empty() {
            return "no cities".to_owned();
        }
        self.cities
            .iter()
            .map(|code| city_label(code).unwrap_or(code.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabLayout {
    Flat,
    Cards,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TabBody {
    Fees(Vec<FeeRecord>),
    Cards(Vec<Card>),
}

impl TabBody {
    pub const fn layout(&self) -> TabLayout {
        match self {
            Self::Fees(_) => TabLayout::Flat,
            Self::Cards(_) => TabLayout::Cards,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub name: String,
    pub from_country: Option<String>,
    pub to_country: Option<String>,
    pub currency: String,
    pub body: TabBody,
}

impl Tab {
    pub fn flat(name: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            from_country: None,
            to_country: None,
            currency: currency.into(),
            body: TabBody::Fees(Vec::new()),
        }
    }

    pub fn cards(&self) -> &[Card] {
        match &self.body {
            TabBody::Cards(cards) => cards,
            TabBody::Fees(_) => &[],
        }
    }

    pub fn card(&self, id: &CardId) -> Option<&Card> {
        self.cards().iter().find(|card| &card.id == id)
    }

    pub fn record_count(&self) -> usize {
        match &self.body {
            TabBody::Fees(fees) => fees.len(),
            TabBody::Cards(cards) => cards.iter().map(|card| card.fees.len()).sum(),
        }
    }
}

/// Label for a tab keyed by its country pair.
pub fn route_tab_name(from_country: &str, to_country: &str) -> String {
    let scope = if from_country == to_country {
        "Domestic"
    } else {
        "International"
    };
    format!("{scope} ({from_country} - {to_country})")
}
