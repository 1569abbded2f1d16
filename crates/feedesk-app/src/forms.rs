// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::{COUNTRY_OPTIONS, Tab, TabBody, route_tab_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabFormKind {
    Named,
    Route,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedTabInput {
    pub name: String,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTabInput {
    pub from_country: String,
    pub to_country: String,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabForm {
    Named(NamedTabInput),
    Route(RouteTabInput),
}

/// One field of the add-tab form, as the form widget walks through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabFormField {
    Name,
    FromCountry,
    ToCountry,
    Currency,
}

impl TabFormField {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "Tab Name",
            Self::FromCountry => "From Country",
            Self::ToCountry => "To Country",
            Self::Currency => "Currency",
        }
    }

    pub const fn is_choice(self) -> bool {
        matches!(self, Self::FromCountry | Self::ToCountry)
    }
}

impl TabForm {
    pub fn kind(&self) -> TabFormKind {
        match self {
            Self::Named(_) => TabFormKind::Named,
            Self::Route(_) => TabFormKind::Route,
        }
    }

    pub fn blank_for(kind: TabFormKind) -> Self {
        match kind {
            TabFormKind::Named => Self::Named(NamedTabInput {
                name: String::new(),
                currency: String::new(),
            }),
            TabFormKind::Route => Self::Route(RouteTabInput {
                from_country: String::new(),
                to_country: String::new(),
                currency: String::new(),
            }),
        }
    }

    pub fn fields(&self) -> &'static [TabFormField] {
        match self {
            Self::Named(_) => &[TabFormField::Name, TabFormField::Currency],
            Self::Route(_) => &[
                TabFormField::FromCountry,
                TabFormField::ToCountry,
                TabFormField::Currency,
            ],
        }
    }

    pub fn value(&self, field: TabFormField) -> &str {
        match (self, field) {
            (Self::Named(form), TabFormField::Name) => &form.name,
            (Self::Named(form), TabFormField::Currency) => &form.currency,
            (Self::Route(form), TabFormField::FromCountry) => &form.from_country,
            (Self::Route(form), TabFormField::ToCountry) => &form.to_country,
            (Self::Route(form), TabFormField::Currency) => &form.currency,
            _ => "",
        }
    }

    pub fn value_mut(&mut self, field: TabFormField) -> Option<&mut String> {
        match (self, field) {
            (Self::Named(form), TabFormField::Name) => Some(&mut form.name),
            (Self::Named(form), TabFormField::Currency) => Some(&mut form.currency),
            (Self::Route(form), TabFormField::FromCountry) => Some(&mut form.from_country),
            (Self::Route(form), TabFormField::ToCountry) => Some(&mut form.to_country),
            (Self::Route(form), TabFormField::Currency) => Some(&mut form.currency),
            _ => None,
        }
    }

    /// First required field left blank, for highlighting.
    pub fn missing_field(&self) -> Option<TabFormField> {
        self.fields()
            .iter()
            .copied()
            .find(|field| self.value(*field).trim().is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(field) = self.missing_field() {
            bail!(
                "{} is required -- fill it in and retry",
                field.label().to_ascii_lowercase()
            );
        }
        if let Self::Route(form) = self {
            for code in [&form.from_country, &form.to_country] {
                if !COUNTRY_OPTIONS.iter().any(|(option, _)| *option == code.as_str()) {
                    bail!("unknown country {code:?} -- choose one of the listed countries");
                }
            }
        }
        Ok(())
    }

    /// Key the new tab will be stored under.
    pub fn tab_name(&self) -> String {
        match self {
            Self::Named(form) => form.name.trim().to_owned(),
            Self::Route(form) => route_tab_name(&form.from_country, &form.to_country),
        }
    }

    pub fn into_tab(self) -> Result<Tab> {
        self.validate()?;
        let name = self.tab_name();
        let tab = match self {
            Self::Named(form) => Tab {
                name,
                from_country: None,
                to_country: None,
                currency: form.currency.trim().to_owned(),
                body: TabBody::Fees(Vec::new()),
            },
            Self::Route(form) => Tab {
                name,
                from_country: Some(form.from_country),
                to_country: Some(form.to_country),
                currency: form.currency.trim().to_owned(),
                body: TabBody::Cards(Vec::new()),
            },
        };
        Ok(tab)
    }
}
