// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::debug;

use crate::{FeeField, FeeRecord, FieldKind, FieldValue, IdSource, RecordId};

/// The single cell open for inline editing, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditSlot {
    #[default]
    Idle,
    Editing {
        record: RecordId,
        field: FeeField,
    },
}

impl EditSlot {
    pub fn target(&self) -> Option<(&RecordId, FeeField)> {
        match self {
            Self::Idle => None,
            Self::Editing { record, field } => Some((record, *field)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// The slot was not open on this cell, so an earlier trigger already
    /// committed or the edit was cancelled.
    Ignored,
    /// The slot was closed but nothing changed: the record is gone or the value
    /// is not one of the field's options.
    Dropped,
    Applied {
        records: Vec<FeeRecord>,
        coerced: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GridState {
    slot: EditSlot,
}

impl GridState {
    pub fn slot(&self) -> &EditSlot {
        &self.slot
    }

    pub fn is_editing(&self, record: &RecordId, field: FeeField) -> bool {
        self.slot.target() == Some((record, field))
    }

    /// Opens `field` of `record` for editing. Whatever was open before is
    /// discarded without committing and handed back.
    pub fn enter_edit(&mut self, record: RecordId, field: FeeField) -> EditSlot {
        std::mem::replace(&mut self.slot, EditSlot::Editing { record, field })
    }

    pub fn cancel(&mut self) -> bool {
        let was_editing = self.slot != EditSlot::Idle;
        self.slot = EditSlot::Idle;
        was_editing
    }

    pub fn commit(
        &mut self,
        records: &[FeeRecord],
        record: &RecordId,
        field: FeeField,
        raw: &str,
    ) -> CommitOutcome {
        if !self.is_editing(record, field) {
            return CommitOutcome::Ignored;
        }
        self.slot = EditSlot::Idle;

        let Some(index) = records.iter().position(|candidate| &candidate.id == record) else {
            debug!(%record, field = field.key(), "commit dropped: record no longer present");
            return CommitOutcome::Dropped;
        };
        let Some((value, coerced)) = parse_field_value(field, raw) else {
            debug!(%record, field = field.key(), raw, "commit dropped: value not an option");
            return CommitOutcome::Dropped;
        };

        let mut next = records.to_vec();
        next[index] = records[index].with_value(field, value);
        CommitOutcome::Applied {
            records: next,
            coerced,
        }
    }
}

pub fn add_row<I: IdSource + ?Sized>(records: &[FeeRecord], ids: &mut I) -> Vec<FeeRecord> {
    let id = ids.next_record_id();
    let created = ids.now_millis();
    let mut next = records.to_vec();
    next.push(FeeRecord::blank(id, created));
    next
}

/// Sequence without `record`, or `None` when no record carries that id.
pub fn remove_row(records: &[FeeRecord], record: &RecordId) -> Option<Vec<FeeRecord>> {
    if !records.iter().any(|candidate| &candidate.id == record) {
        return None;
    }
    Some(
        records
            .iter()
            .filter(|candidate| &candidate.id != record)
            .cloned()
            .collect(),
    )
}

/// Parses raw editor input for `field`. The flag reports a number that could
/// not be read and was replaced with zero.
pub fn parse_field_value(field: FeeField, raw: &str) -> Option<(FieldValue, bool)> {
    match field.kind() {
        FieldKind::Number => {
            let (value, coerced) = coerce_number(raw);
            Some((FieldValue::Number(value), coerced))
        }
        FieldKind::Select(options) => options
            .contains(&raw)
            .then(|| (FieldValue::Text(raw.to_owned()), false)),
        FieldKind::Text => Some((FieldValue::Text(raw.to_owned()), false)),
    }
}

pub fn coerce_number(raw: &str) -> (f64, bool) {
    match parse_number_prefix(raw) {
        Some(value) if value.is_finite() => (value, false),
        _ => (0.0, true),
    }
}

/// Reads the longest leading decimal literal, ignoring leading whitespace and
/// any trailing text: `"12kg"` is 12, `"kg"` is nothing.
pub fn parse_number_prefix(raw: &str) -> Option<f64> {
    let input = raw.trim_start();
    let bytes = input.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac_end = end + 1;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        mantissa_digits += frac_end - end - 1;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    input[..end].parse::<f64>().ok()
}
