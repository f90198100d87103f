use std::{collections::BTreeMap, fmt};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    column,
    data::{Value, parse_integer, parse_naive_date, parse_rounded_decimal},
    error::RemapError,
    frame::NormalizedTable,
};

const DECIMAL_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ColumnClass {
    #[default]
    Plain,
    Date,
    Integer,
    Decimal,
}

impl ColumnClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnClass::Plain => "plain",
            ColumnClass::Date => "date",
            ColumnClass::Integer => "integer",
            ColumnClass::Decimal => "decimal",
        }
    }
}

impl fmt::Display for ColumnClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnClasses {
    classes: Vec<ColumnClass>,
}

impl ColumnClasses {
    pub fn resolve<S: AsRef<str>>(
        headers: &[String],
        date_names: &[S],
        integer_labels: &[S],
        decimal_labels: &[S],
    ) -> Result<Self, RemapError> {
        let mut classes = vec![ColumnClass::Plain; headers.len()];
        for name in date_names {
            for (position, header) in headers.iter().enumerate() {
                if header == name.as_ref() {
                    assign(&mut classes, position, ColumnClass::Date)?;
                }
            }
        }
        for label in integer_labels {
            assign(&mut classes, column::locate(label.as_ref())?, ColumnClass::Integer)?;
        }
        for label in decimal_labels {
            assign(&mut classes, column::locate(label.as_ref())?, ColumnClass::Decimal)?;
        }
        Ok(Self { classes })
    }

    pub fn class_at(&self, position: usize) -> ColumnClass {
        self.classes.get(position).copied().unwrap_or_default()
    }

    pub fn positions(&self, class: ColumnClass) -> impl Iterator<Item = usize> + '_ {
        self.classes
            .iter()
            .enumerate()
            .filter(move |(_, candidate)| **candidate == class)
            .map(|(position, _)| position)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

fn assign(
    classes: &mut Vec<ColumnClass>,
    position: usize,
    class: ColumnClass,
) -> Result<(), RemapError> {
    if position >= classes.len() {
        classes.resize(position + 1, ColumnClass::Plain);
    }
    match classes[position] {
        ColumnClass::Plain => {
            classes[position] = class;
            Ok(())
        }
        existing if existing == class => Ok(()),
        existing => Err(RemapError::ClassConflict {
            label: column::label_of(position),
            first: existing.as_str(),
            second: class.as_str(),
        }),
    }
}

/// Marks the target column with a fixed value on every row where the trigger is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRule {
    pub trigger: String,
    pub target: String,
    pub value: String,
}

impl StatusRule {
    pub fn apply(&self, table: &mut NormalizedTable) -> usize {
        let (Some(trigger), Some(target)) =
            (table.position_of(&self.trigger), table.position_of(&self.target))
        else {
            return 0;
        };
        let flagged = table
            .column(trigger)
            .map(|cells| cells.iter().map(Option::is_some).collect::<Vec<_>>())
            .unwrap_or_default();
        let Some(cells) = table.column_mut(target) else {
            return 0;
        };
        let mut written = 0;
        for (cell, set) in cells.iter_mut().zip(flagged) {
            if set {
                *cell = Some(Value::Text(self.value.clone()));
                written += 1;
            }
        }
        written
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoercionReport {
    pub nulled: BTreeMap<ColumnClass, usize>,
    pub status_rows: usize,
}

impl CoercionReport {
    pub fn total_nulled(&self) -> usize {
        self.nulled.values().sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Coercer {
    classes: ColumnClasses,
    status_rule: Option<StatusRule>,
}

impl Coercer {
    pub fn new(classes: ColumnClasses, status_rule: Option<StatusRule>) -> Self {
        Self {
            classes,
            status_rule,
        }
    }

    pub fn classes(&self) -> &ColumnClasses {
        &self.classes
    }

    pub fn status_rule(&self) -> Option<&StatusRule> {
        self.status_rule.as_ref()
    }

    pub fn apply(&self, table: &mut NormalizedTable) -> CoercionReport {
        let mut report = CoercionReport::default();
        for position in 0..table.width() {
            let class = self.classes.class_at(position);
            if class == ColumnClass::Plain {
                continue;
            }
            let Some(cells) = table.column_mut(position) else {
                continue;
            };
            let nulled = coerce_column(cells, class);
            if nulled > 0 {
                debug!(
                    "{} cell(s) in column {} could not be read as {class}",
                    nulled,
                    column::label_of(position)
                );
                *report.nulled.entry(class).or_insert(0) += nulled;
            }
        }
        if let Some(rule) = &self.status_rule {
            report.status_rows = rule.apply(table);
        }
        report
    }
}

fn coerce_column(cells: &mut [Option<Value>], class: ColumnClass) -> usize {
    let mut nulled = 0;
    for cell in cells.iter_mut() {
        let Some(current) = cell.take() else {
            continue;
        };
        let coerced = coerce_value(current, class);
        if coerced.is_none() {
            nulled += 1;
        }
        *cell = coerced;
    }
    nulled
}

fn coerce_value(value: Value, class: ColumnClass) -> Option<Value> {
    let text = match value {
        Value::Text(text) => text,
        already_typed => return Some(already_typed),
    };
    match class {
        ColumnClass::Plain => Some(Value::Text(text)),
        ColumnClass::Date => parse_naive_date(&text).ok().map(Value::Date),
        ColumnClass::Integer => parse_integer(&text).ok().map(Value::Integer),
        ColumnClass::Decimal => parse_rounded_decimal(&text, DECIMAL_SCALE)
            .ok()
            .map(Value::Decimal),
    }
}
