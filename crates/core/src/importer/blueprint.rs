//! Blueprint construction from scan results.

use crate::model::{Blueprint, BlueprintColumn, ScanResult};

/// Builds a [`Blueprint`] whose columns mirror a scan's guesses, in file order.
#[derive(Debug, Clone)]
pub struct BlueprintBuilder {
    name: String,
    description: String,
    skip_rows: u32,
    columns: Vec<BlueprintColumn>,
}

impl BlueprintBuilder {
    pub fn from_scan(scan: &ScanResult) -> Self {
        let columns = scan
            .inferred_columns()
            .iter()
            .map(|guess| BlueprintColumn::new(guess.name.clone(), guess.suggestion.clone()))
            .collect();

        Self {
            name: String::new(),
            description: String::new(),
            skip_rows: 0,
            columns,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn skip_rows(mut self, skip_rows: u32) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    pub fn build(self) -> Blueprint {
        Blueprint {
            name: self.name,
            description: self.description,
            skip_rows: self.skip_rows,
            columns: self.columns,
        }
    }
}
