//! Table observer for pretty-printing counter contents.
//!
//! This module provides [`TableObserver`], which renders every entry of a
//! [`Counter`] as a row of a formatted ASCII table using the `tabled` crate:
//! one column per dimension, rendered with the counter's key text rules,
//! followed by the metric column.
//!
//! # Feature Flag
//!
//! This module requires the `table` feature:
//!
//! ```toml
//! [dependencies]
//! dimcount = { version = "0.1", features = ["table"] }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use dimcount::{Counter, CounterConfig};
//! use dimcount::observers::table::{TableObserver, TableStyle};
//!
//! let counter = Counter::new(&["host", "code"], &["s", "i"], "requests", CounterConfig::default())?;
//! counter.increment(1000, ("web-1", 200))?;
//! counter.increment(5, ("web-1", 500))?;
//!
//! let observer = TableObserver::new().with_style(TableStyle::Rounded).sorted(true);
//! println!("{}", observer.render(&counter)?);
//! // ╭───────┬──────┬──────────╮
//! // │ host  │ code │ requests │
//! // ├───────┼──────┼──────────┤
//! // │ web-1 │ 200  │ 1000     │
//! // │ web-1 │ 500  │ 5        │
//! // ╰───────┴──────┴──────────╯
//! ```

use std::ops::ControlFlow;

use tabled::{builder::Builder, settings::Style, Table};

use crate::counter::Counter;
use crate::error::Result;

/// Available table styles for rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableStyle {
    /// ASCII table with simple characters: +, -, |
    Ascii,
    /// Modern rounded corners (default)
    #[default]
    Rounded,
    /// Sharp corners with box-drawing characters
    Sharp,
    /// Modern style with clean lines
    Modern,
    /// GitHub-flavored Markdown table
    Markdown,
    /// No borders, just spacing
    Blank,
}

/// Configuration for the table observer.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// The style to use for rendering.
    pub style: TableStyle,
    /// Whether to show the header row with field names.
    pub show_header: bool,
    /// Custom title printed above the table (optional).
    pub title: Option<String>,
    /// Whether to sort rows by their rendered dimension values.
    pub sorted: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            style: TableStyle::default(),
            show_header: true,
            title: None,
            sorted: false,
        }
    }
}

/// An observer that renders a counter as a formatted ASCII table.
#[derive(Debug, Clone, Default)]
pub struct TableObserver {
    config: TableConfig,
}

impl TableObserver {
    /// Creates a new table observer with default settings.
    ///
    /// Default style is [`TableStyle::Rounded`], with a header and rows in
    /// table order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new table observer with the specified configuration.
    pub fn with_config(config: TableConfig) -> Self {
        Self { config }
    }

    /// Sets the table style.
    pub fn with_style(mut self, style: TableStyle) -> Self {
        self.config.style = style;
        self
    }

    /// Sets whether to show the header row.
    pub fn with_header(mut self, show: bool) -> Self {
        self.config.show_header = show;
        self
    }

    /// Sets an optional title for the table.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    /// Sorts rows by rendered dimension values, for stable output.
    pub fn sorted(mut self, enabled: bool) -> Self {
        self.config.sorted = enabled;
        self
    }

    /// Applies the configured style to a table.
    fn apply_style(&self, table: &mut Table) {
        match self.config.style {
            TableStyle::Ascii => {
                table.with(Style::ascii());
            }
            TableStyle::Rounded => {
                table.with(Style::rounded());
            }
            TableStyle::Sharp => {
                table.with(Style::sharp());
            }
            TableStyle::Modern => {
                table.with(Style::modern());
            }
            TableStyle::Markdown => {
                table.with(Style::markdown());
            }
            TableStyle::Blank => {
                table.with(Style::blank());
            }
        }
    }

    /// Collects one rendered record per entry: dimensions, then the count.
    fn records(&self, counter: &Counter) -> Result<Vec<Vec<String>>> {
        let codec = counter.codec();
        let mut records = Vec::with_capacity(counter.table().len());
        let mut failure = None;

        counter.table().range(|key, value| {
            match codec.render_values(key) {
                Ok(mut record) => {
                    record.push(value.to_string());
                    records.push(record);
                    ControlFlow::Continue(())
                }
                Err(err) => {
                    failure = Some(err);
                    ControlFlow::Break(())
                }
            }
        });

        match failure {
            Some(err) => Err(err),
            None => Ok(records),
        }
    }

    /// Renders the counter as a formatted table string.
    ///
    /// # Errors
    ///
    /// Fails if a stored key cannot be decoded.
    pub fn render(&self, counter: &Counter) -> Result<String> {
        let mut records = self.records(counter)?;
        if self.config.sorted {
            records.sort();
        }

        let mut builder = Builder::default();
        if self.config.show_header {
            builder.push_record(counter.schema().fields().iter().map(|f| f.name().to_string()));
        }
        for record in records {
            builder.push_record(record);
        }

        let mut table = builder.build();
        self.apply_style(&mut table);

        Ok(if let Some(ref title) = self.config.title {
            format!("{}\n{}", title, table)
        } else {
            table.to_string()
        })
    }
}
