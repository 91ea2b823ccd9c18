//! Table metadata consumed by routing.
//!
//! Models are read-only once registered and shared across sessions through
//! the [`Catalog`].

use crate::{
    error::{InternalError, RouteError},
    sql::TableRef,
};
use std::{collections::BTreeMap, sync::Arc};

///
/// FieldModel
///
/// One logical field and the physical column that stores it.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldModel {
    pub name: String,
    pub column: String,
}

///
/// PartitionKey
///
/// Logical field plus the identifier of the partition function applied to
/// it. The function itself is opaque here and interpreted by the
/// `ShardResolver`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PartitionKey {
    pub field: String,
    pub function: String,
}

///
/// TableModel
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableModel {
    pub name: String,
    pub database: String,
    pub table: String,
    pub fields: Vec<FieldModel>,
    pub partition_keys: Vec<PartitionKey>,
}

impl TableModel {
    /// Model whose physical table shares the logical name.
    #[must_use]
    pub fn new(name: impl Into<String>, database: impl Into<String>) -> Self {
        let name = name.into();

        Self {
            table: name.clone(),
            name,
            database: database.into(),
            fields: Vec::new(),
            partition_keys: Vec::new(),
        }
    }

    #[must_use]
    pub fn physical_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.fields.push(FieldModel {
            name: name.into(),
            column: column.into(),
        });
        self
    }

    #[must_use]
    pub fn partition_key(mut self, field: impl Into<String>, function: impl Into<String>) -> Self {
        self.partition_keys.push(PartitionKey {
            field: field.into(),
            function: function.into(),
        });
        self
    }

    #[must_use]
    pub const fn is_partitioned(&self) -> bool {
        !self.partition_keys.is_empty()
    }

    #[must_use]
    pub fn column_of(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == field)
            .map(|f| f.column.as_str())
    }

    /// Physical column of every partition key, upper-cased for
    /// case-insensitive matching, keyed back to the logical field.
    ///
    /// A partition field without a column is a metadata defect and fails
    /// before any routing happens.
    pub fn partition_columns(&self) -> Result<PartitionColumns, InternalError> {
        let mut columns = BTreeMap::new();
        for key in &self.partition_keys {
            let column = self.column_of(&key.field).ok_or_else(|| {
                InternalError::route(RouteError::MetadataInconsistency {
                    table: self.name.clone(),
                    field: key.field.clone(),
                })
            })?;
            columns.insert(column.to_ascii_uppercase(), key.field.clone());
        }

        Ok(PartitionColumns(columns))
    }
}

///
/// PartitionColumns
///
/// Upper-cased physical column → logical partition field.
///

#[derive(Clone, Debug, Default)]
pub struct PartitionColumns(BTreeMap<String, String>);

impl PartitionColumns {
    #[must_use]
    pub fn field_for(&self, column: &str) -> Option<&str> {
        self.0
            .get(&column.to_ascii_uppercase())
            .map(String::as_str)
    }
}

///
/// Catalog
///
/// Registry of table models, keyed case-insensitively by logical name.
///

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    tables: BTreeMap<String, Arc<TableModel>>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a table model.
    pub fn register(&mut self, model: TableModel) -> Arc<TableModel> {
        let model = Arc::new(model);
        self.tables
            .insert(model.name.to_ascii_uppercase(), Arc::clone(&model));

        model
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<TableModel>> {
        self.tables.get(&name.to_ascii_uppercase())
    }

    #[must_use]
    pub fn resolve(&self, table: &TableRef) -> Option<&Arc<TableModel>> {
        self.get(&table.name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<TableModel>> {
        self.tables.values()
    }
}

///
/// TESTS
///
