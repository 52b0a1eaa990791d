//! Core type definitions for LowlaDB.

use crate::error::ValidationError;
use std::fmt;
use std::str::FromStr;

/// Identifies a collection as `<database>.<collection>`.
///
/// Both parts are opaque non-empty strings. The collection part may itself
/// contain dots; the database part may not.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Namespace {
    database: String,
    collection: String,
}

impl Namespace {
    /// Creates a namespace from its two parts.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidNamespace`] if either part is empty
    /// or the database name contains a dot.
    pub fn new(
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let database = database.into();
        let collection = collection.into();
        if database.is_empty() || collection.is_empty() || database.contains('.') {
            return Err(ValidationError::InvalidNamespace {
                namespace: format!("{database}.{collection}"),
            });
        }
        Ok(Self {
            database,
            collection,
        })
    }

    /// Parses `db.coll`, splitting at the first dot.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidNamespace`] when there is no dot or
    /// a part is empty.
    pub fn parse(namespace: &str) -> Result<Self, ValidationError> {
        match namespace.split_once('.') {
            Some((database, collection)) => Self::new(database, collection),
            None => Err(ValidationError::InvalidNamespace {
                namespace: namespace.to_string(),
            }),
        }
    }

    /// Returns the database name.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns the collection name.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

impl FromStr for Namespace {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_at_first_dot() {
        let ns = Namespace::parse("dbName.some.coll").unwrap();
        assert_eq!(ns.database(), "dbName");
        assert_eq!(ns.collection(), "some.coll");
        assert_eq!(ns.to_string(), "dbName.some.coll");
    }

    #[test]
    fn empty_parts_rejected() {
        assert!(Namespace::parse("nodot").is_err());
        assert!(Namespace::parse(".coll").is_err());
        assert!(Namespace::parse("db.").is_err());
        assert!(Namespace::new("a.b", "c").is_err());
    }

    #[test]
    fn equality_is_exact() {
        let a: Namespace = "db.Coll".parse().unwrap();
        let b: Namespace = "db.coll".parse().unwrap();
        assert_ne!(a, b);
        assert_eq!(a, Namespace::new("db", "Coll").unwrap());
    }
}
