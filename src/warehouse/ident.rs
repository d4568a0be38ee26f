//! Restricted identifier tokens.
//!
//! Catalog, schema and table names are spliced into statement text, so they are
//! validated once here and carried as [`Ident`] from then on. Anything that is not
//! a plain `[A-Za-z_][A-Za-z0-9_]*` name never reaches a statement.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::MAX_IDENTIFIER_LEN;
use crate::error_handling::{ExportError, Result};

static IDENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is a valid regex")
});

/// A validated catalog, schema, table or column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    pub fn new(name: &str) -> Result<Self> {
        if name.len() > MAX_IDENTIFIER_LEN || !IDENT_PATTERN.is_match(name) {
            return Err(ExportError::InvalidIdentifier(name.to_string()));
        }
        Ok(Ident(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Ident {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        Ident::new(s)
    }
}

impl TryFrom<&str> for Ident {
    type Error = ExportError;

    fn try_from(value: &str) -> Result<Self> {
        Ident::new(value)
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Two-level catalog/schema address of a set of tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRef {
    pub catalog: Ident,
    pub schema: Ident,
}

impl SchemaRef {
    pub fn new(catalog: &str, schema: &str) -> Result<Self> {
        Ok(SchemaRef {
            catalog: Ident::new(catalog)?,
            schema: Ident::new(schema)?,
        })
    }
}

impl fmt::Display for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.catalog, self.schema)
    }
}
