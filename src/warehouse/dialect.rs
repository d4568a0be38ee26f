//! Statement templates per warehouse dialect.
//!
//! Every statement the engine issues is built here from [`Ident`]s and escaped
//! string literals; no other module formats SQL around caller input.

use super::ident::{Ident, SchemaRef};
use crate::config::LIKE_ESCAPE_CHAR;

/// SQL dialect spoken by a warehouse backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Databricks SQL (Spark SQL): backtick identifiers, backslash-escaped literals,
    /// three-level `catalog.schema.table` names.
    Databricks,
    /// SQLite: double-quoted identifiers, doubled-quote literals. The catalog is
    /// ignored and the schema addresses an attached database (`main` by default).
    Sqlite,
}

impl Dialect {
    pub fn quote_ident(&self, ident: &Ident) -> String {
        match self {
            Dialect::Databricks => format!("`{}`", ident),
            Dialect::Sqlite => format!("\"{}\"", ident),
        }
    }

    /// Quotes `value` as a string literal.
    pub fn string_literal(&self, value: &str) -> String {
        match self {
            Dialect::Databricks => {
                format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
            }
            Dialect::Sqlite => format!("'{}'", value.replace('\'', "''")),
        }
    }

    fn schema_path(&self, schema: &SchemaRef) -> String {
        match self {
            Dialect::Databricks => format!(
                "{}.{}",
                self.quote_ident(&schema.catalog),
                self.quote_ident(&schema.schema)
            ),
            Dialect::Sqlite => self.quote_ident(&schema.schema),
        }
    }

    pub fn qualified_table(&self, schema: &SchemaRef, table: &Ident) -> String {
        format!("{}.{}", self.schema_path(schema), self.quote_ident(table))
    }

    pub fn ping_sql(&self) -> &'static str {
        "SELECT 1"
    }

    pub fn list_tables_sql(&self, schema: &SchemaRef) -> String {
        match self {
            Dialect::Databricks => format!("SHOW TABLES IN {}", self.schema_path(schema)),
            Dialect::Sqlite => format!(
                "SELECT name FROM {}.sqlite_master WHERE type = 'table'",
                self.schema_path(schema)
            ),
        }
    }

    /// Column of the listing result holding the table name.
    pub fn table_name_column(&self) -> &'static str {
        match self {
            Dialect::Databricks => "tableName",
            Dialect::Sqlite => "name",
        }
    }

    pub fn table_exists_sql(&self, schema: &SchemaRef, table: &Ident) -> String {
        match self {
            // information_schema stores unquoted names lower-cased
            Dialect::Databricks => format!(
                "SELECT table_name FROM {}.information_schema.tables \
                 WHERE table_schema = {} AND table_name = {}",
                self.quote_ident(&schema.catalog),
                self.string_literal(&schema.schema.as_str().to_ascii_lowercase()),
                self.string_literal(&table.as_str().to_ascii_lowercase())
            ),
            Dialect::Sqlite => format!(
                "SELECT name FROM {}.sqlite_master WHERE type = 'table' AND name = {}",
                self.schema_path(schema),
                self.string_literal(table.as_str())
            ),
        }
    }

    pub fn select_all_sql(&self, schema: &SchemaRef, table: &Ident) -> String {
        format!("SELECT * FROM {}", self.qualified_table(schema, table))
    }

    /// `SELECT <columns> FROM <table> WHERE <predicate>`.
    ///
    /// `columns` and `predicate` are fixed names and fragments built by this type,
    /// never caller input.
    pub fn select_where_sql(
        &self,
        schema: &SchemaRef,
        table: &Ident,
        columns: &[&str],
        predicate: &str,
    ) -> String {
        format!(
            "SELECT {} FROM {} WHERE {}",
            columns.join(", "),
            self.qualified_table(schema, table),
            predicate
        )
    }

    /// `column = '<value>'`
    pub fn equals_predicate(&self, column: &str, value: &str) -> String {
        format!("{} = {}", column, self.string_literal(value))
    }

    /// `column LIKE '<prefix>.%' ESCAPE '!'` with LIKE wildcards in `prefix` escaped.
    pub fn like_prefix_predicate(&self, column: &str, prefix: &str) -> String {
        let pattern = format!("{}.%", escape_like(prefix));
        format!(
            "{} LIKE {} ESCAPE {}",
            column,
            self.string_literal(&pattern),
            self.string_literal(&LIKE_ESCAPE_CHAR.to_string())
        )
    }
}

/// Escapes `%`, `_` and the escape character itself so `value` matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == '%' || ch == '_' || ch == LIKE_ESCAPE_CHAR {
            escaped.push(LIKE_ESCAPE_CHAR);
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SchemaRef {
        SchemaRef::new("cdsi", "cbioportal").expect("valid schema ref")
    }

    fn ident(name: &str) -> Ident {
        Ident::new(name).expect("valid identifier")
    }

    #[test]
    fn test_databricks_select_is_three_level_and_backticked() {
        let sql = Dialect::Databricks.select_all_sql(&schema(), &ident("data_sv"));
        assert_eq!(sql, "SELECT * FROM `cdsi`.`cbioportal`.`data_sv`");
    }

    #[test]
    fn test_sqlite_select_ignores_catalog() {
        let sql = Dialect::Sqlite.select_all_sql(&schema(), &ident("data_sv"));
        assert_eq!(sql, "SELECT * FROM \"cbioportal\".\"data_sv\"");
    }

    #[test]
    fn test_list_tables_sql() {
        assert_eq!(
            Dialect::Databricks.list_tables_sql(&schema()),
            "SHOW TABLES IN `cdsi`.`cbioportal`"
        );
        assert_eq!(
            Dialect::Sqlite.list_tables_sql(&schema()),
            "SELECT name FROM \"cbioportal\".sqlite_master WHERE type = 'table'"
        );
    }

    #[test]
    fn test_databricks_table_exists_uses_information_schema() {
        let sql = Dialect::Databricks.table_exists_sql(&schema(), &ident("Data_CNA"));
        assert_eq!(
            sql,
            "SELECT table_name FROM `cdsi`.information_schema.tables \
             WHERE table_schema = 'cbioportal' AND table_name = 'data_cna'"
        );
    }

    #[test]
    fn test_string_literal_escaping() {
        assert_eq!(Dialect::Sqlite.string_literal("it's"), "'it''s'");
        assert_eq!(Dialect::Databricks.string_literal("it's"), "'it\\'s'");
        assert_eq!(Dialect::Databricks.string_literal("a\\b"), "'a\\\\b'");
    }

    #[test]
    fn test_like_prefix_escapes_wildcards() {
        let sql = Dialect::Sqlite.like_prefix_predicate("data_filename", "data_clinical_sample");
        assert_eq!(
            sql,
            "data_filename LIKE 'data!_clinical!_sample.%' ESCAPE '!'"
        );
    }

    #[test]
    fn test_select_where_sql() {
        let predicate = Dialect::Databricks.equals_predicate("IGO_REQUEST_ID", "12345_C");
        let sql = Dialect::Databricks.select_where_sql(
            &schema(),
            &ident("smile_request"),
            &["REQUEST_JSON"],
            &predicate,
        );
        assert_eq!(
            sql,
            "SELECT REQUEST_JSON FROM `cdsi`.`cbioportal`.`smile_request` \
             WHERE IGO_REQUEST_ID = '12345_C'"
        );
    }

    #[test]
    fn test_equals_predicate_escapes_value() {
        assert_eq!(
            Dialect::Sqlite.equals_predicate("IGO_SAMPLE_NAME", "x' OR '1'='1"),
            "IGO_SAMPLE_NAME = 'x'' OR ''1''=''1'"
        );
    }

    #[test]
    fn test_escape_like_escapes_escape_char() {
        assert_eq!(escape_like("a!b%c_d"), "a!!b!%c!_d");
        assert_eq!(escape_like("plain"), "plain");
    }
}
