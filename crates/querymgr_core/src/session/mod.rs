pub mod properties;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use querymgr_error::QueryError;
use querymgr_parser::ParseOptions;
use serde::Serialize;

use self::properties::SessionProperties;
use crate::errors::Result;
use crate::query_id::QueryId;

/// Who is running a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Identity {
    pub user: String,
    pub principal: Option<String>,
}

impl Identity {
    pub fn new(user: impl Into<String>) -> Self {
        Identity {
            user: user.into(),
            principal: None,
        }
    }
}

/// Session a single query runs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub query_id: QueryId,
    pub identity: Identity,
    pub source: Option<String>,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub start_time: DateTime<Utc>,
    pub properties: SessionProperties,
    /// Prepared statement name to statement text.
    pub prepared_statements: HashMap<String, String>,
}

impl Session {
    /// Create a session with only an id and identity, everything else
    /// defaulted.
    pub fn new(query_id: QueryId, identity: Identity, start_time: DateTime<Utc>) -> Self {
        Session {
            query_id,
            identity,
            source: None,
            catalog: None,
            schema: None,
            start_time,
            properties: SessionProperties::default(),
            prepared_statements: HashMap::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_property(mut self, name: &str, value: &str) -> Result<Self> {
        self.properties.set_from_str(name, value)?;
        Ok(self)
    }

    pub fn with_prepared_statement(
        mut self,
        name: impl Into<String>,
        statement: impl Into<String>,
    ) -> Self {
        self.prepared_statements
            .insert(name.into(), statement.into());
        self
    }

    /// Get the text of a prepared statement.
    pub fn prepared_statement(&self, name: &str) -> Result<&str, QueryError> {
        self.prepared_statements
            .get(name)
            .map(|s| s.as_str())
            .ok_or_else(|| QueryError::not_found(format!("Prepared statement not found: {name}")))
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions::new(self.properties.parse_decimal_literals_as_double)
    }
}

/// Builds the session for a newly admitted query.
pub trait SessionSupplier: Sync + Send {
    fn create_session(&self, query_id: &QueryId) -> Result<Session, QueryError>;

    /// Identity of the caller, used when a session could not be created.
    fn identity(&self) -> Identity;
}
