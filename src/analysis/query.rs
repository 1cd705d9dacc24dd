//! Extraction queries: which symbols a caller wants back.
//!
//! The JSON wire shape is
//! `{Elements, Exclusions, Filters: {FunctionName, ClassName, Extends}, ScopeFilter, PreserveContext}`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{Symbol, SymbolKind};
use crate::error::{Error, Result};

/// Scope restriction applied after extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeFilter {
    #[default]
    None,
    /// Only symbols not nested in any class or function.
    TopLevelOnly,
}

/// Declarative symbol filter, consumed read-only by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionQuery {
    /// Kinds to keep. Empty means every kind.
    pub kinds: BTreeSet<SymbolKind>,
    /// Kinds to drop even if listed in `kinds`.
    pub exclusions: BTreeSet<SymbolKind>,
    /// Exact symbol name.
    pub name_filter: Option<String>,
    /// Class name: matches classes of that name and members whose parent it is.
    pub class_filter: Option<String>,
    /// Base class name.
    pub extends_filter: Option<String>,
    pub scope: ScopeFilter,
    /// Rename methods to `Parent.name`.
    pub preserve_context: bool,
}

impl ExtractionQuery {
    /// A query that keeps every symbol.
    pub fn all() -> Self {
        Self::default()
    }

    /// A query for the given kinds.
    pub fn for_kinds(kinds: &[SymbolKind]) -> Self {
        Self {
            kinds: kinds.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn with_preserve_context(mut self, preserve: bool) -> Self {
        self.preserve_context = preserve;
        self
    }

    pub fn with_scope(mut self, scope: ScopeFilter) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name_filter = Some(name.into());
        self
    }

    /// Decode the JSON wire shape.
    pub fn from_json(json: &str) -> Result<Self> {
        let wire: QueryWire =
            serde_json::from_str(json).map_err(|e| Error::Query(e.to_string()))?;
        Self::try_from(wire)
    }

    /// Whether the kind passes the kind set and exclusions.
    pub fn wants_kind(&self, kind: SymbolKind) -> bool {
        (self.kinds.is_empty() || self.kinds.contains(&kind)) && !self.exclusions.contains(&kind)
    }

    /// Whether a finished symbol passes every filter.
    pub fn matches(&self, symbol: &Symbol) -> bool {
        if !self.wants_kind(symbol.kind) {
            return false;
        }

        if self.scope == ScopeFilter::TopLevelOnly && !symbol.top_level {
            return false;
        }

        if let Some(name) = &self.name_filter {
            if symbol.bare_name() != name && &symbol.name != name {
                return false;
            }
        }

        if let Some(class) = &self.class_filter {
            let is_class = symbol.kind == SymbolKind::Class && &symbol.name == class;
            let is_member = symbol.parent.as_deref() == Some(class.as_str());
            if !is_class && !is_member {
                return false;
            }
        }

        if let Some(base) = &self.extends_filter {
            if symbol.extends.as_deref() != Some(base.as_str()) {
                return false;
            }
        }

        true
    }
}

/// JSON wire shape for [`ExtractionQuery`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryWire {
    #[serde(rename = "Elements", default)]
    pub elements: Vec<String>,
    #[serde(rename = "Exclusions", default)]
    pub exclusions: Vec<String>,
    #[serde(rename = "Filters", default)]
    pub filters: FiltersWire,
    #[serde(rename = "ScopeFilter", default)]
    pub scope_filter: Option<String>,
    #[serde(rename = "PreserveContext", default)]
    pub preserve_context: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FiltersWire {
    #[serde(rename = "FunctionName", default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(rename = "ClassName", default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(rename = "Extends", default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
}

fn parse_kinds(names: &[String]) -> Result<BTreeSet<SymbolKind>> {
    names
        .iter()
        .map(|n| SymbolKind::parse(n).ok_or_else(|| Error::Query(format!("unknown element {:?}", n))))
        .collect()
}

impl TryFrom<QueryWire> for ExtractionQuery {
    type Error = Error;

    fn try_from(wire: QueryWire) -> Result<Self> {
        let scope = match wire.scope_filter.as_deref() {
            None | Some("") => ScopeFilter::None,
            Some("top-level") | Some("toplevel") | Some("top_level") => ScopeFilter::TopLevelOnly,
            Some(other) => return Err(Error::Query(format!("unknown scope filter {:?}", other))),
        };

        Ok(Self {
            kinds: parse_kinds(&wire.elements)?,
            exclusions: parse_kinds(&wire.exclusions)?,
            name_filter: wire.filters.function_name.filter(|s| !s.is_empty()),
            class_filter: wire.filters.class_name.filter(|s| !s.is_empty()),
            extends_filter: wire.filters.extends.filter(|s| !s.is_empty()),
            scope,
            preserve_context: wire.preserve_context,
        })
    }
}
