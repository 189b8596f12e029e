//! Token identity composition and parsing.

use std::fmt;

use crate::{Error, Result};

/// A token's `(namespace?, name)` pair.
///
/// Rendered as `namespace + delimiter + name`, or just `name` without a
/// namespace. An empty namespace is the same as no namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenId {
    namespace: Option<String>,
    name: String,
}

impl TokenId {
    /// Creates a token id, rejecting parts that could not be parsed back.
    pub fn new(name: &str, namespace: Option<&str>, delimiter: char) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::invalid_token().with_message("token name cannot be empty"));
        }

        if name.contains(delimiter) {
            return Err(Error::invalid_token().with_message(format!(
                "token name '{name}' contains the delimiter '{delimiter}'"
            )));
        }

        let namespace = namespace.filter(|ns| !ns.is_empty());
        if let Some(ns) = namespace
            && ns.contains(delimiter)
        {
            return Err(Error::invalid_token().with_message(format!(
                "namespace '{ns}' contains the delimiter '{delimiter}'"
            )));
        }

        Ok(Self {
            namespace: namespace.map(str::to_owned),
            name: name.to_owned(),
        })
    }

    /// Parses an external identity.
    ///
    /// Returns `None` for malformed input: an empty segment or more than one
    /// delimiter.
    pub fn parse(identity: &str, delimiter: char) -> Option<Self> {
        let mut parts = identity.split(delimiter);
        let first = parts.next()?;

        match (parts.next(), parts.next()) {
            (None, _) if !first.is_empty() => Some(Self {
                namespace: None,
                name: first.to_owned(),
            }),
            (Some(name), None) if !first.is_empty() && !name.is_empty() => Some(Self {
                namespace: Some(first.to_owned()),
                name: name.to_owned(),
            }),
            _ => None,
        }
    }

    /// Returns the namespace, if any.
    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the leaf name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders the external identity with the given delimiter.
    pub fn to_identity(&self, delimiter: char) -> String {
        self.display(delimiter).to_string()
    }

    /// Returns a displayable identity with the given delimiter.
    pub fn display(&self, delimiter: char) -> impl fmt::Display + '_ {
        DisplayTokenId {
            id: self,
            delimiter,
        }
    }
}

struct DisplayTokenId<'a> {
    id: &'a TokenId,
    delimiter: char,
}

impl fmt::Display for DisplayTokenId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id.namespace() {
            Some(ns) => write!(f, "{ns}{}{}", self.delimiter, self.id.name()),
            None => f.write_str(self.id.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn identity_with_namespace() {
        let id = TokenId::new("tok1", Some("progress"), ';').unwrap();
        assert_eq!(id.to_identity(';'), "progress;tok1");
        assert_eq!(TokenId::parse("progress;tok1", ';'), Some(id));
    }

    #[test]
    fn identity_without_namespace() {
        let id = TokenId::new("tok1", None, ';').unwrap();
        assert_eq!(id.to_identity(';'), "tok1");
        assert_eq!(TokenId::parse("tok1", ';'), Some(id));
    }

    #[test]
    fn empty_namespace_is_no_namespace() {
        let id = TokenId::new("tok1", Some(""), ':').unwrap();
        assert_eq!(id.namespace(), None);
        assert_eq!(id.to_identity(':'), "tok1");
    }

    #[test]
    fn rejects_delimiter_in_parts() {
        let err = TokenId::new("a;b", None, ';').unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);

        let err = TokenId::new("name", Some("ns;x"), ';').unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);

        // Only the configured delimiter matters.
        assert!(TokenId::new("a;b", Some("ns"), ':').is_ok());
    }

    #[test]
    fn rejects_empty_name() {
        let err = TokenId::new("", Some("progress"), ';').unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
    }

    #[test]
    fn malformed_identities_do_not_parse() {
        assert_eq!(TokenId::parse("", ';'), None);
        assert_eq!(TokenId::parse(";tok1", ';'), None);
        assert_eq!(TokenId::parse("progress;", ';'), None);
        assert_eq!(TokenId::parse("a;b;c", ';'), None);
    }
}
