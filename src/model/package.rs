use std::{
    fmt::{Display, Write},
    str::FromStr,
    sync::OnceLock,
};

use regex_lite::Regex;

use crate::model::ParseError;

/// Suffix of every assembled documentation bundle.
pub const DOCSET_EXTENSION: &str = "docset";

/// Checkout target for a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Revision {
    /// Whatever branch the remote advertises as its `HEAD`.
    #[default]
    DefaultBranch,
    /// A branch, tag or commit.
    Named(String),
}

impl Revision {
    pub fn named(revision: impl Into<String>) -> Revision {
        Revision::Named(revision.into())
    }
}

impl Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Revision::DefaultBranch => f.write_str("origin/HEAD"),
            Revision::Named(revision) => f.write_str(revision),
        }
    }
}

/// A crate to document, as given on the command line: `name` or `name@revision`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageSpec {
    pub name: String,
    pub revision: Revision,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>, revision: Revision) -> Self {
        PackageSpec {
            name: name.into(),
            revision,
        }
    }

    /// Name rustdoc uses for the crate's output directory and the docset bundle.
    pub fn doc_name(&self) -> String {
        doc_name(&self.name)
    }
}

/// Rustdoc writes `foo-bar` to `target/doc/foo_bar`.
pub fn doc_name(package: &str) -> String {
    package.replace('-', "_")
}

/// File name of the bundle assembled for `package`.
pub fn bundle_name(package: &str) -> String {
    format!("{}.{DOCSET_EXTENSION}", doc_name(package))
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("package name pattern is valid")
    })
}

impl FromStr for PackageSpec {
    type Err = ParseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ParseError::Empty);
        }

        let (name, revision) = match token.split_once('@') {
            Some((_, "")) => return Err(ParseError::EmptyRevision(token.to_owned())),
            Some((name, revision)) => (name, Revision::named(revision)),
            None => (token, Revision::DefaultBranch),
        };

        if !name_pattern().is_match(name) {
            return Err(ParseError::InvalidName(name.to_owned()));
        }

        Ok(PackageSpec::new(name, revision))
    }
}

impl Display for PackageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        if let Revision::Named(revision) = &self.revision {
            f.write_char('@')?;
            f.write_str(revision)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn parse_name_only() {
        assert_eq!(
            "foo".parse::<PackageSpec>().unwrap(),
            PackageSpec::new("foo", Revision::DefaultBranch)
        );
    }

    #[test]
    fn parse_name_and_revision() {
        assert_eq!(
            "bar@v1.2.0".parse::<PackageSpec>().unwrap(),
            PackageSpec::new("bar", Revision::named("v1.2.0"))
        );
    }

    #[test]
    fn revision_keeps_everything_after_first_at() {
        let spec = "foo@feature@2".parse::<PackageSpec>().unwrap();
        assert_eq!(spec.revision, Revision::named("feature@2"));
    }

    #[test]
    fn parse_errors() {
        assert_eq!("".parse::<PackageSpec>(), Err(ParseError::Empty));
        assert_eq!(
            "foo@".parse::<PackageSpec>(),
            Err(ParseError::EmptyRevision("foo@".to_owned()))
        );
        assert_eq!(
            "@v1".parse::<PackageSpec>(),
            Err(ParseError::InvalidName("".to_owned()))
        );
        assert_eq!(
            "../etc@v1".parse::<PackageSpec>(),
            Err(ParseError::InvalidName("../etc".to_owned()))
        );
    }

    #[test]
    fn doc_names_use_underscores() {
        let spec = "serde-json@v1".parse::<PackageSpec>().unwrap();
        assert_eq!(spec.name, "serde-json");
        assert_eq!(spec.doc_name(), "serde_json");
        assert_eq!(bundle_name(&spec.name), "serde_json.docset");
    }

    #[test]
    fn display_round_trips_token() {
        for token in ["foo", "bar@v1.2.0"] {
            assert_eq!(token.parse::<PackageSpec>().unwrap().to_string(), token);
        }
    }
}
