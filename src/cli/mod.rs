use std::ffi::OsString;

pub mod args;

/// Name cargo passes as the first argument when run as `cargo docsets`.
const SUBCOMMAND_NAME: &str = "docsets";

/// Drops the `docsets` argument cargo inserts after the program name.
pub fn cargo_subcommand_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().collect();
    if args.get(1).is_some_and(|arg| arg == SUBCOMMAND_NAME) {
        args.remove(1);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn strips_cargo_subcommand() {
        assert_eq!(
            cargo_subcommand_args(os(&["cargo-docsets", "docsets", "serde"])),
            os(&["cargo-docsets", "serde"])
        );
    }

    #[test]
    fn keeps_direct_invocation() {
        assert_eq!(
            cargo_subcommand_args(os(&["cargo-docsets", "serde", "docsets"])),
            os(&["cargo-docsets", "serde", "docsets"])
        );
    }
}
