use std::fmt;

use thiserror::Error;

/// The kind of failure a run can end with, per the fixed table of fatal
/// conditions a ledger file can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    ReadInput,
    BadHeader,
    BadDate,
    BadTime,
    BadEntry,
    ParseAmount,
    NotBalanced,
    ShareAccountSign,
    BadAccount,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::ReadInput => "could not read input",
            Kind::BadHeader => "malformed block header",
            Kind::BadDate => "malformed date",
            Kind::BadTime => "block out of chronological order",
            Kind::BadEntry => "malformed entry",
            Kind::ParseAmount => "malformed amount expression",
            Kind::NotBalanced => "transaction does not balance to zero",
            Kind::ShareAccountSign => "share account balance has the wrong sign",
            Kind::BadAccount => "empty account path",
        };
        write!(f, "{s}")
    }
}

/// A fatal error, carrying enough context to report the offending line or
/// block alongside an optional chained source. Mirrors the source's
/// `Err{Pkg,Info,Prev}` message-chain idiom in typed form.
#[derive(Error, Debug)]
#[error("{kind} ({context})")]
pub struct LedgerError {
    pub kind: Kind,
    pub context: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl LedgerError {
    pub fn new(kind: Kind, context: impl Into<String>) -> Self {
        LedgerError {
            kind,
            context: context.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: Kind,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        LedgerError {
            kind,
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Renders this error and its full source chain, one cause per line,
    /// the way `main` prints a fatal failure to stderr.
    pub fn render_chain(&self) -> String {
        let mut out = format!("error: {self}");
        let mut cur: Option<&(dyn std::error::Error + 'static)> =
            std::error::Error::source(self);
        while let Some(e) = cur {
            out.push_str(&format!("\n  caused by: {e}"));
            cur = e.source();
        }
        out
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
