//! Classification of minified function literals into canonical array operations

use crate::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Array mutation denoted by a recognised function shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalOperation {
    /// `a.reverse()`
    Reverse,
    /// `a.splice(0,b)` on signatures, `d.splice(e,1)` on throttling sequences
    Splice,
    /// Exchange index 0 with index `b mod length`
    Swap,
    /// Cyclic rotation through repeated `unshift(pop())`
    Unshift,
    /// `d.push(e)`
    Push,
    /// Rotation through `splice(-e).reverse().forEach(unshift)`
    Prepend,
    /// `d.splice(0,1,d.splice(e,1,d[0])[0])`
    NestedSplice,
    /// `switch`-based multi-way dispatch
    CipherDispatch,
}

impl fmt::Display for CanonicalOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CanonicalOperation::Reverse => "reverse",
            CanonicalOperation::Splice => "splice",
            CanonicalOperation::Swap => "swap",
            CanonicalOperation::Unshift => "unshift",
            CanonicalOperation::Push => "push",
            CanonicalOperation::Prepend => "prepend",
            CanonicalOperation::NestedSplice => "nested splice",
            CanonicalOperation::CipherDispatch => "cipher dispatch",
        };
        f.write_str(name)
    }
}

/// Known shapes, most distinctive first. The first hit decides.
const CATALOGUE: &[(&str, CanonicalOperation)] = &[
    (r"case\s\d+", CanonicalOperation::CipherDispatch),
    (
        r"\{for\(\w=\(\w%\w\.length\+\w\.length\)%\w\.length;\w--;\)\w\.unshift\(\w\.pop\(\)\)\}",
        CanonicalOperation::Unshift,
    ),
    (
        r"\w\.splice\(-\w\)\.reverse\(\)\.forEach\(function\(\w\)\{\w\.unshift\(\w\)\}\)",
        CanonicalOperation::Prepend,
    ),
    (
        r"\w\.splice\(0,1,\w\.splice\(\w,1,\w\[0\]\)\[0\]\)",
        CanonicalOperation::NestedSplice,
    ),
    (r"\{\w\.reverse\(\)\}", CanonicalOperation::Reverse),
    (
        r"for\(var \w=\w\.length;\w;\)\w\.push\(\w\.splice\(--\w,1\)\[0\]\)\}",
        CanonicalOperation::Reverse,
    ),
    (r"\{\w\.push\(\w\)\}", CanonicalOperation::Push),
    (
        r"\{var\s\w=\w\[0\];\w\[0\]=\w\[\w%\w\.length\];\w\[\w(?:%\w\.length)?\]=\w\}",
        CanonicalOperation::Swap,
    ),
    (
        r";var\s\w=\w\[0\];\w\[0\]=\w\[\w\];\w\[\w\]=\w\}",
        CanonicalOperation::Swap,
    ),
    (r"\{\w\.splice\(0,\w\)\}", CanonicalOperation::Splice),
    (r";\w\.splice\(\w,1\)\}", CanonicalOperation::Splice),
];

/// Maps function source text to a [`CanonicalOperation`]
#[derive(Debug, Clone)]
pub struct OperationClassifier {
    catalogue: Vec<(Regex, CanonicalOperation)>,
}

impl OperationClassifier {
    /// Compile the shape catalogue
    pub fn new() -> Result<Self> {
        let catalogue = CATALOGUE
            .iter()
            .map(|(source, op)| Ok((Regex::new(source)?, *op)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { catalogue })
    }

    /// Classify a function literal (or just its body).
    ///
    /// `None` means the source is not a known operation; callers treat such
    /// values as opaque data.
    pub fn classify(&self, source: &str) -> Option<CanonicalOperation> {
        let op = self
            .catalogue
            .iter()
            .find(|(regex, _)| regex.is_match(source))
            .map(|(_, op)| *op);
        trace!("Classified {:?} as {:?}", source, op);
        op
    }
}
