use crate::types::{Outcome, PathRef};

/// Pass iff the path matched something present in the record.
pub fn exists(path: &PathRef, present: bool) -> Outcome {
    if present {
        Outcome::pass(format!("{path} is present"))
    } else {
        Outcome::fail(format!("{path} isn't present"))
    }
}

/// Pass iff the path matched nothing present in the record.
pub fn not_exists(path: &PathRef, present: bool) -> Outcome {
    if present {
        Outcome::fail(format!("{path} is present"))
    } else {
        Outcome::pass(format!("{path} isn't present"))
    }
}
