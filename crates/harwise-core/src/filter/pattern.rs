use regex::Regex;

/// Compile a user-supplied regex, reporting and discarding invalid ones.
///
/// Rules with invalid patterns never apply; they are not an error.
pub fn compile_lenient(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!("Ignoring invalid pattern '{}': {}", pattern, e);
            None
        }
    }
}

/// Test a user-supplied regex against a target; invalid patterns never match
pub fn lenient_match(pattern: &str, target: &str) -> bool {
    compile_lenient(pattern).is_some_and(|re| re.is_match(target))
}
