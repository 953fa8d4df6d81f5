//! Identifier sanitization for namespace, node, task, and job names.
//!
//! [`sanitize`] is the sole trust boundary for any string that gets
//! interpolated into a queue name or a stored-routine argument: callers must
//! not interpolate raw input into identifiers without passing it through
//! here first.

/// Replace every byte outside `[A-Za-z0-9_\-:.]` with `_`.
///
/// Deterministic and idempotent: `sanitize(sanitize(s)) == sanitize(s)`.
pub fn sanitize(s: &str) -> String {
    s.bytes()
        .map(|b| {
            let c = b as char;
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Queue name for a namespace's main event queue.
pub fn queue_name(namespace: &str) -> String {
    format!("core_events_{}", sanitize(namespace))
}

/// Dead-letter queue name for a namespace.
pub fn dlq_name(namespace: &str) -> String {
    format!("{}_dlq", queue_name(namespace))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_bytes_pass_through() {
        let s = "abcXYZ019_-:.";
        assert_eq!(sanitize(s), s);
    }

    #[test]
    fn disallowed_bytes_become_underscore() {
        assert_eq!(sanitize("dev one!"), "dev_one_");
        assert_eq!(sanitize("a/b\\c"), "a_b_c");
    }

    #[test]
    fn idempotent() {
        let inputs = ["dev-one", "a b c", "héllo", "", "already_ok-1.2:3"];
        for s in inputs {
            let once = sanitize(s);
            let twice = sanitize(&once);
            assert_eq!(once, twice, "sanitize not idempotent for {s:?}");
        }
    }

    #[test]
    fn closure_every_byte_in_allowed_class() {
        let samples = ["hello world", "日本語", "!!!", "a-b_c:d.e", ""];
        for s in samples {
            let out = sanitize(s);
            assert!(out
                .bytes()
                .all(|b| (b as char).is_ascii_alphanumeric() || matches!(b as char, '_' | '-' | ':' | '.')));
        }
    }

    #[test]
    fn queue_naming_hyphen_to_underscore() {
        assert_eq!(queue_name("dev-one"), "core_events_dev_one");
        assert_eq!(dlq_name("dev-one"), "core_events_dev_one_dlq");
    }

    #[test]
    fn queue_naming_matches_spec_pattern() {
        assert_eq!(queue_name("demo"), "core_events_demo");
        assert_eq!(dlq_name("demo"), "core_events_demo_dlq");
    }
}
