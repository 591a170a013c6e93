use std::ops::RangeInclusive;

use regex::Regex;

use super::Violation;

/// Collects field violations for a validator body. Each check records at
/// most one violation.
#[derive(Debug, Default)]
pub struct Rules {
    violations: Vec<Violation>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails when `value` is empty after trimming.
    pub fn required(&mut self, field: &'static str, value: &str, message: &str) -> &mut Self {
        self.check(field, !value.trim().is_empty(), message)
    }

    /// Fails when the trimmed value has more than `max` characters.
    pub fn max_length(
        &mut self,
        field: &'static str,
        value: &str,
        max: usize,
        message: &str,
    ) -> &mut Self {
        self.check(field, value.trim().chars().count() <= max, message)
    }

    /// Fails when a non-empty value does not match `pattern`. Empty values are
    /// left to `required`.
    pub fn matches(
        &mut self,
        field: &'static str,
        value: &str,
        pattern: &Regex,
        message: &str,
    ) -> &mut Self {
        let value = value.trim();
        self.check(field, value.is_empty() || pattern.is_match(value), message)
    }

    pub fn range<T: PartialOrd>(
        &mut self,
        field: &'static str,
        value: T,
        bounds: RangeInclusive<T>,
        message: &str,
    ) -> &mut Self {
        self.check(field, bounds.contains(&value), message)
    }

    /// Records a violation unless `ok` holds.
    pub fn check(&mut self, field: &'static str, ok: bool, message: &str) -> &mut Self {
        if !ok {
            self.violations.push(Violation::invalid(field, message));
        }
        self
    }

    pub fn push(&mut self, violation: Violation) -> &mut Self {
        self.violations.push(violation);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_skips_empty_values() {
        let digits = Regex::new(r"^[0-9]+$").unwrap();
        let mut rules = Rules::new();
        rules
            .matches("code", "", &digits, "Code must be numeric")
            .matches("code", "12a", &digits, "Code must be numeric")
            .max_length("name", "  abcd  ", 4, "too long");

        let violations = rules.into_violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "code");
    }
}
