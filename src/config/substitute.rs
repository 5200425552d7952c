//! `${name}` variable substitution.
//!
//! Names resolve against, in order: process-wide system properties, OS
//! environment variables, then the supplied context. Unresolved references and
//! unterminated `${` markers are left in the text verbatim.

use std::collections::HashMap;

use super::options::SystemProperties;
use super::properties::PropertySet;
use super::store::PropertyStore;

const OPEN_MARKER: &str = "${";
const CLOSE_MARKER: char = '}';

/// Upper bound on whole-set passes before giving up on a fixpoint.
pub const MAX_SUBSTITUTION_PASSES: usize = 32;

/// Longest text a single expansion may produce.
pub const MAX_EXPANDED_LENGTH: usize = 64 * 1024;

/// Deepest chain of nested references followed.
pub const MAX_EXPANSION_DEPTH: usize = 64;

/// Something that can supply a value for a variable name.
pub trait VariableSource {
    fn lookup(&self, name: &str) -> Option<String>;
}

impl VariableSource for PropertySet {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl VariableSource for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl VariableSource for PropertyStore {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }
}

/// Empty context.
impl VariableSource for () {
    fn lookup(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Consults `primary` first, then `fallback`.
pub struct Chained<'a> {
    pub primary: &'a dyn VariableSource,
    pub fallback: &'a dyn VariableSource,
}

impl VariableSource for Chained<'_> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.primary
            .lookup(name)
            .or_else(|| self.fallback.lookup(name))
    }
}

/// Result of a whole-set substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubstitutionReport {
    /// Passes performed, including the final no-change pass.
    pub passes: usize,
    /// True when [`MAX_SUBSTITUTION_PASSES`] was reached without a fixpoint.
    pub capped: bool,
    /// True when a reference was left unexpanded because following it would
    /// exceed [`MAX_EXPANDED_LENGTH`] or [`MAX_EXPANSION_DEPTH`].
    pub truncated: bool,
}

/// Names currently being expanded, innermost last.
#[derive(Debug, Default)]
struct Expansion {
    chain: Vec<String>,
    truncated: bool,
}

impl Expansion {
    fn within(name: &str) -> Self {
        Self {
            chain: vec![name.to_string()],
            truncated: false,
        }
    }
}

/// Resolves `${name}` references.
///
/// Resolved values are expanded in turn. A reference to a name that is
/// already being expanded is left literal, so self and mutual references
/// terminate instead of growing.
#[derive(Debug, Clone)]
pub struct Substitutor {
    system: SystemProperties,
}

impl Substitutor {
    pub fn new(system: SystemProperties) -> Self {
        Self { system }
    }

    fn resolve(&self, name: &str, context: &dyn VariableSource) -> Option<String> {
        self.system
            .get(name)
            .or_else(|| std::env::var(name).ok())
            .or_else(|| context.lookup(name))
    }

    fn resolve_nested(
        &self,
        name: &str,
        context: &dyn VariableSource,
        expansion: &mut Expansion,
    ) -> Option<String> {
        if expansion.chain.iter().any(|n| n == name) {
            return None;
        }
        if expansion.chain.len() >= MAX_EXPANSION_DEPTH {
            expansion.truncated = true;
            return None;
        }
        let value = self.resolve(name, context)?;

        expansion.chain.push(name.to_string());
        let expanded = self.expand(&value, context, expansion).unwrap_or(value);
        expansion.chain.pop();
        Some(expanded)
    }

    fn expand(
        &self,
        text: &str,
        context: &dyn VariableSource,
        expansion: &mut Expansion,
    ) -> Option<String> {
        let mut output = String::with_capacity(text.len());
        let mut rest = text;
        let mut any_substitution = false;

        while let Some(open) = rest.find(OPEN_MARKER) {
            let name_start = open + OPEN_MARKER.len();
            let Some(close) = rest[name_start..].find(CLOSE_MARKER) else {
                break;
            };
            let name = &rest[name_start..name_start + close];

            output.push_str(&rest[..open]);
            match self.resolve_nested(name, context, expansion) {
                Some(value) if output.len() + value.len() <= MAX_EXPANDED_LENGTH => {
                    output.push_str(&value);
                    any_substitution = true;
                }
                resolved => {
                    if resolved.is_some() {
                        expansion.truncated = true;
                    }
                    output.push_str(OPEN_MARKER);
                    output.push_str(name);
                    output.push(CLOSE_MARKER);
                }
            }
            rest = &rest[name_start + close + 1..];
        }
        output.push_str(rest);

        any_substitution.then_some(output)
    }

    /// Substitute every reference in `text`.
    ///
    /// Returns `None` when no reference was resolved, so "nothing changed" is
    /// distinguishable from "resolved to identical text".
    pub fn substitute(&self, text: &str, context: &dyn VariableSource) -> Option<String> {
        self.expand(text, context, &mut Expansion::default())
    }

    /// Substitute keys and values of `properties` until a pass changes nothing.
    ///
    /// Each pass resolves against the set as it stood when the pass began,
    /// then `fallback`. A key whose name contains a resolvable reference is
    /// renamed. A property never expands a reference to itself.
    pub fn substitute_all(
        &self,
        properties: &mut PropertySet,
        fallback: &dyn VariableSource,
    ) -> SubstitutionReport {
        let mut report = SubstitutionReport {
            passes: 0,
            capped: false,
            truncated: false,
        };

        loop {
            if report.passes == MAX_SUBSTITUTION_PASSES {
                report.capped = true;
                return report;
            }
            report.passes += 1;

            let snapshot = properties.clone();
            let context = Chained {
                primary: &snapshot,
                fallback,
            };
            let mut rewritten = PropertySet::new();
            let mut changed = false;

            for (name, value) in &snapshot {
                let mut expansion = Expansion::within(name);
                let new_name = self
                    .expand(name, &context, &mut expansion)
                    .unwrap_or_else(|| name.clone());
                let new_value = self
                    .expand(value, &context, &mut expansion)
                    .unwrap_or_else(|| value.clone());

                report.truncated |= expansion.truncated;
                changed |= new_name != *name || new_value != *value;
                rewritten.insert(new_name, new_value);
            }
            *properties = rewritten;

            if !changed {
                return report;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn substitutor() -> Substitutor {
        Substitutor::new(SystemProperties::new())
    }

    fn context(pairs: &[(&str, &str)]) -> PropertySet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_no_reference_signals_no_change() {
        assert_eq!(substitutor().substitute("abc", &()), None);
    }

    #[test]
    fn test_single_reference() {
        let ctx = context(&[("v", "x")]);
        assert_eq!(substitutor().substitute("${v}", &ctx).as_deref(), Some("x"));
    }

    #[test]
    fn test_reference_positions() {
        let ctx = context(&[("v", "x")]);
        let s = substitutor();
        assert_eq!(s.substitute("${v}a", &ctx).as_deref(), Some("xa"));
        assert_eq!(s.substitute("a${v}b", &ctx).as_deref(), Some("axb"));
        assert_eq!(s.substitute("a${v}", &ctx).as_deref(), Some("ax"));
    }

    #[test]
    fn test_multiple_references() {
        let ctx = context(&[("v1", "1"), ("v2", "2")]);
        let s = substitutor();
        assert_eq!(
            s.substitute("a${v1}b${v2}c", &ctx).as_deref(),
            Some("a1b2c")
        );
        assert_eq!(s.substitute("${v1}${v2}", &ctx).as_deref(), Some("12"));
    }

    #[test]
    fn test_unresolved_reference_left_verbatim() {
        let s = substitutor();
        assert_eq!(s.substitute("${missing}", &()), None);

        let ctx = context(&[("v", "x")]);
        assert_eq!(
            s.substitute("${missing}-${v}", &ctx).as_deref(),
            Some("${missing}-x")
        );
    }

    #[test]
    fn test_unterminated_marker_kept_verbatim() {
        let ctx = context(&[("v", "x")]);
        let s = substitutor();
        assert_eq!(s.substitute("a${v", &ctx), None);
        assert_eq!(
            s.substitute("${v}-${open", &ctx).as_deref(),
            Some("x-${open")
        );
    }

    #[test]
    fn test_system_properties_win_over_context() {
        let system = SystemProperties::new();
        system.set("eeprops_test_precedence", "system");
        let s = Substitutor::new(system);
        let ctx = context(&[("eeprops_test_precedence", "context")]);
        assert_eq!(
            s.substitute("${eeprops_test_precedence}", &ctx).as_deref(),
            Some("system")
        );
    }

    #[test]
    fn test_environment_wins_over_context() {
        // SAFETY: the variable name is unique to this test.
        unsafe {
            std::env::set_var("EEPROPS_SUBSTITUTE_ENV_TEST", "from-env");
        }
        let ctx = context(&[("EEPROPS_SUBSTITUTE_ENV_TEST", "context")]);
        assert_eq!(
            substitutor()
                .substitute("${EEPROPS_SUBSTITUTE_ENV_TEST}", &ctx)
                .as_deref(),
            Some("from-env")
        );
    }

    #[test]
    fn test_substitute_all_resolves_chains() {
        let mut props = context(&[
            ("base", "/srv"),
            ("app", "${base}/app"),
            ("logs", "${app}/logs"),
        ]);
        let report = substitutor().substitute_all(&mut props, &());
        assert!(!report.capped);
        assert_eq!(props["logs"], "/srv/app/logs");
        assert_eq!(props["app"], "/srv/app");
    }

    #[test]
    fn test_substitute_all_renames_keys() {
        let mut props = context(&[("env", "prod"), ("db.${env}.host", "db1")]);
        substitutor().substitute_all(&mut props, &());
        assert_eq!(props.get("db.prod.host").map(String::as_str), Some("db1"));
        assert!(!props.contains_key("db.${env}.host"));
    }

    #[test]
    fn test_substitute_all_uses_fallback() {
        let mut props = context(&[("url", "http://${host}/")]);
        let fallback = context(&[("host", "example.org")]);
        substitutor().substitute_all(&mut props, &fallback);
        assert_eq!(props["url"], "http://example.org/");
    }

    #[test]
    fn test_substitute_all_unresolved_converges() {
        let mut props = context(&[("a", "${nowhere}")]);
        let report = substitutor().substitute_all(&mut props, &());
        assert_eq!(report.passes, 1);
        assert!(!report.capped);
        assert_eq!(props["a"], "${nowhere}");
    }

    #[test]
    fn test_self_reference_stays_literal() {
        let mut props = context(&[("a", "x${a}"), ("classpath", "${classpath}:lib")]);
        let report = substitutor().substitute_all(&mut props, &());
        assert!(!report.capped);
        assert_eq!(props["a"], "x${a}");
        assert_eq!(props["classpath"], "${classpath}:lib");
    }

    #[test]
    fn test_mutual_reference_converges() {
        let mut props = context(&[("a", "x${b}"), ("b", "y${a}")]);
        let report = substitutor().substitute_all(&mut props, &());
        assert!(!report.capped);
        assert_eq!(props["a"], "xy${a}");
        assert_eq!(props["b"], "yx${b}");
    }

    #[test]
    fn test_single_substitute_does_not_recurse_forever() {
        let ctx = context(&[("v", "v=${v}")]);
        assert_eq!(
            substitutor().substitute("${v}", &ctx).as_deref(),
            Some("v=${v}")
        );
    }

    #[test]
    fn test_oversized_expansion_is_truncated() {
        let mut pairs = vec![("l0".to_string(), "x".repeat(1024))];
        for i in 1..8 {
            pairs.push((format!("l{i}"), format!("${{l{0}}}${{l{0}}}", i - 1)));
        }
        let mut props: PropertySet = pairs.into_iter().collect();
        let report = substitutor().substitute_all(&mut props, &());

        assert!(report.truncated);
        assert!(props["l7"].ends_with("${l6}"));
        assert_eq!(props["l7"].len(), MAX_EXPANDED_LENGTH + "${l6}".len());
        assert_eq!(props["l6"].len(), 64 * 1024);
    }

    /// Hands back a value that references the name it was asked for.
    struct Growing;

    impl VariableSource for Growing {
        fn lookup(&self, name: &str) -> Option<String> {
            (name == "tick").then(|| "${tick}x".to_string())
        }
    }

    #[test]
    fn test_substitute_all_is_capped() {
        let mut props = context(&[("a", "${tick}")]);
        let report = substitutor().substitute_all(&mut props, &Growing);
        assert!(report.capped);
        assert_eq!(report.passes, MAX_SUBSTITUTION_PASSES);
        assert_eq!(props["a"].len(), "${tick}".len() + MAX_SUBSTITUTION_PASSES);
    }
}
