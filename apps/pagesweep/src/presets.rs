//! Named verifier configuration presets.
//!
//! Presets are plain values built on demand; callers own and may modify the
//! returned map without affecting other analyses.

use crate::error::{Error, Result};
use crate::models::Linter;
use serde_json::{json, Value as Json};
use std::collections::HashMap;

pub const STRICT: &str = "strict";
pub const NONE: &str = "none";

/// Strict rule options for the script and markup verifiers.
pub fn strict() -> HashMap<Linter, Json> {
    let script = json!({
        // restricting
        "bitwise": true,
        "curly": true,
        "eqeqeq": true,
        "forin": true,
        "freeze": true,
        "immed": true,
        "latedef": "nofunc",
        "noarg": true,
        "noempty": true,
        "nonew": true,
        "undef": true,
        "unused": "vars",
        "indent": 4,
        "maxcomplexity": 9,
        // relaxing
        "asi": true,
        "eqnull": true,
        "lastsemic": true,
        "sub": true,
        // environment
        "browser": true,
        "devel": true,
        "jquery": true,
        "globals": {}
    });
    let markup = json!({
        "tagname-lowercase": true,
        "attr-lowercase": true,
        "attr-value-double-quotes": true,
        "attr-value-not-empty": false,
        "doctype-first": true,
        "tag-pair": true,
        "tag-self-close": false,
        "spec-char-escape": true,
        "id-unique": true,
        "src-not-empty": true,
        "head-script-disabled": true,
        "img-alt-require": false,
        "doctype-html5": false,
        "id-class-value": false,
        "style-disabled": true,
        "no-inline-style": true,
        "no-commented-code": true
    });
    HashMap::from([(Linter::Script, script), (Linter::Markup, markup)])
}

/// Resolve a preset by name. `none` yields an empty map.
pub fn by_name(name: &str) -> Result<HashMap<Linter, Json>> {
    match name {
        STRICT => Ok(strict()),
        NONE => Ok(HashMap::new()),
        other => Err(Error::UnknownPreset(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_values_are_independent_copies() {
        let mut a = strict();
        a.get_mut(&Linter::Script).unwrap()["curly"] = json!(false);
        let b = strict();
        assert_eq!(b[&Linter::Script]["curly"], json!(true));
        assert_eq!(b[&Linter::Markup]["no-inline-style"], json!(true));
        assert!(!b.contains_key(&Linter::Stylesheet));
    }

    #[test]
    fn test_unknown_preset_is_an_error() {
        assert!(by_name(NONE).unwrap().is_empty());
        assert!(matches!(by_name("lenient"), Err(Error::UnknownPreset(n)) if n == "lenient"));
    }
}
