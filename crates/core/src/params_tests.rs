// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn opaque_keys_start_with_underscore() {
    assert!(is_opaque("_exitcode"));
    assert!(is_opaque("_"));
    assert!(!is_opaque("lockfile"));
    assert!(!is_opaque(""));
}

#[test]
fn params_iterate_in_lexicographic_order() {
    let mut params = Params::new();
    params.insert("b".to_string(), "2".to_string());
    params.insert("a".to_string(), "1".to_string());
    params.insert("c".to_string(), "3".to_string());

    let keys: Vec<&str> = params.keys().map(String::as_str).collect();
    assert_eq!(keys, ["a", "b", "c"]);
}
