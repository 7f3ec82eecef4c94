// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dynamic `--key=value` parameter parsing.

use anyhow::{bail, Context, Result};
use kiln_core::Params;
use std::time::Duration;

/// Turn trailing `--key=value` arguments into job parameters.
///
/// Leading dashes on the key are tolerated. A value prefixed with `@` is
/// replaced by the contents of the named file.
pub fn parse_dynamic(args: &[String]) -> Result<Params> {
    let mut params = Params::new();

    for arg in args {
        let trimmed = arg.trim_start_matches('-');
        let Some((key, value)) = trimmed.split_once('=') else {
            bail!("invalid parameter '{arg}' (expected key=value)");
        };
        if key.is_empty() {
            bail!("invalid parameter '{arg}' (empty key)");
        }

        let value = match value.strip_prefix('@') {
            Some(file) => std::fs::read_to_string(file)
                .with_context(|| format!("cannot read parameter file '{file}'"))?,
            None => value.to_string(),
        };

        params.insert(key.to_string(), value);
    }

    Ok(params)
}

/// Parse durations like `90s`, `60m`, `2h` or `1h30m`.
pub fn parse_duration(input: &str) -> Result<Duration> {
    if input.is_empty() {
        bail!("empty duration");
    }

    let mut total = Duration::ZERO;
    let mut digits = String::new();

    for c in input.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        let value: u64 = digits.parse().with_context(|| format!("invalid duration '{input}'"))?;
        digits.clear();
        total += match c {
            's' => Duration::from_secs(value),
            'm' => Duration::from_secs(value * 60),
            'h' => Duration::from_secs(value * 3600),
            other => bail!("invalid duration unit '{other}' in '{input}'"),
        };
    }

    if !digits.is_empty() {
        bail!("duration '{input}' is missing a unit (s, m or h)");
    }

    Ok(total)
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
