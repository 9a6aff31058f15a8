//! Thread-local cache of compiled regexes.
//!
//! The same pattern is often compiled repeatedly (a search followed by a plan,
//! or the CLI preview followed by the apply). `Regex` clones share their
//! compiled program, so a cache hit is a refcount bump.
//! Cache is capped at 256 entries and cleared wholesale when full.

use regex::{Regex, RegexBuilder};
use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    // Key is "<i|s>:<expression>" so the same expression compiled with and
    // without case folding never collides.
    static REGEX_CACHE: RefCell<HashMap<String, Regex>> =
        RefCell::new(HashMap::new());
}

/// Get a compiled regex from cache, or compile and cache it.
pub fn get_or_compile(expression: &str, case_sensitive: bool) -> Result<Regex, regex::Error> {
    let flag = if case_sensitive { 's' } else { 'i' };
    let cache_key = format!("{flag}:{expression}");

    REGEX_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(re) = cache.get(&cache_key) {
            return Ok(re.clone());
        }

        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }

        let compiled = RegexBuilder::new(expression)
            .case_insensitive(!case_sensitive)
            .build()?;
        cache.insert(cache_key, compiled.clone());
        Ok(compiled)
    })
}

/// Clear the cache (mainly for testing).
pub fn clear_cache() {
    REGEX_CACHE.with(|cache| {
        cache.borrow_mut().clear();
    });
}

pub fn cache_size() -> usize {
    REGEX_CACHE.with(|cache| cache.borrow().len())
}
