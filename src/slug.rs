//! Slugification: lowercase ASCII, non-alphanumerics to `_`, collapsed and
//! trimmed; duplicates disambiguated by numeric suffix.

/// Slugify a single string.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_sep = true; // trims a leading underscore
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Slugify a batch, disambiguating duplicates with a numeric suffix.
pub fn unique_slugs(inputs: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashMap::new();
    inputs
        .iter()
        .map(|s| {
            let base = slugify(s);
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                base
            } else {
                format!("{base}_{count}")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_and_trims() {
        assert_eq!(slugify("  Hello, World!!  "), "hello_world");
        assert_eq!(slugify("Already_Slug"), "already_slug");
    }

    #[test]
    fn disambiguates_duplicates() {
        let slugs = unique_slugs(&["Name".into(), "name".into(), "name!".into()]);
        assert_eq!(slugs, vec!["name", "name_2", "name_3"]);
    }
}
