//! Filename conventions for content documents.
//!
//! Posts follow a dated naming pattern: a `YYYY-MM-DD-` prefix followed by a
//! slug. Everything else is just a slug. This module parses both shapes and
//! produces slugs for new documents.
//!
//! ## Slugs
//!
//! Slugs are lowercase ASCII, words joined by single dashes:
//! - `"Hello World!"` → `hello-world`
//! - `"Crème Brûlée Recipe"` → `creme-brulee-recipe`
//! - `"  --Already--Dashed--  "` → `already-dashed`
//!
//! ## Labels
//!
//! Collection labels are plural (`posts`, `categories`). [`pluralize`] turns a
//! singular label typed by a user into the collection name to look up.

use chrono::NaiveDate;

/// Result of parsing a document filename stem like `2024-03-09-hello-world`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedName {
    /// Date prefix if present and a valid calendar date.
    pub date: Option<NaiveDate>,
    /// Slug part after the date prefix. The full stem for undated names.
    pub slug: String,
    /// Display title: slug with dashes converted to spaces.
    pub display_title: String,
}

/// Parse a filename stem following the `YYYY-MM-DD-slug` convention.
///
/// - `"2024-03-09-hello-world"` → date=2024-03-09, slug="hello-world"
/// - `"2024-03-09"` → date=2024-03-09, slug=""
/// - `"2024-13-45-nope"` → no date (invalid month/day), slug is the whole stem
/// - `"about"` → no date, slug="about"
pub fn parse_dated_name(stem: &str) -> ParsedName {
    if stem.len() >= 10 && stem.is_char_boundary(10) {
        let (prefix, rest) = stem.split_at(10);
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            if rest.is_empty() || rest.starts_with('-') {
                let slug = rest.trim_start_matches('-').to_string();
                return ParsedName {
                    date: Some(date),
                    display_title: slug.replace('-', " "),
                    slug,
                };
            }
        }
    }
    ParsedName {
        date: None,
        slug: stem.to_string(),
        display_title: stem.replace('-', " "),
    }
}

/// The `YYYY-MM-DD-` prefix used for post filenames.
pub fn date_prefix(date: NaiveDate) -> String {
    date.format("%Y-%m-%d-").to_string()
}

/// Convert arbitrary text into a URL-safe slug.
///
/// - Transliterates to ASCII (`é` → `e`)
/// - Lowercases
/// - Replaces every run of non-alphanumeric characters with one dash
/// - Strips leading and trailing dashes
pub fn slugify(text: &str) -> String {
    let ascii = deunicode::deunicode(text).to_lowercase();

    let mut slug = String::with_capacity(ascii.len());
    let mut prev_dash = false;
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }

    slug.trim_matches('-').to_string()
}

/// Plural form of a collection label.
///
/// Covers the regular English rules: `category` → `categories`,
/// `box` → `boxes`, `post` → `posts`. Labels already ending in `s` are
/// returned unchanged.
pub fn pluralize(label: &str) -> String {
    if label.is_empty() || label.ends_with('s') {
        return label.to_string();
    }
    if let Some(stem) = label.strip_suffix('y') {
        let before = stem.chars().last();
        if before.is_some_and(|c| !"aeiou".contains(c)) {
            return format!("{stem}ies");
        }
    }
    if label.ends_with('x') || label.ends_with('z') || label.ends_with("ch") || label.ends_with("sh")
    {
        return format!("{label}es");
    }
    format!("{label}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dated_name_with_slug() {
        let p = parse_dated_name("2024-03-09-hello-world");
        assert_eq!(p.date, NaiveDate::from_ymd_opt(2024, 3, 9));
        assert_eq!(p.slug, "hello-world");
        assert_eq!(p.display_title, "hello world");
    }

    #[test]
    fn date_only_name() {
        let p = parse_dated_name("2024-03-09");
        assert_eq!(p.date, NaiveDate::from_ymd_opt(2024, 3, 9));
        assert_eq!(p.slug, "");
    }

    #[test]
    fn invalid_date_is_part_of_slug() {
        let p = parse_dated_name("2024-13-45-nope");
        assert_eq!(p.date, None);
        assert_eq!(p.slug, "2024-13-45-nope");
    }

    #[test]
    fn date_must_be_followed_by_dash() {
        let p = parse_dated_name("2024-03-09x");
        assert_eq!(p.date, None);
    }

    #[test]
    fn undated_name() {
        let p = parse_dated_name("about-me");
        assert_eq!(p.date, None);
        assert_eq!(p.slug, "about-me");
        assert_eq!(p.display_title, "about me");
    }

    #[test]
    fn short_multibyte_stem_does_not_panic() {
        let p = parse_dated_name("héllo");
        assert_eq!(p.date, None);
        assert_eq!(p.slug, "héllo");
    }

    #[test]
    fn date_prefix_format() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        assert_eq!(date_prefix(date), "2020-01-02-");
    }

    #[test]
    fn slugify_strips_punctuation() {
        assert_eq!(slugify("Hello World!"), "hello-world");
    }

    #[test]
    fn slugify_collapses_and_trims_dashes() {
        assert_eq!(slugify("  --Already--Dashed--  "), "already-dashed");
        assert_eq!(slugify("a & b / c"), "a-b-c");
    }

    #[test]
    fn slugify_transliterates() {
        assert_eq!(slugify("Crème Brûlée Recipe"), "creme-brulee-recipe");
    }

    #[test]
    fn slugify_keeps_digits() {
        assert_eq!(slugify("Top 10 Tips"), "top-10-tips");
    }

    #[test]
    fn slugify_empty_input() {
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn pluralize_regular() {
        assert_eq!(pluralize("post"), "posts");
        assert_eq!(pluralize("page"), "pages");
    }

    #[test]
    fn pluralize_y_and_sibilants() {
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("sketch"), "sketches");
    }

    #[test]
    fn pluralize_already_plural() {
        assert_eq!(pluralize("posts"), "posts");
    }
}
