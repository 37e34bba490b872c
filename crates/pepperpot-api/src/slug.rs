use anyhow::Result;
use pepperpot_db::{Database, SlugScope};

/// URL slug: lowercase ASCII word characters joined by single hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else if c == '-' || c.is_whitespace() {
            pending_hyphen = true;
        }
    }
    slug
}

/// `slugify(title)`, suffixed `-1`, `-2`, ... until no row in `scope` uses it.
/// Titles with no usable characters fall back to `untitled`.
pub fn unique_slug(db: &Database, scope: SlugScope, title: &str) -> Result<String> {
    let mut base = slugify(title);
    if base.is_empty() {
        base = "untitled".to_string();
    }

    let mut slug = base.clone();
    let mut counter = 1;
    while db.slug_exists(scope, &slug)? {
        slug = format!("{}-{}", base, counter);
        counter += 1;
    }
    Ok(slug)
}
