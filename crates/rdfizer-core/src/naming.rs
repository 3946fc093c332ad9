//! Filesystem-safe names derived from prefixes and output names.

/// Fallback used when a VCF prefix collapses to nothing.
pub const DEFAULT_PREFIX_SLUG: &str = "vcf";
/// Fallback used when an output name collapses to nothing.
pub const DEFAULT_METRICS_NAME: &str = "rdf";

/// Collapses every run of characters outside `[A-Za-z0-9._-]` into a single
/// `_`, trims `_` from both ends and substitutes `fallback` when empty.
pub fn sanitize_name(value: &str, fallback: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_run = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Slug of a VCF prefix, used for rendered rules and output directories.
pub fn slugify(value: &str) -> String {
    sanitize_name(value, DEFAULT_PREFIX_SLUG)
}

/// Safe form of an output name, used in metrics artifact file names.
pub fn safe_metrics_name(value: &str) -> String {
    sanitize_name(value, DEFAULT_METRICS_NAME)
}
