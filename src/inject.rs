use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

use crate::routes::QUEUE_ROUTE;

/// Primary template, read from the site root.
pub const PRIMARY_TEMPLATE: &str = "queue-website.html";
/// Optional secondary template (the staff-facing form page).
pub const SECONDARY_TEMPLATE: &str = "NurseForm.html";
/// Build output directory, created under the site root.
pub const OUTPUT_DIR: &str = "dist";
/// Output name of the primary template.
pub const PRIMARY_OUTPUT: &str = "index.html";

/// The exact placeholder assignment in the primary template. Contract between
/// this tool and the HTML source; the template must carry it verbatim.
pub const EMPTY_API_ASSIGNMENT: &str = "window.QUEUE_DEFAULT_API = '';";

/// Assignment prefix of the secondary template's backend-call variable.
const API_VAR_PREFIX: &str = "const QUEUE_API = ";

fn proxied_api_assignment() -> String {
    format!("window.QUEUE_DEFAULT_API = '{QUEUE_ROUTE}';")
}

/// Replace the first occurrence of the empty default-API assignment with an
/// assignment pointing at the proxy route. No-op when the placeholder is
/// absent.
pub fn inject_default_api(html: &str) -> String {
    html.replacen(EMPTY_API_ASSIGNMENT, &proxied_api_assignment(), 1)
}

/// Rewrite the first `const QUEUE_API = '…';` (or `"…"`) assignment so its
/// quoted value becomes `route`. The quote style is preserved; when no such
/// assignment exists the input is returned unchanged.
pub fn rewrite_api_var(html: &str, route: &str) -> String {
    let Some(start) = html.find(API_VAR_PREFIX) else {
        return html.to_string();
    };
    let value_start = start + API_VAR_PREFIX.len();
    let rest = &html[value_start..];

    let quote = match rest.chars().next() {
        Some(c @ ('\'' | '"')) => c,
        _ => return html.to_string(),
    };
    let Some(close) = rest[1..].find(quote) else {
        return html.to_string();
    };

    let mut out = String::with_capacity(html.len() + route.len());
    out.push_str(&html[..value_start + 1]);
    out.push_str(route);
    out.push_str(&html[value_start + 1 + close..]);
    out
}

/// What a run of the injector produced.
#[derive(Debug)]
pub struct InjectReport {
    pub primary_out: PathBuf,
    pub secondary_out: Option<PathBuf>,
    /// Whether the primary template's placeholder was actually rewritten.
    pub injected: bool,
}

/// One-shot build step over `site_root`.
///
/// Reads the primary template (missing file is fatal), rewrites the
/// placeholder when the upstream URL is configured, and writes the result to
/// `dist/index.html`, creating the directory as needed. The secondary
/// template, when present, gets its backend-call variable rewritten under the
/// same condition and is copied alongside; when absent it is skipped.
pub fn run(site_root: &Path, upstream_configured: bool) -> anyhow::Result<InjectReport> {
    let primary_src = site_root.join(PRIMARY_TEMPLATE);
    let out_dir = site_root.join(OUTPUT_DIR);
    let primary_out = out_dir.join(PRIMARY_OUTPUT);

    let html = fs::read_to_string(&primary_src)
        .with_context(|| format!("failed to read {}", primary_src.display()))?;

    let (html, injected) = if upstream_configured {
        let rewritten = inject_default_api(&html);
        let injected = rewritten != html;
        info!(route = QUEUE_ROUTE, injected, "Injecting default API (proxy)");
        (rewritten, injected)
    } else {
        info!("No QUEUE_APPSCRIPT_URL, keeping default API empty (demo/local config)");
        (html, false)
    };

    fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    fs::write(&primary_out, &html)
        .with_context(|| format!("failed to write {}", primary_out.display()))?;
    info!(path = %primary_out.display(), "Written");

    let secondary_src = site_root.join(SECONDARY_TEMPLATE);
    let secondary_out = if secondary_src.exists() {
        let mut form = fs::read_to_string(&secondary_src)
            .with_context(|| format!("failed to read {}", secondary_src.display()))?;
        if upstream_configured {
            form = rewrite_api_var(&form, QUEUE_ROUTE);
        }
        let out = out_dir.join(SECONDARY_TEMPLATE);
        fs::write(&out, &form).with_context(|| format!("failed to write {}", out.display()))?;
        info!(path = %out.display(), "Written");
        Some(out)
    } else {
        debug!(path = %secondary_src.display(), "Secondary template not present, skipping");
        None
    };

    Ok(InjectReport {
        primary_out,
        secondary_out,
        injected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_default_api_rewrites_placeholder() {
        let html = "<script>window.QUEUE_DEFAULT_API = '';</script>";
        let out = inject_default_api(html);
        assert_eq!(
            out,
            "<script>window.QUEUE_DEFAULT_API = '/api/queue';</script>"
        );
    }

    #[test]
    fn test_inject_default_api_first_occurrence_only() {
        let html = "window.QUEUE_DEFAULT_API = '';\nwindow.QUEUE_DEFAULT_API = '';";
        let out = inject_default_api(html);
        assert_eq!(
            out,
            "window.QUEUE_DEFAULT_API = '/api/queue';\nwindow.QUEUE_DEFAULT_API = '';"
        );
    }

    #[test]
    fn test_inject_default_api_without_placeholder_is_noop() {
        let html = "<html><body>no scripts here</body></html>";
        assert_eq!(inject_default_api(html), html);
    }

    #[test]
    fn test_rewrite_api_var_single_quotes() {
        let html = "const QUEUE_API = 'https://script.google.com/macros/s/ABC/exec';";
        let out = rewrite_api_var(html, "/api/queue");
        assert_eq!(out, "const QUEUE_API = '/api/queue';");
    }

    #[test]
    fn test_rewrite_api_var_double_quotes() {
        let html = r#"const QUEUE_API = "https://example.com/exec"; call(QUEUE_API);"#;
        let out = rewrite_api_var(html, "/api/queue");
        assert_eq!(out, r#"const QUEUE_API = "/api/queue"; call(QUEUE_API);"#);
    }

    #[test]
    fn test_rewrite_api_var_empty_value() {
        let html = "const QUEUE_API = '';";
        let out = rewrite_api_var(html, "/api/queue");
        assert_eq!(out, "const QUEUE_API = '/api/queue';");
    }

    #[test]
    fn test_rewrite_api_var_missing_assignment_is_noop() {
        let html = "const OTHER_VAR = 'x';";
        assert_eq!(rewrite_api_var(html, "/api/queue"), html);
    }

    #[test]
    fn test_rewrite_api_var_unquoted_value_is_noop() {
        let html = "const QUEUE_API = null;";
        assert_eq!(rewrite_api_var(html, "/api/queue"), html);
    }

    #[test]
    fn test_rewrite_api_var_unterminated_quote_is_noop() {
        let html = "const QUEUE_API = 'broken";
        assert_eq!(rewrite_api_var(html, "/api/queue"), html);
    }
}
