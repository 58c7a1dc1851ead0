// Cookie normalization: `Cookie:` header strings and Netscape cookie jars.

use std::path::Path;

use postsignal_common::{Cookie, SiteProfile};
use tracing::{debug, info};

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// Parse `"k=v; k2=v2"` into cookies scoped to the site's cookie domain.
pub fn parse_cookie_string(raw: &str, site: &SiteProfile) -> Vec<Cookie> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(Cookie {
                name: name.to_string(),
                value: unquote(value.trim()).trim().to_string(),
                domain: site.cookie_domain.clone(),
                path: "/".to_string(),
                secure: true,
                http_only: false,
                expires: None,
            })
        })
        .collect()
}

/// Parse a Netscape-format cookie jar.
///
/// Fields are domain, httpOnly flag, path, secure flag, expiry, name, value.
/// Comment lines are skipped except `#HttpOnly_` ones, which are unwrapped and
/// always http-only. Lines that do not have exactly seven tab-separated fields
/// are ignored.
pub fn parse_netscape(text: &str) -> Vec<Cookie> {
    let mut cookies = Vec::new();

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (line, prefixed) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (rest, true),
            None if line.starts_with('#') => continue,
            None => (line, false),
        };

        let fields: Vec<&str> = line.split('\t').collect();
        let [domain, http_only, path, secure, expires, name, value] = fields[..] else {
            debug!(line = lineno + 1, fields = fields.len(), "cookies: skipping malformed line");
            continue;
        };

        cookies.push(Cookie {
            name: name.to_string(),
            value: unquote(value).to_string(),
            domain: domain.to_string(),
            path: path.to_string(),
            secure: secure.eq_ignore_ascii_case("TRUE"),
            http_only: prefixed || http_only.eq_ignore_ascii_case("TRUE"),
            expires: parse_expiry(expires),
        });
    }

    cookies
}

/// Read and parse a Netscape cookie file.
pub fn load_cookie_file(path: &Path) -> std::io::Result<Vec<Cookie>> {
    let text = std::fs::read_to_string(path)?;
    let cookies = parse_netscape(&text);
    info!(path = %path.display(), count = cookies.len(), "Parsed cookies from file");
    Ok(cookies)
}

/// Keep cookies that belong to the site (e.g. `.linkedin.com`, `www.linkedin.com`).
pub fn cookies_for_site<'a>(cookies: &'a [Cookie], site: &SiteProfile) -> Vec<&'a Cookie> {
    let host = site.cookie_host();
    cookies.iter().filter(|c| c.domain.contains(host)).collect()
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Positive unix seconds only; `0`, `-1` and junk mean a session cookie.
fn parse_expiry(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i64>().ok().filter(|&v| v > 0)
}
