//! Bare import rewriting to CDN URLs.
//!
//! Runs on the rendered chunk after the engine is done. Every bare import
//! specifier (`react`, `@scope/pkg/sub`) is replaced with
//! `<cdn_base>/<name>@<version>[/<subpath>]` so the artifact can be loaded
//! directly by a browser. Relative and absolute specifiers are left alone.

use crate::registry::VersionRegistry;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

/// One specifier rewrite performed on a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// The specifier as it appeared in the chunk.
    pub specifier: String,
    /// The URL it was replaced with.
    pub url: String,
    /// Resolved package version, `None` when the lookup failed.
    pub version: Option<String>,
}

/// Result of running the rewrite on one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteReport {
    pub code: String,
    pub rewrites: Vec<Rewrite>,
}

impl RewriteReport {
    /// Rewrites that fell back to an unversioned URL.
    pub fn unversioned(&self) -> impl Iterator<Item = &Rewrite> {
        self.rewrites.iter().filter(|r| r.version.is_none())
    }
}

/// Package name to version, scoped to one rewrite execution.
///
/// Failed lookups are stored as `None` so a package is queried at most once.
#[derive(Debug, Default)]
pub struct ExternalVersionCache {
    entries: FxHashMap<String, Option<String>>,
}

impl ExternalVersionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, package: &str) -> Option<Option<&str>> {
        self.entries.get(package).map(Option::as_deref)
    }

    async fn resolve<R>(&mut self, package: &str, registry: &R) -> Option<String>
    where
        R: VersionRegistry + ?Sized,
    {
        if let Some(cached) = self.entries.get(package) {
            return cached.clone();
        }

        let version = match registry.resolve_version(package).await {
            Ok(version) => Some(version),
            Err(err) => {
                warn!(package, error = %err, "version lookup failed, using unversioned CDN URL");
                None
            }
        };
        self.entries.insert(package.to_string(), version.clone());
        version
    }
}

/// The import rewrite transform.
pub struct CdnRewrite<'a, R: VersionRegistry + ?Sized> {
    cdn_base: &'a str,
    registry: &'a R,
}

impl<'a, R: VersionRegistry + ?Sized> CdnRewrite<'a, R> {
    pub fn new(cdn_base: &'a str, registry: &'a R) -> Self {
        Self {
            cdn_base: cdn_base.trim_end_matches('/'),
            registry,
        }
    }

    /// Rewrite `code` using a fresh version cache.
    pub async fn apply(&self, code: &str, imports: &[String]) -> RewriteReport {
        let mut cache = ExternalVersionCache::new();
        self.apply_with_cache(code, imports, &mut cache).await
    }

    /// Rewrite every bare specifier in `imports` that occurs quoted in `code`.
    ///
    /// Lookups are awaited one after another. Lookup failures never fail the
    /// rewrite.
    pub async fn apply_with_cache(
        &self,
        code: &str,
        imports: &[String],
        cache: &mut ExternalVersionCache,
    ) -> RewriteReport {
        let mut output = code.to_string();
        let mut rewrites = Vec::new();
        let mut seen = Vec::<&str>::new();

        for specifier in imports {
            if seen.contains(&specifier.as_str()) {
                continue;
            }
            seen.push(specifier);

            let Some((name, subpath)) = split_bare_specifier(specifier) else {
                debug!(specifier, "skipping non-bare import");
                continue;
            };

            let version = cache.resolve(name, self.registry).await;
            let url = cdn_url(self.cdn_base, name, version.as_deref(), subpath);

            let (replaced, count) = replace_quoted(&output, specifier, &url);
            if count == 0 {
                continue;
            }
            output = replaced;

            debug!(specifier, url = %url, occurrences = count, "rewrote import");
            rewrites.push(Rewrite {
                specifier: specifier.clone(),
                url,
                version,
            });
        }

        RewriteReport {
            code: output,
            rewrites,
        }
    }
}

/// Split a bare specifier into package name and optional subpath.
///
/// Returns `None` for relative, absolute and URL specifiers.
pub fn split_bare_specifier(specifier: &str) -> Option<(&str, Option<&str>)> {
    if specifier.is_empty()
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier == "."
        || specifier == ".."
        || specifier.starts_with('/')
        || specifier.starts_with('\\')
        || specifier.contains("://")
        || specifier.starts_with("data:")
        || specifier.starts_with("node:")
    {
        return None;
    }

    // `@scope/name` spans two segments.
    let name_segments = if specifier.starts_with('@') { 2 } else { 1 };
    let mut split_at = None;
    let mut slashes = 0;
    for (idx, ch) in specifier.char_indices() {
        if ch == '/' {
            slashes += 1;
            if slashes == name_segments {
                split_at = Some(idx);
                break;
            }
        }
    }

    match split_at {
        Some(idx) => {
            let subpath = &specifier[idx + 1..];
            let name = &specifier[..idx];
            Some((name, (!subpath.is_empty()).then_some(subpath)))
        }
        // A lone `@scope` is not a package.
        None if name_segments == 2 => None,
        None => Some((specifier, None)),
    }
}

fn cdn_url(base: &str, name: &str, version: Option<&str>, subpath: Option<&str>) -> String {
    let mut url = match version {
        Some(version) => format!("{base}/{name}@{version}"),
        None => format!("{base}/{name}"),
    };
    if let Some(subpath) = subpath {
        url.push('/');
        url.push_str(subpath);
    }
    url
}

/// Replace `"specifier"` and `'specifier'` keeping the quote style.
fn replace_quoted(code: &str, specifier: &str, url: &str) -> (String, usize) {
    let mut result = code.to_string();
    let mut count = 0;
    for quote in ['"', '\''] {
        let needle = format!("{quote}{specifier}{quote}");
        let hits = result.matches(&needle).count();
        if hits > 0 {
            result = result.replace(&needle, &format!("{quote}{url}{quote}"));
            count += hits;
        }
    }
    (result, count)
}
