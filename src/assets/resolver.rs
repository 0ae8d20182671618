use crate::results::{AssetRecord, AssetRef, AssetStatus};
use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use url::Url;

/// Where a resolved asset's bytes come from
#[derive(Debug, Clone)]
pub enum AssetSource {
    /// Fetch over HTTP(S)
    Remote(Url),

    /// Inline markup carried in the page itself
    Inline(String),

    /// A data: URI or other non-fetchable scheme; nothing to acquire
    Opaque,
}

/// A record slot plus the source its worker will draw from. Slots keep
/// their resolution-order position; fetch completion order never reorders
/// the output.
#[derive(Debug, Clone)]
pub struct PendingAsset {
    pub record: AssetRecord,
    pub source: AssetSource,
}

/// Resolves raw refs to canonical identities and collapses duplicates.
///
/// Two refs normalizing to the same absolute URL share one record; the
/// first-seen alt text is retained. Records come out in first-seen order.
pub fn resolve_refs(refs: &[AssetRef], base: &Url) -> Vec<PendingAsset> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut pending = Vec::new();

    for r in refs {
        if let Some(markup) = &r.inline_markup {
            let key = r.original_url.clone();
            if !seen.insert(key.clone()) {
                continue;
            }
            pending.push(PendingAsset {
                record: skeleton(key.clone(), key, r),
                source: AssetSource::Inline(markup.clone()),
            });
            continue;
        }

        let Ok(mut resolved) = base.join(&r.original_url) else {
            ::log::debug!("Dropping unresolvable asset ref: {}", r.original_url);
            let key = r.original_url.clone();
            if !seen.insert(key.clone()) {
                continue;
            }
            let mut record = skeleton(key.clone(), key, r);
            record.status = AssetStatus::Failed;
            record.failure_reason = Some("unresolvable URL".to_string());
            pending.push(PendingAsset {
                record,
                source: AssetSource::Opaque,
            });
            continue;
        };
        resolved.set_fragment(None);

        let (key, source) = match resolved.scheme() {
            "http" | "https" => (dedup_key(&resolved), AssetSource::Remote(resolved.clone())),
            "data" => (data_key(resolved.as_str()), AssetSource::Opaque),
            other => {
                ::log::debug!("Skipping asset with scheme {}: {}", other, resolved);
                (resolved.as_str().to_string(), AssetSource::Opaque)
            }
        };

        if !seen.insert(key.clone()) {
            continue;
        }
        pending.push(PendingAsset {
            record: skeleton(key, resolved.to_string(), r),
            source,
        });
    }

    ::log::debug!(
        "Resolved {} refs into {} records",
        refs.len(),
        pending.len()
    );
    pending
}

fn skeleton(dedup_key: String, resolved_url: String, r: &AssetRef) -> AssetRecord {
    AssetRecord {
        dedup_key,
        resolved_url,
        kind: r.kind,
        alt_text: r.alt_text.clone(),
        local_path: None,
        format: None,
        size_bytes: None,
        status: AssetStatus::Skipped,
        failure_reason: None,
    }
}

/// Canonical identity of a fetchable URL: host (with any explicit port),
/// path, and the query with its parameters sorted. Scheme is dropped so the
/// http and https forms of the same asset collapse.
pub fn dedup_key(url: &Url) -> String {
    let mut key = String::new();
    if let Some(host) = url.host_str() {
        key.push_str(host);
    }
    if let Some(port) = url.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }
    key.push_str(url.path());
    if let Some(query) = url.query() {
        let mut params: Vec<&str> = query.split('&').collect();
        params.sort_unstable();
        key.push('?');
        key.push_str(&params.join("&"));
    }
    key
}

/// data: URIs can be huge; hash them down to a stable short key
fn data_key(uri: &str) -> String {
    let mut hasher = DefaultHasher::new();
    uri.hash(&mut hasher);
    format!("data:{:016x}", hasher.finish())
}

/// Derives a filesystem-safe stem from a dedup key
pub fn file_stem_for_key(key: &str) -> String {
    let mut name = key.replace(['/', ':', '?', '&', '=', '#', '%'], "_");
    if name.len() > 100 {
        name.truncate(100);
    }
    name
}

/// Picks the kind-independent extension for a fetched asset, preferring the
/// URL path and falling back to the response content type
pub fn extension_for(url: &Url, content_type: Option<&str>) -> String {
    let path_ext = std::path::Path::new(url.path())
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    if let Some(ext) = path_ext.filter(|e| !e.is_empty() && e.len() <= 5) {
        return ext;
    }

    match content_type.map(|ct| ct.split(';').next().unwrap_or(ct).trim()) {
        Some("image/jpeg") => "jpg".to_string(),
        Some("image/png") => "png".to_string(),
        Some("image/gif") => "gif".to_string(),
        Some("image/webp") => "webp".to_string(),
        Some("image/svg+xml") => "svg".to_string(),
        Some("image/x-icon") | Some("image/vnd.microsoft.icon") => "ico".to_string(),
        _ => "bin".to_string(),
    }
}

/// Whether fetched bytes look like a raster image the normalizer can decode
pub fn is_raster(ext: &str, content_type: Option<&str>) -> bool {
    if matches!(ext, "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp") {
        return true;
    }
    matches!(
        content_type.map(|ct| ct.split(';').next().unwrap_or(ct).trim()),
        Some("image/jpeg") | Some("image/png") | Some("image/gif") | Some("image/bmp")
            | Some("image/webp")
    )
}
