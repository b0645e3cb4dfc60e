//! Request classification and Axum router construction.
//!
//! Every request is classified from its method, host, path, and query alone.
//! Body contents never influence routing.

use axum::{
    http::{HeaderMap, Method},
    Router,
};
use percent_encoding::percent_decode_str;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use super::{handlers, headers, middleware, state::AppState};

/// Query keys that turn `GET /bucket/key` into a different API call
/// (GetObjectAcl, GetObjectTagging, ListParts, ...).
const GET_EXCLUDED_QUERY: &[&str] = &[
    "acl",
    "attributes",
    "legal-hold",
    "retention",
    "tagging",
    "torrent",
    "uploadId",
];

/// Query keys that turn `PUT /bucket/key` into a different API call
/// (UploadPart, PutObjectTagging, PutObjectRetention, ...).
const PUT_EXCLUDED_QUERY: &[&str] = &[
    "partNumber",
    "uploadId",
    "tagging",
    "legal-hold",
    "object-lock",
    "retention",
    "publicAccessBlock",
    "acl",
];

/// Bucket and key addressed by an object-shaped request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPath {
    pub bucket: String,
    pub key: String,
}

/// Multipart upload operations that can be blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultipartOp {
    UploadPart,
    CreateMultipartUpload,
    CompleteMultipartUpload,
    AbortMultipartUpload,
}

impl MultipartOp {
    /// S3 API name of the operation.
    pub fn name(self) -> &'static str {
        match self {
            MultipartOp::UploadPart => "UploadPart",
            MultipartOp::CreateMultipartUpload => "CreateMultipartUpload",
            MultipartOp::CompleteMultipartUpload => "CompleteMultipartUpload",
            MultipartOp::AbortMultipartUpload => "AbortMultipartUpload",
        }
    }
}

/// Where a request is dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    GetObject(ObjectPath),
    PutObject(ObjectPath),
    Blocked(MultipartOp),
    Forward,
}

impl Route {
    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Route::GetObject(_) => "get-object",
            Route::PutObject(_) => "put-object",
            Route::Blocked(op) => op.name(),
            Route::Forward => "forward",
        }
    }
}

/// Decoded query string, in order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Parse a raw query string; `?uploads` yields the key `uploads` with an
    /// empty value.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        let pairs = raw
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key), decode_component(value))
            })
            .collect();
        Self(pairs)
    }

    /// Whether `key` is present, with or without a value.
    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    /// First value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn contains_any(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| self.contains(k))
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Whether the bucket is the leftmost label of `host`
/// (`<bucket>.s3.<region>.amazonaws.com`).
pub fn is_virtual_hosted(host: &str) -> bool {
    host.split('.').count() > 4
}

/// Extract bucket and key; `None` unless both are non-empty.
///
/// The key may itself contain `/`.
pub fn object_path(host: &str, path: &str) -> Option<ObjectPath> {
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    let rest = decoded.strip_prefix('/')?;

    let (bucket, key) = if is_virtual_hosted(host) {
        (host.split('.').next()?, rest)
    } else {
        rest.split_once('/')?
    };

    if bucket.is_empty() || key.is_empty() {
        return None;
    }
    Some(ObjectPath {
        bucket: bucket.to_owned(),
        key: key.to_owned(),
    })
}

/// Classify a request. The first matching rule wins.
pub fn classify(
    method: &Method,
    host: &str,
    path: &str,
    query: &QueryParams,
    request_headers: &HeaderMap,
    allow_multipart: bool,
) -> Route {
    let Some(object) = object_path(host, path) else {
        return Route::Forward;
    };

    if *method == Method::GET && !query.contains_any(GET_EXCLUDED_QUERY) {
        return Route::GetObject(object);
    }

    let is_copy = headers::header_value(request_headers, headers::X_AMZ_COPY_SOURCE).is_some();
    if *method == Method::PUT && !is_copy && !query.contains_any(PUT_EXCLUDED_QUERY) {
        return Route::PutObject(object);
    }

    if allow_multipart {
        return Route::Forward;
    }

    let blocked = match *method {
        Method::PUT if query.contains("partNumber") && query.contains("uploadId") => {
            Some(MultipartOp::UploadPart)
        }
        Method::POST if query.contains("uploads") => Some(MultipartOp::CreateMultipartUpload),
        Method::POST if query.contains("uploadId") => Some(MultipartOp::CompleteMultipartUpload),
        Method::DELETE if query.contains("uploadId") => Some(MultipartOp::AbortMultipartUpload),
        _ => None,
    };
    blocked.map_or(Route::Forward, Route::Blocked)
}

/// Build the application [`Router`]: every request goes through the
/// classifying dispatcher.
pub fn build(state: AppState) -> Router {
    Router::new()
        .fallback(handlers::dispatch)
        .layer(CatchPanicLayer::custom(middleware::panic_response))
        .layer(TraceLayer::new_for_http().make_span_with(middleware::make_request_span))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const VHOST: &str = "b.s3.eu-west-1.amazonaws.com";
    const PATH_HOST: &str = "s3.eu-west-1.amazonaws.com";

    fn route(method: Method, host: &str, uri: &str, allow_multipart: bool) -> Route {
        let (path, query) = match uri.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (uri, None),
        };
        classify(
            &method,
            host,
            path,
            &QueryParams::parse(query),
            &HeaderMap::new(),
            allow_multipart,
        )
    }

    fn obj(bucket: &str, key: &str) -> ObjectPath {
        ObjectPath {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    #[test]
    fn virtual_hosted_detection() {
        assert!(is_virtual_hosted(VHOST));
        assert!(!is_virtual_hosted(PATH_HOST));
        assert!(!is_virtual_hosted("127.0.0.1:4433"));
        assert!(!is_virtual_hosted("localhost"));
    }

    #[test]
    fn object_path_styles() {
        assert_eq!(object_path(VHOST, "/k"), Some(obj("b", "k")));
        assert_eq!(object_path(VHOST, "/dir/sub/k"), Some(obj("b", "dir/sub/k")));
        assert_eq!(object_path(PATH_HOST, "/b/k"), Some(obj("b", "k")));
        assert_eq!(object_path(PATH_HOST, "/b/dir/k"), Some(obj("b", "dir/k")));
        assert_eq!(object_path(PATH_HOST, "/b/key%20with%20space"), Some(obj("b", "key with space")));
    }

    #[test]
    fn non_object_paths() {
        assert_eq!(object_path(VHOST, "/"), None);
        assert_eq!(object_path(PATH_HOST, "/"), None);
        assert_eq!(object_path(PATH_HOST, "/b"), None);
        assert_eq!(object_path(PATH_HOST, "/b/"), None);
    }

    #[test]
    fn query_parsing() {
        let q = QueryParams::parse(Some("uploads&versionId=abc%2Fdef&x=1+2"));
        assert!(q.contains("uploads"));
        assert_eq!(q.get("uploads"), Some(""));
        assert_eq!(q.get("versionId"), Some("abc/def"));
        assert_eq!(q.get("x"), Some("1 2"));
        assert!(!q.contains("upload"));
        assert!(QueryParams::parse(None).0.is_empty());
    }

    #[test]
    fn plain_get_and_put_are_intercepted() {
        assert_eq!(route(Method::GET, VHOST, "/k", false), Route::GetObject(obj("b", "k")));
        assert_eq!(route(Method::PUT, VHOST, "/k", false), Route::PutObject(obj("b", "k")));
        assert_eq!(
            route(Method::GET, PATH_HOST, "/b/k?versionId=3", false),
            Route::GetObject(obj("b", "k"))
        );
    }

    #[test]
    fn get_exclusions_forward() {
        for key in GET_EXCLUDED_QUERY {
            let uri = format!("/b/k?{key}");
            assert_eq!(route(Method::GET, PATH_HOST, &uri, false), Route::Forward, "{key}");
        }
    }

    #[test]
    fn put_exclusions_leave_put_handler() {
        for key in PUT_EXCLUDED_QUERY {
            let uri = format!("/b/k?{key}=1");
            let r = route(Method::PUT, PATH_HOST, &uri, false);
            assert_ne!(r, Route::PutObject(obj("b", "k")), "{key}");
            assert_eq!(r, Route::Forward, "{key}");
        }
    }

    #[test]
    fn copy_source_forwards() {
        let mut h = HeaderMap::new();
        h.insert(headers::X_AMZ_COPY_SOURCE, HeaderValue::from_static("/src/k"));
        let r = classify(&Method::PUT, PATH_HOST, "/b/k", &QueryParams::default(), &h, false);
        assert_eq!(r, Route::Forward);
    }

    #[test]
    fn multipart_verbs_blocked_by_default() {
        assert_eq!(
            route(Method::PUT, PATH_HOST, "/b/k?partNumber=1&uploadId=x", false),
            Route::Blocked(MultipartOp::UploadPart)
        );
        assert_eq!(
            route(Method::POST, PATH_HOST, "/b/k?uploads", false),
            Route::Blocked(MultipartOp::CreateMultipartUpload)
        );
        assert_eq!(
            route(Method::POST, PATH_HOST, "/b/k?uploadId=x", false),
            Route::Blocked(MultipartOp::CompleteMultipartUpload)
        );
        assert_eq!(
            route(Method::DELETE, PATH_HOST, "/b/k?uploadId=x", false),
            Route::Blocked(MultipartOp::AbortMultipartUpload)
        );
    }

    #[test]
    fn multipart_verbs_forwarded_when_allowed() {
        for (method, uri) in [
            (Method::PUT, "/b/k?partNumber=1&uploadId=x"),
            (Method::POST, "/b/k?uploads"),
            (Method::POST, "/b/k?uploadId=x"),
            (Method::DELETE, "/b/k?uploadId=x"),
        ] {
            assert_eq!(route(method, PATH_HOST, uri, true), Route::Forward, "{uri}");
        }
    }

    #[test]
    fn get_with_upload_id_is_list_parts() {
        assert_eq!(route(Method::GET, PATH_HOST, "/b/k?uploadId=x", false), Route::Forward);
    }

    #[test]
    fn put_with_only_part_number_forwards() {
        assert_eq!(route(Method::PUT, PATH_HOST, "/b/k?partNumber=1", false), Route::Forward);
    }

    #[test]
    fn other_methods_and_shapes_forward() {
        assert_eq!(route(Method::HEAD, PATH_HOST, "/b/k", false), Route::Forward);
        assert_eq!(route(Method::DELETE, PATH_HOST, "/b/k", false), Route::Forward);
        assert_eq!(route(Method::POST, PATH_HOST, "/b/k", false), Route::Forward);
        assert_eq!(route(Method::GET, PATH_HOST, "/b", false), Route::Forward);
        assert_eq!(route(Method::PUT, PATH_HOST, "/b", false), Route::Forward);
        assert_eq!(route(Method::POST, PATH_HOST, "/b?uploads", false), Route::Forward);
    }

    #[test]
    fn method_by_exclusion_matrix() {
        // Each exclusion key applied to each method lands on exactly one route.
        let keys: Vec<&str> = GET_EXCLUDED_QUERY
            .iter()
            .chain(PUT_EXCLUDED_QUERY)
            .copied()
            .collect();
        for method in [Method::GET, Method::PUT, Method::POST, Method::DELETE] {
            for key in &keys {
                let uri = format!("/b/k?{key}=v");
                let r = route(method.clone(), PATH_HOST, &uri, false);
                let expected = match method {
                    Method::GET if !GET_EXCLUDED_QUERY.contains(key) => Route::GetObject(obj("b", "k")),
                    Method::PUT if !PUT_EXCLUDED_QUERY.contains(key) => Route::PutObject(obj("b", "k")),
                    Method::POST if *key == "uploadId" => {
                        Route::Blocked(MultipartOp::CompleteMultipartUpload)
                    }
                    Method::DELETE if *key == "uploadId" => {
                        Route::Blocked(MultipartOp::AbortMultipartUpload)
                    }
                    _ => Route::Forward,
                };
                assert_eq!(r, expected, "{method} {uri}");
            }
        }
    }
}
