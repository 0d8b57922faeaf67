//! Resource signatures
//!
//! A signature is the request path with every identifier-like segment
//! removed, so `/Person/<uuid>/Company` and `/Person/<other uuid>/Company`
//! share the access-control entry `Person/Company`.

use graphpath_core::is_identifier_segment;

/// Signature of a slash-separated path
pub fn resource_signature(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty() && !is_identifier_segment(segment))
        .collect::<Vec<_>>()
        .join("/")
}

/// Signature of already split segments
pub fn signature_of<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .filter(|segment| !segment.is_empty() && !is_identifier_segment(segment))
        .collect::<Vec<_>>()
        .join("/")
}
