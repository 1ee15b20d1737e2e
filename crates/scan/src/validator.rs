use crate::BadgeValidator;
use crate::consts::RASTER_EXTENSION_REGEX;
use crate::http::is_http;
use url::Url;

/// Accepts URLs that look like they point at a raster image file.
///
/// The URL must be http(s) with a host and a non-directory path. If the last
/// path segment has an extension, it must be a raster image format; segments
/// without one (`/badge`) are accepted, since plenty of sites serve images
/// that way.
#[derive(Debug, Default, Clone, Copy)]
pub struct BadgeUrlShape;

impl BadgeValidator for BadgeUrlShape {
    fn is_valid(&self, url: &Url) -> bool {
        if !is_http(url) {
            return false;
        }
        let Some(segment) = url.path_segments().and_then(|mut segments| segments.next_back()) else {
            return false;
        };
        if segment.is_empty() {
            return false;
        }
        match segment.rsplit_once('.') {
            Some((_, extension)) => RASTER_EXTENSION_REGEX.is_match(extension),
            None => true,
        }
    }
}
