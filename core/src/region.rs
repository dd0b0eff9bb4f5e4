//! Region query construction.
//!
//! A `Region` is a center plus a latitude/longitude span. It is turned into a
//! bounding box for filtering and into the query parameters of
//! `GET /events`. Values are passed through as given: no clamping to valid
//! latitude/longitude ranges and no rejection of zero or negative spans.

use crate::types::Coordinate;

/// Full latitude and longitude extent of a region, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Span {
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl Span {
    pub fn new(latitude_delta: f64, longitude_delta: f64) -> Self {
        Self { latitude_delta, longitude_delta }
    }
}

/// Geographic query rectangle: a center and a span.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Region {
    pub center: Coordinate,
    pub span: Span,
}

/// Inclusive latitude/longitude bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&coordinate.latitude)
            && (self.min_longitude..=self.max_longitude).contains(&coordinate.longitude)
    }
}

impl Region {
    pub fn new(center: Coordinate, span: Span) -> Self {
        Self { center, span }
    }

    /// `[lat - dLat/2, lat + dLat/2] × [lng - dLng/2, lng + dLng/2]`.
    pub fn bounding_box(&self) -> BoundingBox {
        let half_lat = self.span.latitude_delta / 2.0;
        let half_lng = self.span.longitude_delta / 2.0;
        BoundingBox {
            min_latitude: self.center.latitude - half_lat,
            max_latitude: self.center.latitude + half_lat,
            min_longitude: self.center.longitude - half_lng,
            max_longitude: self.center.longitude + half_lng,
        }
    }

    /// Query parameters for `GET /events`, in the order they are sent.
    pub fn query_pairs(&self) -> [(&'static str, String); 4] {
        [
            ("lat", self.center.latitude.to_string()),
            ("lng", self.center.longitude.to_string()),
            ("lat_span", self.span.latitude_delta.to_string()),
            ("lng_span", self.span.longitude_delta.to_string()),
        ]
    }

    pub fn query_string(&self) -> String {
        self.query_pairs()
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < EPSILON, "{actual} != {expected}");
    }

    #[test]
    fn bounding_box_is_centered_on_region() {
        let region = Region::new(Coordinate::new(40.0, -73.0), Span::new(0.1, 0.1));
        let bbox = region.bounding_box();
        assert_close(bbox.min_latitude, 39.95);
        assert_close(bbox.max_latitude, 40.05);
        assert_close(bbox.min_longitude, -73.05);
        assert_close(bbox.max_longitude, -72.95);
    }

    #[test]
    fn zero_span_collapses_to_center() {
        let region = Region::new(Coordinate::new(10.0, 20.0), Span::default());
        let bbox = region.bounding_box();
        assert_eq!(bbox.min_latitude, 10.0);
        assert_eq!(bbox.max_latitude, 10.0);
        assert!(bbox.contains(&Coordinate::new(10.0, 20.0)));
        assert!(!bbox.contains(&Coordinate::new(10.0, 20.0001)));
    }

    #[test]
    fn out_of_range_values_pass_through() {
        let region = Region::new(Coordinate::new(89.0, 179.0), Span::new(10.0, 10.0));
        let bbox = region.bounding_box();
        assert_close(bbox.max_latitude, 94.0);
        assert_close(bbox.max_longitude, 184.0);
    }

    #[test]
    fn negative_span_inverts_box() {
        let region = Region::new(Coordinate::new(0.0, 0.0), Span::new(-2.0, 2.0));
        let bbox = region.bounding_box();
        assert!(bbox.min_latitude > bbox.max_latitude);
        assert!(!bbox.contains(&Coordinate::new(0.0, 0.0)));
    }

    #[test]
    fn query_string_lists_center_and_span() {
        let region = Region::new(Coordinate::new(37.5, -122.25), Span::new(0.5, 0.25));
        assert_eq!(region.query_string(), "lat=37.5&lng=-122.25&lat_span=0.5&lng_span=0.25");
    }
}
