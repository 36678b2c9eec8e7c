//! Remote climate data boundary.

use olicana_cache::{Coordinates, DailyRecord, DateRange};
use olicana_plugins::FetchError;

/// Service name reported in errors from the geocoder.
pub const GEOCODER: &str = "open-meteo geocoding";

/// Service name reported in errors from the archive.
pub const ARCHIVE: &str = "open-meteo archive";

/// Geocoding and historical daily temperatures for named places.
pub trait ClimateSource {
    /// Resolves a place name to coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotFound`] when the geocoder has no match and
    /// another kind when the service fails.
    fn geocode(&self, name: &str) -> Result<Coordinates, FetchError>;

    /// Fetches daily mean, minimum and maximum temperatures for `range`.
    ///
    /// An empty vector means the service answered with no rows.
    ///
    /// # Errors
    ///
    /// Returns an error when the service fails or answers unintelligibly.
    fn daily_archive(
        &self,
        at: Coordinates,
        range: DateRange,
    ) -> Result<Vec<DailyRecord>, FetchError>;
}

/// Source used when no network client is wired in.
///
/// Every call reports the service as unavailable, so only cached data can be
/// served.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineSource;

impl OfflineSource {
    fn unavailable(service: &str) -> FetchError {
        FetchError::Unavailable {
            service: service.to_owned(),
            message: String::from("no network client configured"),
        }
    }
}

impl ClimateSource for OfflineSource {
    fn geocode(&self, _name: &str) -> Result<Coordinates, FetchError> {
        Err(Self::unavailable(GEOCODER))
    }

    fn daily_archive(
        &self,
        _at: Coordinates,
        _range: DateRange,
    ) -> Result<Vec<DailyRecord>, FetchError> {
        Err(Self::unavailable(ARCHIVE))
    }
}
