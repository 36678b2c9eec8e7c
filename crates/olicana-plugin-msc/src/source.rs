//! Remote station inventory boundary.

use olicana_cache::{Coordinates, DailyRecord, DateRange};
use olicana_plugins::FetchError;

/// Service name reported in errors from the station search.
pub const STATION_SEARCH: &str = "MSC climate-daily search";

/// Service name reported in errors from the observation download.
pub const OBSERVATIONS: &str = "MSC climate-daily observations";

/// A climate station with daily data.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    /// MSC climate identifier, unique per station.
    pub climate_id: String,
    /// Station name as published.
    pub name: String,
    /// Station position.
    pub location: Coordinates,
}

impl Station {
    /// Label shown in the station selector.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.climate_id)
    }
}

/// Station discovery and daily observations from the MSC archive.
pub trait StationSource {
    /// Finds stations that reported daily data near `at` during `range`.
    ///
    /// Implementations return each station once, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error when the search service fails.
    fn stations_near(&self, at: Coordinates, range: DateRange)
    -> Result<Vec<Station>, FetchError>;

    /// Downloads daily observations of one station.
    ///
    /// # Errors
    ///
    /// Returns an error when the archive fails or answers unintelligibly.
    fn daily_observations(
        &self,
        climate_id: &str,
        range: DateRange,
    ) -> Result<Vec<DailyRecord>, FetchError>;
}

/// Source used when no network client is wired in.
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

impl StationSource for OfflineSource {
    fn stations_near(
        &self,
        _at: Coordinates,
        _range: DateRange,
    ) -> Result<Vec<Station>, FetchError> {
        Err(Self::unavailable(STATION_SEARCH))
    }

    fn daily_observations(
        &self,
        _climate_id: &str,
        _range: DateRange,
    ) -> Result<Vec<DailyRecord>, FetchError> {
        Err(Self::unavailable(OBSERVATIONS))
    }
}
