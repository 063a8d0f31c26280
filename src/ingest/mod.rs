//! Weather API clients.
//!
//! One submodule per upstream data source. Only OpenWeatherMap is
//! ingested today.

pub mod openweather;
