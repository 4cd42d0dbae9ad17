pub mod location_filter;
pub mod restaurant;
