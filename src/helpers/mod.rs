pub mod geo;
pub mod geolocation;
pub mod handler_404;
pub mod heat_color;
pub mod normalize;
