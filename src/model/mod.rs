pub mod country;
pub mod indicator;
pub mod matrix;
pub mod profile;
