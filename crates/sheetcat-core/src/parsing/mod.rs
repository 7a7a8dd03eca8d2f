//! Locale-aware normalizers for the loosely formatted values found in
//! supplier catalogs: prices, dimension labels and delimited lists.

pub mod currency;
pub mod dimensions;
pub mod lists;
pub mod shapes;

pub use currency::{parse_price, parse_price_cell, try_parse_price};
pub use dimensions::parse_dimensions;
pub use lists::{parse_list, parse_materials};
