#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use sheetness_volume as volume;

#[doc(inline)]
pub use sheetness_imgproc as imgproc;
