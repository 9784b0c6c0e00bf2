pub mod afi;
pub use afi::*;

pub mod rd;
pub use rd::*;

pub mod ext_com;
pub use ext_com::*;

pub mod attr;
pub use attr::*;

pub mod nlri;
pub use nlri::*;
