pub mod config;
pub mod date;
pub mod douban;
pub mod error;
pub mod lookup;
pub mod metadata;
pub mod transport;

pub mod prelude {
    pub use crate::douban::DoubanSource;
    pub use crate::error::*;
    pub use crate::lookup::*;
    pub use crate::metadata::*;
}
