mod address;
mod bytes_amount;
mod piece;
mod sector;
mod status;

pub use self::address::*;
pub use self::bytes_amount::*;
pub use self::piece::*;
pub use self::sector::*;
pub use self::status::*;
