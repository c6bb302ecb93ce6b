pub mod ids;
pub mod offer;
pub mod ticket;
