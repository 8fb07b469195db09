pub mod entities;
pub mod overlap;
