pub mod client;
pub mod extract;

pub use client::{AvinodeClient, AvinodeConfig, AvinodeError, CreatedTrip};
pub use extract::SellerQuote;
