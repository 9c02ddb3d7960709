pub mod combine;
pub mod inventory;
pub mod locate;
pub mod status;
