//! sea-orm entities for the CRM tables.

pub mod company;
pub mod contact;
pub mod deal;
pub mod user;
