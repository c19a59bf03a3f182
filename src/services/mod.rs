pub mod lease_lifecycle;
pub mod payments;
