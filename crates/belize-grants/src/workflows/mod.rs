pub mod awards;
pub mod proposals;
