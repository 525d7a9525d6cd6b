pub mod allocation;
pub mod loans;
