pub mod buyout;
pub mod installment;
