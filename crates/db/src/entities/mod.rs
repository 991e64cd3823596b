//! `SeaORM` entity definitions.

pub mod check_sequence;
pub mod payment_index;
