//! Repository abstractions for data access.

pub mod check_sequence;
pub mod index_row;

pub use check_sequence::CheckSequenceRepository;
pub use index_row::IndexRowRepository;
