//! Pure helper functions over domain values

pub mod assignment_type;
